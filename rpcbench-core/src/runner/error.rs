pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("`concurrency` must be a positive integer")]
    InvalidConcurrency,

    #[error("`duration` must be a positive duration")]
    InvalidDuration,

    #[error("input set is empty (provide at least one address)")]
    EmptyInput,

    #[error(
        "unknown request kind `{0}` (expected `getAccountInfo`, `getMultipleAccounts`, or `getProgramAccounts`)"
    )]
    UnknownKind(String),

    #[error("request kind `{0}` is listed more than once")]
    DuplicateKind(String),

    #[error("no request kinds are enabled")]
    NoKindsEnabled,

    #[error("failed to load input set from `{path}`: {source}")]
    InputSetup {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("worker pool for `{0}` panicked")]
    PoolPanicked(String),
}

impl Error {
    /// Errors scoped to a single request kind. Sibling kinds keep running.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidConcurrency
                | Self::InvalidDuration
                | Self::EmptyInput
                | Self::UnknownKind(_)
                | Self::DuplicateKind(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_are_kind_scoped() {
        assert!(Error::EmptyInput.is_configuration());
        assert!(Error::InvalidConcurrency.is_configuration());
        assert!(Error::UnknownKind("getSlot".to_string()).is_configuration());
        assert!(!Error::NoKindsEnabled.is_configuration());
    }
}
