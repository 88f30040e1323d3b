use crate::exit_codes::ExitCode;

#[derive(Debug)]
pub enum RunError {
    InvalidInput(anyhow::Error),
    RuntimeError(anyhow::Error),
}

impl RunError {
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::InvalidInput(_) => ExitCode::InvalidInput,
            Self::RuntimeError(_) => ExitCode::RuntimeError,
        }
    }

    #[must_use]
    pub fn anyhow(&self) -> &anyhow::Error {
        match self {
            Self::InvalidInput(e) | Self::RuntimeError(e) => e,
        }
    }

    /// Input-set and planning errors are the user's to fix; everything else is ours.
    pub(crate) fn from_core(err: rpcbench_core::Error) -> Self {
        use rpcbench_core::Error as CoreError;

        match err {
            CoreError::InputSetup { .. } | CoreError::NoKindsEnabled => {
                Self::InvalidInput(err.into())
            }
            err if err.is_configuration() => Self::InvalidInput(err.into()),
            err => Self::RuntimeError(err.into()),
        }
    }
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(e) | Self::RuntimeError(e) => write!(f, "{e:#}"),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.anyhow().as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_errors_are_invalid_input() {
        let err = RunError::from_core(rpcbench_core::Error::NoKindsEnabled);
        assert_eq!(err.exit_code(), ExitCode::InvalidInput);

        let err = RunError::from_core(rpcbench_core::Error::InputSetup {
            path: "missing.txt".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        });
        assert_eq!(err.exit_code(), ExitCode::InvalidInput);
        assert!(err.to_string().contains("missing.txt"));
    }

    #[test]
    fn pool_failures_are_runtime_errors() {
        let err = RunError::from_core(rpcbench_core::Error::PoolPanicked(
            "getAccountInfo".to_string(),
        ));
        assert_eq!(err.exit_code(), ExitCode::RuntimeError);
    }
}
