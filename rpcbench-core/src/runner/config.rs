use std::time::Duration;

use super::error::{Error, Result};
use super::input::InputSet;

/// Remote call types the harness can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumString, strum::Display)]
pub enum RequestKind {
    #[strum(serialize = "getAccountInfo")]
    AccountInfo,

    /// Batched lookup. Each call carries a random-size batch of addresses.
    #[strum(serialize = "getMultipleAccounts")]
    MultipleAccounts,

    #[strum(serialize = "getProgramAccounts")]
    ProgramAccounts,
}

impl RequestKind {
    pub const ALL: [RequestKind; 3] = [
        Self::AccountInfo,
        Self::MultipleAccounts,
        Self::ProgramAccounts,
    ];

    #[must_use]
    pub fn is_batched(self) -> bool {
        matches!(self, Self::MultipleAccounts)
    }
}

/// Fully resolved, immutable configuration for one worker pool.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub kind: RequestKind,
    pub concurrency: u64,
    pub duration: Duration,
    pub input: InputSet,
}

impl RunConfig {
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(Error::InvalidConcurrency);
        }
        if self.duration.is_zero() {
            return Err(Error::InvalidDuration);
        }
        if self.input.is_empty() {
            return Err(Error::EmptyInput);
        }
        Ok(())
    }
}

/// Values used for any per-kind field left unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindDefaults {
    pub concurrency: u64,
    pub duration: Duration,
    /// `0` = use the whole input set.
    pub limit: u64,
}

impl Default for KindDefaults {
    fn default() -> Self {
        Self {
            concurrency: 5,
            duration: Duration::from_secs(15),
            limit: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KindOverrides {
    pub concurrency: Option<u64>,
    pub duration: Option<Duration>,
    pub limit: Option<u64>,
    /// Unset means enabled.
    pub enabled: Option<bool>,
}

/// A request kind as named by the user, with its overrides. The name is resolved
/// into a [`RequestKind`] when the run is planned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindSelection {
    pub name: String,
    pub overrides: KindOverrides,
}

impl KindSelection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            overrides: KindOverrides::default(),
        }
    }

    pub fn with_overrides(name: impl Into<String>, overrides: KindOverrides) -> Self {
        Self {
            name: name.into(),
            overrides,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub defaults: KindDefaults,
    pub kinds: Vec<KindSelection>,
}

impl RunOptions {
    /// Every supported kind, enabled, using `defaults`.
    pub fn all_kinds(defaults: KindDefaults) -> Self {
        Self {
            defaults,
            kinds: RequestKind::ALL
                .iter()
                .map(|k| KindSelection::new(k.to_string()))
                .collect(),
        }
    }

    /// Applies `overrides` to the selection named `name`, appending it if missing.
    pub fn set_overrides(&mut self, name: &str, overrides: KindOverrides) {
        match self.kinds.iter_mut().find(|k| k.name == name) {
            Some(existing) => existing.overrides = overrides,
            None => self
                .kinds
                .push(KindSelection::with_overrides(name, overrides)),
        }
    }
}
