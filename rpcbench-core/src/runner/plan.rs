use std::collections::HashSet;

use super::config::{RequestKind, RunConfig, RunOptions};
use super::error::{Error, Result};
use super::input::InputSet;

/// What the coordinator will do with one selected kind.
#[derive(Debug)]
pub enum KindPlan {
    Ready(RunConfig),
    Disabled { method: String },
    /// Never starts; reported as failed while sibling kinds run.
    Rejected { method: String, error: Error },
}

impl KindPlan {
    pub fn method(&self) -> String {
        match self {
            Self::Ready(cfg) => cfg.kind.to_string(),
            Self::Disabled { method } | Self::Rejected { method, .. } => method.clone(),
        }
    }
}

/// Resolves every selection against the global defaults and the shared input set.
///
/// Per-kind problems become [`KindPlan::Rejected`]; only "nothing enabled" fails the
/// whole run.
pub fn plan_kinds(options: &RunOptions, input: &InputSet) -> Result<Vec<KindPlan>> {
    let defaults = options.defaults;
    let mut seen = HashSet::new();
    let mut plans = Vec::with_capacity(options.kinds.len());

    for selection in &options.kinds {
        let method = selection.name.clone();
        let o = &selection.overrides;

        if !o.enabled.unwrap_or(true) {
            plans.push(KindPlan::Disabled { method });
            continue;
        }

        let kind = match method.parse::<RequestKind>() {
            Ok(kind) => kind,
            Err(_) => {
                let error = Error::UnknownKind(method.clone());
                tracing::warn!(%method, %error, "rejecting request kind");
                plans.push(KindPlan::Rejected { method, error });
                continue;
            }
        };

        if !seen.insert(kind) {
            let error = Error::DuplicateKind(method.clone());
            tracing::warn!(%method, %error, "rejecting request kind");
            plans.push(KindPlan::Rejected { method, error });
            continue;
        }

        let config = RunConfig {
            kind,
            concurrency: o.concurrency.unwrap_or(defaults.concurrency),
            duration: o.duration.unwrap_or(defaults.duration),
            input: input.truncated(o.limit.unwrap_or(defaults.limit)),
        };

        match config.validate() {
            Ok(()) => plans.push(KindPlan::Ready(config)),
            Err(error) => {
                tracing::warn!(%method, %error, "rejecting request kind");
                plans.push(KindPlan::Rejected { method, error });
            }
        }
    }

    if plans.iter().all(|p| matches!(p, KindPlan::Disabled { .. })) {
        return Err(Error::NoKindsEnabled);
    }

    Ok(plans)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::time::Duration;

    use super::*;
    use crate::runner::config::{KindDefaults, KindOverrides};

    fn ready(plan: &KindPlan) -> &RunConfig {
        match plan {
            KindPlan::Ready(cfg) => cfg,
            other => panic!("expected ready plan, got {other:?}"),
        }
    }

    #[test]
    fn unset_fields_fall_back_to_defaults() {
        let mut opts = RunOptions::all_kinds(KindDefaults {
            concurrency: 3,
            duration: Duration::from_secs(2),
            limit: 0,
        });
        opts.set_overrides(
            "getMultipleAccounts",
            KindOverrides {
                concurrency: Some(8),
                limit: Some(1),
                ..KindOverrides::default()
            },
        );

        let input = InputSet::new(["A", "B"]);
        let plans = plan_kinds(&opts, &input).unwrap();
        assert_eq!(plans.len(), 3);

        let info = ready(&plans[0]);
        assert_eq!(info.concurrency, 3);
        assert_eq!(info.duration, Duration::from_secs(2));
        assert_eq!(info.input.len(), 2);

        let multi = ready(&plans[1]);
        assert_eq!(multi.concurrency, 8);
        assert_eq!(multi.input.len(), 1);
    }

    #[test]
    fn bad_kinds_are_rejected_without_touching_siblings() {
        let mut opts = RunOptions::all_kinds(KindDefaults::default());
        opts.set_overrides(
            "getAccountInfo",
            KindOverrides {
                concurrency: Some(0),
                ..KindOverrides::default()
            },
        );
        opts.set_overrides("getSlot", KindOverrides::default());

        let plans = plan_kinds(&opts, &InputSet::new(["A"])).unwrap();
        assert!(matches!(
            &plans[0],
            KindPlan::Rejected {
                error: Error::InvalidConcurrency,
                ..
            }
        ));
        assert!(matches!(plans[1], KindPlan::Ready(_)));
        assert!(matches!(
            &plans[3],
            KindPlan::Rejected {
                error: Error::UnknownKind(_),
                ..
            }
        ));
    }

    #[test]
    fn empty_input_rejects_each_kind() {
        let opts = RunOptions::all_kinds(KindDefaults::default());
        let plans = plan_kinds(&opts, &InputSet::default()).unwrap();
        assert!(plans.iter().all(|p| matches!(
            p,
            KindPlan::Rejected {
                error: Error::EmptyInput,
                ..
            }
        )));
    }

    #[test]
    fn all_disabled_is_a_run_error() {
        let mut opts = RunOptions::all_kinds(KindDefaults::default());
        for kind in RequestKind::ALL {
            opts.set_overrides(
                &kind.to_string(),
                KindOverrides {
                    enabled: Some(false),
                    ..KindOverrides::default()
                },
            );
        }
        assert!(matches!(
            plan_kinds(&opts, &InputSet::new(["A"])),
            Err(Error::NoKindsEnabled)
        ));

        let empty = RunOptions::default();
        assert!(matches!(
            plan_kinds(&empty, &InputSet::new(["A"])),
            Err(Error::NoKindsEnabled)
        ));
    }

    #[test]
    fn duplicate_kind_is_rejected() {
        let mut opts = RunOptions::default();
        opts.kinds.push(crate::runner::config::KindSelection::new("getAccountInfo"));
        opts.kinds.push(crate::runner::config::KindSelection::new("getAccountInfo"));

        let plans = plan_kinds(&opts, &InputSet::new(["A"])).unwrap();
        assert!(matches!(plans[0], KindPlan::Ready(_)));
        assert!(matches!(
            &plans[1],
            KindPlan::Rejected {
                error: Error::DuplicateKind(_),
                ..
            }
        ));
    }
}
