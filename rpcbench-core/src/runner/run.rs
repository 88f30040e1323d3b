use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::config::{RequestKind, RunOptions};
use super::error::{Error, Result};
use super::input::InputSet;
use super::invoker::Invoker;
use super::plan::{KindPlan, plan_kinds};
use super::pool::{PoolRun, WorkerPool};
use super::progress::{Observed, ProgressFn, spawn_observer};
use super::signal::StopSignal;
use super::stats::{MethodReport, MethodResult, RunReport};

/// Runs every planned kind side by side and turns the drained pools into a report.
pub struct Coordinator<I> {
    invoker: Arc<I>,
    stop: Arc<StopSignal>,
    progress: Option<ProgressFn>,
    progress_interval: Duration,
}

impl<I> std::fmt::Debug for Coordinator<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("stopped", &self.stop.is_stopped())
            .field("progress", &self.progress.is_some())
            .field("progress_interval", &self.progress_interval)
            .finish_non_exhaustive()
    }
}

/// A planned kind is either a pool waiting for the shared start or a report settled
/// before anything ran.
type Planned<I> = std::result::Result<WorkerPool<I>, MethodReport>;

enum Slot {
    Done(MethodReport),
    Running(RequestKind, JoinHandle<Result<PoolRun>>),
}

impl<I: Invoker> Coordinator<I> {
    pub fn new(invoker: Arc<I>) -> Self {
        Self {
            invoker,
            stop: Arc::new(StopSignal::new()),
            progress: None,
            progress_interval: Duration::from_secs(1),
        }
    }

    #[must_use]
    pub fn with_stop(mut self, stop: Arc<StopSignal>) -> Self {
        self.stop = stop;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    #[must_use]
    pub fn with_progress_interval(mut self, every: Duration) -> Self {
        if !every.is_zero() {
            self.progress_interval = every;
        }
        self
    }

    /// Signal shared by every pool of this coordinator. Stopping it drains all kinds.
    pub fn stop_signal(&self) -> Arc<StopSignal> {
        self.stop.clone()
    }

    /// Plans `options` against `input` and executes the result.
    pub async fn run(&self, options: &RunOptions, input: &InputSet) -> Result<RunReport> {
        let plans = plan_kinds(options, input)?;
        self.execute(plans).await
    }

    pub async fn execute(&self, plans: Vec<KindPlan>) -> Result<RunReport> {
        if plans.is_empty() {
            return Err(Error::NoKindsEnabled);
        }

        let mut planned: Vec<Planned<I>> = Vec::with_capacity(plans.len());
        let mut observed = Vec::new();

        for plan in plans {
            match plan {
                KindPlan::Ready(config) => {
                    let kind = config.kind;
                    match WorkerPool::new(config, self.invoker.clone(), self.stop.clone()) {
                        Ok(pool) => {
                            observed.push(Observed {
                                method: kind,
                                concurrency: pool.config().concurrency,
                                duration: pool.config().duration,
                                aggregator: pool.aggregator(),
                            });
                            planned.push(Ok(pool));
                        }
                        Err(err) => planned.push(Err(MethodReport::Failed {
                            method: kind.to_string(),
                            error: err.to_string(),
                        })),
                    }
                }
                KindPlan::Disabled { method } => {
                    planned.push(Err(MethodReport::Disabled { method }));
                }
                KindPlan::Rejected { method, error } => {
                    planned.push(Err(MethodReport::Failed {
                        method,
                        error: error.to_string(),
                    }));
                }
            }
        }

        tracing::info!(kinds = observed.len(), "starting run");

        // One instant for every pool, so the kinds overlap in wall-clock time.
        let started = Instant::now();
        let slots: Vec<Slot> = planned
            .into_iter()
            .map(|planned| match planned {
                Ok(pool) => {
                    let kind = pool.config().kind;
                    Slot::Running(kind, tokio::spawn(pool.run(started)))
                }
                Err(report) => Slot::Done(report),
            })
            .collect();

        let progress_handle = match (&self.progress, observed.is_empty()) {
            (Some(progress), false) => Some(spawn_observer(
                observed,
                progress.clone(),
                self.progress_interval,
                started,
            )),
            _ => None,
        };

        let mut methods = Vec::with_capacity(slots.len());
        for slot in slots {
            let report = match slot {
                Slot::Done(report) => report,
                Slot::Running(kind, h) => match h.await {
                    Ok(Ok(run)) => {
                        MethodReport::Completed(MethodResult::from_state(kind, &run.state, run.elapsed))
                    }
                    Ok(Err(err)) => {
                        tracing::warn!(%kind, error = %err, "worker pool failed");
                        let error = match err {
                            Error::Join(_) => Error::PoolPanicked(kind.to_string()),
                            other => other,
                        };
                        MethodReport::Failed {
                            method: kind.to_string(),
                            error: error.to_string(),
                        }
                    }
                    Err(err) => {
                        tracing::warn!(%kind, error = %err, "worker pool task failed");
                        MethodReport::Failed {
                            method: kind.to_string(),
                            error: Error::PoolPanicked(kind.to_string()).to_string(),
                        }
                    }
                },
            };
            methods.push(report);
        }

        if let Some(h) = progress_handle {
            h.abort();
            let _ = h.await;
        }

        let report = RunReport::from_methods(methods);
        tracing::info!(
            elapsed = ?started.elapsed(),
            completed = report.completed().count(),
            failed = report.failed().count(),
            "run finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::runner::config::{KindDefaults, KindOverrides};
    use crate::runner::invoker::{Call, FnInvoker};

    #[derive(Debug, thiserror::Error)]
    #[error("rejected by target")]
    struct Rejected;

    #[tokio::test(start_paused = true)]
    async fn disabled_and_rejected_kinds_keep_their_place() {
        let invoker = Arc::new(FnInvoker::new(|_call: Call<'_>| async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok::<(), Rejected>(())
        }));

        let mut opts = RunOptions::all_kinds(KindDefaults {
            concurrency: 1,
            duration: Duration::from_millis(100),
            limit: 0,
        });
        opts.set_overrides(
            "getAccountInfo",
            KindOverrides {
                enabled: Some(false),
                ..KindOverrides::default()
            },
        );
        opts.set_overrides(
            "getMultipleAccounts",
            KindOverrides {
                duration: Some(Duration::ZERO),
                ..KindOverrides::default()
            },
        );

        let report = Coordinator::new(invoker)
            .run(&opts, &InputSet::new(["A"]))
            .await
            .unwrap();

        assert!(matches!(&report.methods[0], MethodReport::Disabled { method } if method == "getAccountInfo"));
        assert!(matches!(&report.methods[1], MethodReport::Failed { method, .. } if method == "getMultipleAccounts"));
        let done = report.methods[2].as_completed().unwrap();
        assert_eq!(done.method, RequestKind::ProgramAccounts);
        assert_eq!(done.success_count, 10);
        assert!(report.overall.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_invoker_only_fails_its_own_kind() {
        let invoker = Arc::new(FnInvoker::new(|call: Call<'_>| {
            let kind = call.kind();
            async move {
                if kind == RequestKind::ProgramAccounts {
                    panic!("invoker exploded");
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok::<(), Rejected>(())
            }
        }));

        let mut opts = RunOptions::default();
        opts.defaults = KindDefaults {
            concurrency: 1,
            duration: Duration::from_millis(50),
            limit: 0,
        };
        opts.set_overrides("getAccountInfo", KindOverrides::default());
        opts.set_overrides("getProgramAccounts", KindOverrides::default());

        let report = Coordinator::new(invoker)
            .run(&opts, &InputSet::new(["A"]))
            .await
            .unwrap();

        assert!(report.methods[0].as_completed().is_some());
        assert!(matches!(&report.methods[1], MethodReport::Failed { method, .. } if method == "getProgramAccounts"));
    }

    #[tokio::test]
    async fn empty_plan_is_a_run_error() {
        let invoker = Arc::new(FnInvoker::new(|_call: Call<'_>| async { Ok::<(), Rejected>(()) }));
        let err = Coordinator::new(invoker).execute(Vec::new()).await.unwrap_err();
        assert!(matches!(err, Error::NoKindsEnabled));
    }
}
