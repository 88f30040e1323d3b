use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use super::config::RunOptions;
use super::input::InputSource;
use super::invoker::Invoker;
use super::progress::ProgressFn;
use super::run::Coordinator;
use super::signal::StopSignal;
use super::stats::RunReport;

/// Everything needed to start a run in the background.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub options: RunOptions,
    pub source: InputSource,
    /// Defaults to one second.
    pub progress_interval: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    Running,
    Completed(RunReport),
    /// Run-level failure (input could not be loaded, nothing enabled, ...).
    Failed(String),
}

impl RunStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed(_) => "completed",
            Self::Failed(_) => "failed",
        }
    }
}

/// Observer and cancellation handle for a background run.
#[derive(Debug, Clone)]
pub struct RunHandle {
    status: watch::Receiver<RunStatus>,
    stop: Arc<StopSignal>,
}

impl RunHandle {
    pub fn status(&self) -> RunStatus {
        self.status.borrow().clone()
    }

    /// Asks every pool to stop starting new calls. In-flight calls still finish and the
    /// run completes with partial results.
    pub fn cancel(&self) {
        self.stop.stop();
    }

    pub fn is_cancelled(&self) -> bool {
        self.stop.is_stopped()
    }

    /// Waits for the run to leave [`RunStatus::Running`].
    pub async fn wait(&self) -> RunStatus {
        let mut rx = self.status.clone();
        match rx.wait_for(|s| !s.is_running()).await {
            Ok(status) => status.clone(),
            Err(_) => RunStatus::Failed("run task ended unexpectedly".to_string()),
        }
    }
}

/// Loads the input set, plans every kind and executes them on a spawned task.
///
/// Must be called from within a tokio runtime.
pub fn start_run<I: Invoker>(
    request: RunRequest,
    invoker: Arc<I>,
    progress: Option<ProgressFn>,
) -> RunHandle {
    let stop = Arc::new(StopSignal::new());
    let (tx, rx) = watch::channel(RunStatus::Running);

    let mut coordinator = Coordinator::new(invoker).with_stop(stop.clone());
    if let Some(progress) = progress {
        coordinator = coordinator.with_progress(progress);
    }
    if let Some(every) = request.progress_interval {
        coordinator = coordinator.with_progress_interval(every);
    }

    tokio::spawn(async move {
        let status = match request.source.load().await {
            Ok(input) => match coordinator.run(&request.options, &input).await {
                Ok(report) => RunStatus::Completed(report),
                Err(err) => {
                    tracing::warn!(error = %err, "run failed");
                    RunStatus::Failed(err.to_string())
                }
            },
            Err(err) => {
                tracing::warn!(error = %err, "run setup failed");
                RunStatus::Failed(err.to_string())
            }
        };
        let _ = tx.send(status);
    });

    RunHandle { status: rx, stop }
}
