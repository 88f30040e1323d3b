mod aggregator;
mod config;
mod cursor;
mod error;
mod gate;
mod handle;
mod input;
mod invoker;
mod plan;
mod pool;
mod progress;
mod run;
mod signal;
mod stats;

pub use aggregator::{Aggregator, AggregatorState, LiveTotals, Outcome};
pub use config::{KindDefaults, KindOverrides, KindSelection, RequestKind, RunConfig, RunOptions};
pub use cursor::{BATCH_MAX, BATCH_MIN, InputCursor};
pub use error::{Error, Result};
pub use gate::RunGate;
pub use handle::{RunHandle, RunRequest, RunStatus, start_run};
pub use input::{InputSet, InputSource};
pub use invoker::{Call, FnInvoker, Invoker};
pub use plan::{KindPlan, plan_kinds};
pub use pool::{PoolRun, WorkerPool};
pub use progress::{LiveMetrics, ProgressFn, ProgressUpdate};
pub use run::Coordinator;
pub use signal::StopSignal;
pub use stats::{
    Insights, LatencyRank, MethodReport, MethodResult, OverallResult, RateRank, RunReport,
};
