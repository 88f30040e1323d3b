pub mod runner;

pub use runner::{
    Aggregator, AggregatorState, Call, Coordinator, Error, FnInvoker, InputCursor, InputSet,
    InputSource, Insights, Invoker, KindDefaults, KindOverrides, KindPlan, KindSelection,
    LatencyRank, LiveMetrics, LiveTotals, MethodReport, MethodResult, Outcome, OverallResult,
    PoolRun, ProgressFn, ProgressUpdate, RateRank, RequestKind, Result, RunConfig, RunGate,
    RunHandle, RunOptions, RunReport, RunRequest, RunStatus, StopSignal, WorkerPool, plan_kinds,
    start_run,
};
