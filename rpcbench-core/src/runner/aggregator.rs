use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Result of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub success: bool,
    pub latency: Duration,
}

impl Outcome {
    pub fn success(latency: Duration) -> Self {
        Self {
            success: true,
            latency,
        }
    }

    pub fn failure(latency: Duration) -> Self {
        Self {
            success: false,
            latency,
        }
    }
}

/// Raw counters for one pool. Latency fields only account for successful calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregatorState {
    pub success_count: u64,
    pub failure_count: u64,
    /// `Duration::MAX` until the first success.
    pub min_latency: Duration,
    pub max_latency: Duration,
    pub total_latency: Duration,
}

impl Default for AggregatorState {
    fn default() -> Self {
        Self {
            success_count: 0,
            failure_count: 0,
            min_latency: Duration::MAX,
            max_latency: Duration::ZERO,
            total_latency: Duration::ZERO,
        }
    }
}

impl AggregatorState {
    pub fn total_requests(&self) -> u64 {
        self.success_count.saturating_add(self.failure_count)
    }

    fn apply(&mut self, outcome: Outcome) {
        if !outcome.success {
            self.failure_count = self.failure_count.saturating_add(1);
            return;
        }

        self.success_count = self.success_count.saturating_add(1);
        self.min_latency = self.min_latency.min(outcome.latency);
        self.max_latency = self.max_latency.max(outcome.latency);
        self.total_latency = self.total_latency.saturating_add(outcome.latency);
    }
}

/// Totals visible while a pool is still running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LiveTotals {
    pub requests_total: u64,
    pub failed_total: u64,
}

/// Shared sink for the outcomes of one pool.
///
/// The compound update (counter, bounds, sum) happens under a single mutex. Two relaxed
/// atomics mirror the request/failure counts so the progress observer never touches the
/// lock.
#[derive(Debug, Default)]
pub struct Aggregator {
    state: Mutex<AggregatorState>,
    requests_total: AtomicU64,
    failed_total: AtomicU64,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, outcome: Outcome) {
        {
            let mut state = self
                .state
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            state.apply(outcome);
        }

        self.requests_total.fetch_add(1, Ordering::Relaxed);
        if !outcome.success {
            self.failed_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn live(&self) -> LiveTotals {
        LiveTotals {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            failed_total: self.failed_total.load(Ordering::Relaxed),
        }
    }

    /// Final state. Only meaningful once every worker writing here has been joined.
    pub fn snapshot(&self) -> AggregatorState {
        *self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
