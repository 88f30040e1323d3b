use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::aggregator::Aggregator;
use super::config::RequestKind;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveMetrics {
    /// Requests/sec observed during the last progress interval.
    pub rps_now: f64,

    /// Total requests observed so far.
    pub requests_total: u64,

    /// Total failed requests observed so far.
    pub failed_requests_total: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    /// Monotonic tick counter (1-based) for progress emissions.
    pub tick: u64,
    pub elapsed: Duration,
    pub method: RequestKind,
    pub concurrency: u64,
    pub duration: Duration,
    pub metrics: LiveMetrics,
}

impl ProgressUpdate {
    /// Share of the kind's configured duration already spent, clamped to `0..=100`.
    pub fn percent_complete(&self) -> f64 {
        let total = self.duration.as_secs_f64();
        if total <= 0.0 {
            return 100.0;
        }
        (self.elapsed.as_secs_f64() / total * 100.0).clamp(0.0, 100.0)
    }
}

pub type ProgressFn = std::sync::Arc<dyn Fn(ProgressUpdate) + Send + Sync + 'static>;

/// One pool as seen by the progress observer.
#[derive(Debug, Clone)]
pub(crate) struct Observed {
    pub(crate) method: RequestKind,
    pub(crate) concurrency: u64,
    pub(crate) duration: Duration,
    pub(crate) aggregator: Arc<Aggregator>,
}

/// Samples the live counters of every pool once per `every` and reports them.
///
/// Runs until aborted by the coordinator. Pools whose duration has passed are still
/// reported (their totals just stop moving) so the last tick reflects final counts.
pub(crate) fn spawn_observer(
    pools: Vec<Observed>,
    progress: ProgressFn,
    every: Duration,
    started: Instant,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(started + every, every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut tick_id: u64 = 0;
        let mut last_at = started;
        let mut last_totals: Vec<u64> = vec![0; pools.len()];

        loop {
            interval.tick().await;

            tick_id = tick_id.saturating_add(1);
            let now = Instant::now();
            let dt = now.duration_since(last_at).as_secs_f64();
            last_at = now;
            let elapsed = now.duration_since(started);

            for (pool, last) in pools.iter().zip(last_totals.iter_mut()) {
                let live = pool.aggregator.live();
                let delta = live.requests_total.saturating_sub(*last);
                *last = live.requests_total;

                let rps_now = if dt > 0.0 { delta as f64 / dt } else { 0.0 };

                (progress)(ProgressUpdate {
                    tick: tick_id,
                    elapsed: elapsed.min(pool.duration),
                    method: pool.method,
                    concurrency: pool.concurrency,
                    duration: pool.duration,
                    metrics: LiveMetrics {
                        rps_now,
                        requests_total: live.requests_total,
                        failed_requests_total: live.failed_total,
                    },
                });
            }
        }
    })
}
