use std::time::Duration;

use super::aggregator::AggregatorState;
use super::config::RequestKind;

/// Final statistics for one request kind.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodResult {
    pub method: RequestKind,
    pub elapsed: Duration,
    pub total_requests: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub requests_per_second: f64,
    pub success_rate_percent: f64,
    pub min_latency: Duration,
    pub max_latency: Duration,
    pub avg_latency: Duration,
}

impl MethodResult {
    /// Latency figures are zero when the kind never succeeded.
    pub fn from_state(method: RequestKind, state: &AggregatorState, elapsed: Duration) -> Self {
        let total_requests = state.total_requests();
        let (min_latency, max_latency, avg_latency) = if state.success_count == 0 {
            (Duration::ZERO, Duration::ZERO, Duration::ZERO)
        } else {
            (
                state.min_latency,
                state.max_latency,
                avg(state.total_latency, state.success_count),
            )
        };

        Self {
            method,
            elapsed,
            total_requests,
            success_count: state.success_count,
            failure_count: state.failure_count,
            requests_per_second: per_second(total_requests, elapsed),
            success_rate_percent: percent(state.success_count, total_requests),
            min_latency,
            max_latency,
            avg_latency,
        }
    }
}

/// Outcome of one request kind within a run.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodReport {
    /// The pool ran to its deadline (or a stop) and produced statistics.
    Completed(MethodResult),
    /// The kind was rejected before starting, or its pool died.
    Failed { method: String, error: String },
    /// Switched off by configuration.
    Disabled { method: String },
}

impl MethodReport {
    pub fn method(&self) -> String {
        match self {
            Self::Completed(r) => r.method.to_string(),
            Self::Failed { method, .. } | Self::Disabled { method } => method.clone(),
        }
    }

    pub fn as_completed(&self) -> Option<&MethodResult> {
        match self {
            Self::Completed(r) => Some(r),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateRank {
    pub method: RequestKind,
    pub requests_per_second: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyRank {
    pub method: RequestKind,
    pub avg_latency: Duration,
}

/// Extremes across completed kinds. Ties go to the kind that appears first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Insights {
    pub best_rps: RateRank,
    pub worst_rps: RateRank,
    /// Only kinds with at least one success take part in the latency ranking.
    pub fastest: Option<LatencyRank>,
    pub slowest: Option<LatencyRank>,
}

impl Insights {
    fn from_results(results: &[&MethodResult]) -> Option<Self> {
        let (first, rest) = results.split_first()?;

        let rate = |r: &MethodResult| RateRank {
            method: r.method,
            requests_per_second: r.requests_per_second,
        };
        let mut best = rate(first);
        let mut worst = best;
        for r in rest {
            if r.requests_per_second > best.requests_per_second {
                best = rate(r);
            }
            if r.requests_per_second < worst.requests_per_second {
                worst = rate(r);
            }
        }

        let mut fastest: Option<LatencyRank> = None;
        let mut slowest: Option<LatencyRank> = None;
        for r in results.iter().filter(|r| r.success_count > 0) {
            let rank = LatencyRank {
                method: r.method,
                avg_latency: r.avg_latency,
            };
            if fastest.is_none_or(|f| rank.avg_latency < f.avg_latency) {
                fastest = Some(rank);
            }
            if slowest.is_none_or(|s| rank.avg_latency > s.avg_latency) {
                slowest = Some(rank);
            }
        }

        Some(Self {
            best_rps: best,
            worst_rps: worst,
            fastest,
            slowest,
        })
    }
}

/// Totals across every completed kind. Elapsed times are summed, so the recomputed rate
/// is a per-kind average rather than the aggregate wall-clock throughput.
#[derive(Debug, Clone, PartialEq)]
pub struct OverallResult {
    pub total_requests: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub elapsed: Duration,
    pub requests_per_second: f64,
    pub success_rate_percent: f64,
    pub insights: Insights,
}

impl OverallResult {
    /// `None` when there is nothing to summarize.
    pub fn from_results<'a, I>(results: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a MethodResult>,
    {
        let results: Vec<&MethodResult> = results.into_iter().collect();
        let insights = Insights::from_results(&results)?;

        let mut total_requests = 0u64;
        let mut success_count = 0u64;
        let mut failure_count = 0u64;
        let mut elapsed = Duration::ZERO;
        for r in &results {
            total_requests = total_requests.saturating_add(r.total_requests);
            success_count = success_count.saturating_add(r.success_count);
            failure_count = failure_count.saturating_add(r.failure_count);
            elapsed = elapsed.saturating_add(r.elapsed);
        }

        Some(Self {
            total_requests,
            success_count,
            failure_count,
            elapsed,
            requests_per_second: per_second(total_requests, elapsed),
            success_rate_percent: percent(success_count, total_requests),
            insights,
        })
    }
}

/// Everything a run produced, in planning order.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub methods: Vec<MethodReport>,
    pub overall: Option<OverallResult>,
}

impl RunReport {
    pub fn from_methods(methods: Vec<MethodReport>) -> Self {
        let overall = OverallResult::from_results(methods.iter().filter_map(MethodReport::as_completed));
        Self { methods, overall }
    }

    pub fn completed(&self) -> impl Iterator<Item = &MethodResult> {
        self.methods.iter().filter_map(MethodReport::as_completed)
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &str)> {
        self.methods.iter().filter_map(|m| match m {
            MethodReport::Failed { method, error } => Some((method.as_str(), error.as_str())),
            _ => None,
        })
    }

    pub fn has_failures(&self) -> bool {
        self.failed().next().is_some()
    }
}

fn per_second(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 { count as f64 / secs } else { 0.0 }
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    100.0 * part as f64 / whole as f64
}

fn avg(total: Duration, count: u64) -> Duration {
    if count == 0 {
        return Duration::ZERO;
    }
    let nanos = total.as_nanos() / u128::from(count);
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}
