use std::io::Write as _;
use std::sync::Arc;
use std::time::Duration;

use rpcbench_core::{
    Insights, KindPlan, LatencyRank, MethodReport, MethodResult, OverallResult, ProgressFn,
    ProgressUpdate, RateRank, RunReport,
};
use serde::Serialize;

use super::OutputFormatter;

pub(crate) struct JsonOutput;

impl OutputFormatter for JsonOutput {
    fn print_header(&self, _target: &str, _inputs: usize, _plans: &[KindPlan]) {}

    fn progress(&self) -> Option<ProgressFn> {
        Some(Arc::new(move |u| {
            let line = JsonProgressLine::from_update(&u);
            emit_json_line(&line);
        }))
    }

    fn print_summary(&self, report: &RunReport) -> anyhow::Result<()> {
        let line = JsonSummaryLine {
            kind: "summary",
            report: JsonReport::from_report(report),
        };
        emit_json_line(&line);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonProgressLine {
    pub kind: &'static str,
    pub method: String,
    pub tick: u64,
    pub elapsed_secs: f64,
    pub percent_complete: f64,
    pub concurrency: u64,
    pub requests_per_sec: f64,
    pub total_requests: u64,
    pub failed_requests: u64,
}

impl JsonProgressLine {
    fn from_update(u: &ProgressUpdate) -> Self {
        Self {
            kind: "progress",
            method: u.method.to_string(),
            tick: u.tick,
            elapsed_secs: u.elapsed.as_secs_f64(),
            percent_complete: u.percent_complete(),
            concurrency: u.concurrency,
            requests_per_sec: u.metrics.rps_now,
            total_requests: u.metrics.requests_total,
            failed_requests: u.metrics.failed_requests_total,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonSummaryLine {
    pub kind: &'static str,
    #[serde(flatten)]
    pub report: JsonReport,
}

/// Wire form of a [`RunReport`]; shared by the NDJSON summary and the HTTP API.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct JsonReport {
    pub methods: Vec<JsonMethod>,
    pub overall: Option<JsonOverall>,
}

impl JsonReport {
    pub(crate) fn from_report(report: &RunReport) -> Self {
        Self {
            methods: report.methods.iter().map(JsonMethod::from_report).collect(),
            overall: report.overall.as_ref().map(JsonOverall::from_overall),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct JsonMethod {
    pub method: String,
    /// `completed`, `failed` or `disabled`.
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub result: Option<JsonMethodResult>,
}

impl JsonMethod {
    fn from_report(m: &MethodReport) -> Self {
        let (status, error, result) = match m {
            MethodReport::Completed(r) => ("completed", None, Some(JsonMethodResult::from_result(r))),
            MethodReport::Failed { error, .. } => ("failed", Some(error.clone()), None),
            MethodReport::Disabled { .. } => ("disabled", None, None),
        };
        Self {
            method: m.method(),
            status,
            error,
            result,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct JsonMethodResult {
    pub elapsed_secs: f64,
    pub total_requests: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub requests_per_sec: f64,
    pub success_rate: f64,
    pub min_latency_us: u64,
    pub avg_latency_us: u64,
    pub max_latency_us: u64,
}

impl JsonMethodResult {
    fn from_result(r: &MethodResult) -> Self {
        Self {
            elapsed_secs: r.elapsed.as_secs_f64(),
            total_requests: r.total_requests,
            success_count: r.success_count,
            failure_count: r.failure_count,
            requests_per_sec: r.requests_per_second,
            success_rate: r.success_rate_percent,
            min_latency_us: micros(r.min_latency),
            avg_latency_us: micros(r.avg_latency),
            max_latency_us: micros(r.max_latency),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct JsonOverall {
    pub total_requests: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub elapsed_secs: f64,
    pub requests_per_sec: f64,
    pub success_rate: f64,
    pub insights: JsonInsights,
}

impl JsonOverall {
    fn from_overall(o: &OverallResult) -> Self {
        Self {
            total_requests: o.total_requests,
            success_count: o.success_count,
            failure_count: o.failure_count,
            elapsed_secs: o.elapsed.as_secs_f64(),
            requests_per_sec: o.requests_per_second,
            success_rate: o.success_rate_percent,
            insights: JsonInsights::from_insights(&o.insights),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct JsonInsights {
    pub best_rps: JsonRate,
    pub worst_rps: JsonRate,
    pub fastest: Option<JsonLatency>,
    pub slowest: Option<JsonLatency>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct JsonRate {
    pub method: String,
    pub requests_per_sec: f64,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct JsonLatency {
    pub method: String,
    pub avg_latency_us: u64,
}

impl JsonInsights {
    fn from_insights(i: &Insights) -> Self {
        let rate = |r: &RateRank| JsonRate {
            method: r.method.to_string(),
            requests_per_sec: r.requests_per_second,
        };
        let latency = |l: &LatencyRank| JsonLatency {
            method: l.method.to_string(),
            avg_latency_us: micros(l.avg_latency),
        };
        Self {
            best_rps: rate(&i.best_rps),
            worst_rps: rate(&i.worst_rps),
            fastest: i.fastest.as_ref().map(latency),
            slowest: i.slowest.as_ref().map(latency),
        }
    }
}

fn micros(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}

fn emit_json_line<T: Serialize>(line: &T) {
    let mut out = std::io::stdout().lock();
    if serde_json::to_writer(&mut out, line).is_ok() {
        let _ = writeln!(out);
    }
}
