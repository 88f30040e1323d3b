use std::fmt::Write as _;

use rpcbench_core::{MethodReport, MethodResult, OverallResult, RunReport};

use super::format::{format_latency, format_percent, format_rate};

pub(crate) fn render(report: &RunReport) -> String {
    let mut out = String::new();

    if report.methods.is_empty() {
        out.push_str("summary: no methods\n");
        return out;
    }

    out.push_str("summary\n");

    for m in &report.methods {
        writeln!(&mut out, "method: {}", m.method()).ok();
        match m {
            MethodReport::Completed(r) => render_method(r, &mut out),
            MethodReport::Failed { error, .. } => {
                writeln!(&mut out, "  failed: {error}").ok();
            }
            MethodReport::Disabled { .. } => out.push_str("  disabled\n"),
        }
        out.push('\n');
    }

    match &report.overall {
        Some(overall) => render_overall(overall, &mut out),
        None => out.push_str("overall: no method completed\n"),
    }

    out
}

fn render_method(r: &MethodResult, out: &mut String) {
    writeln!(
        out,
        "  requests: {} (ok {}, failed {})",
        r.total_requests, r.success_count, r.failure_count
    )
    .ok();
    writeln!(out, "  success rate: {}", format_percent(r.success_rate_percent)).ok();
    writeln!(out, "  rps: {}", format_rate(r.requests_per_second)).ok();

    if r.success_count > 0 {
        writeln!(
            out,
            "  latency: min={} avg={} max={}",
            format_latency(r.min_latency),
            format_latency(r.avg_latency),
            format_latency(r.max_latency)
        )
        .ok();
    } else {
        out.push_str("  latency: n/a\n");
    }

    writeln!(out, "  elapsed: {:.2}s", r.elapsed.as_secs_f64()).ok();
}

fn render_overall(o: &OverallResult, out: &mut String) {
    out.push_str("overall\n");
    writeln!(
        out,
        "  requests: {} (ok {}, failed {})",
        o.total_requests, o.success_count, o.failure_count
    )
    .ok();
    writeln!(out, "  success rate: {}", format_percent(o.success_rate_percent)).ok();
    writeln!(out, "  rps: {}", format_rate(o.requests_per_second)).ok();
    writeln!(out, "  elapsed (summed): {:.2}s", o.elapsed.as_secs_f64()).ok();

    let i = &o.insights;
    out.push_str("insights\n");
    writeln!(
        out,
        "  best throughput: {} ({} rps)",
        i.best_rps.method,
        format_rate(i.best_rps.requests_per_second)
    )
    .ok();
    writeln!(
        out,
        "  worst throughput: {} ({} rps)",
        i.worst_rps.method,
        format_rate(i.worst_rps.requests_per_second)
    )
    .ok();
    if let Some(f) = &i.fastest {
        writeln!(
            out,
            "  fastest avg latency: {} ({})",
            f.method,
            format_latency(f.avg_latency)
        )
        .ok();
    }
    if let Some(s) = &i.slowest {
        writeln!(
            out,
            "  slowest avg latency: {} ({})",
            s.method,
            format_latency(s.avg_latency)
        )
        .ok();
    }
}
