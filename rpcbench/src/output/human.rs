use std::sync::Arc;

use rpcbench_core::{KindPlan, ProgressFn, RunReport};

mod format;
mod progress;
mod summary;

use format::{format_elapsed, format_rate};
use progress::HumanProgress;
use summary::render;

use super::OutputFormatter;

pub(crate) struct HumanReadableOutput {
    progress: Arc<HumanProgress>,
}

impl HumanReadableOutput {
    pub(crate) fn new() -> Self {
        Self {
            progress: Arc::new(HumanProgress::new()),
        }
    }
}

impl OutputFormatter for HumanReadableOutput {
    fn print_header(&self, target: &str, inputs: usize, plans: &[KindPlan]) {
        println!("target: {target}");
        println!("inputs: {inputs}");
        for p in plans {
            match p {
                KindPlan::Ready(cfg) => println!(
                    "method: {} concurrency={} duration={} inputs={}",
                    cfg.kind,
                    cfg.concurrency,
                    format_elapsed(cfg.duration),
                    cfg.input.len()
                ),
                KindPlan::Disabled { method } => println!("method: {method} disabled"),
                KindPlan::Rejected { method, error } => {
                    println!("method: {method} rejected ({error})");
                }
            }
        }
        if !plans.is_empty() {
            println!();
        }
    }

    fn progress(&self) -> Option<ProgressFn> {
        let progress = self.progress.clone();

        Some(Arc::new(move |u| {
            let message = format!(
                "workers={} elapsed={} requests={} failed={} rps={}",
                u.concurrency,
                format_elapsed(u.elapsed),
                u.metrics.requests_total,
                u.metrics.failed_requests_total,
                format_rate(u.metrics.rps_now)
            );
            progress.update(&u.method.to_string(), u.duration, u.elapsed, message);
        }))
    }

    fn print_summary(&self, report: &RunReport) -> anyhow::Result<()> {
        self.progress.finish();
        print!("{}", render(report));
        Ok(())
    }
}
