use crate::cli::OutputFormat;

mod human;
pub(crate) mod json;

pub(crate) trait OutputFormatter: Send + Sync {
    fn print_header(&self, target: &str, inputs: usize, plans: &[rpcbench_core::KindPlan]);
    fn progress(&self) -> Option<rpcbench_core::ProgressFn>;
    fn print_summary(&self, report: &rpcbench_core::RunReport) -> anyhow::Result<()>;
}

pub(crate) fn formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::HumanReadable => Box::new(human::HumanReadableOutput::new()),
        OutputFormat::Json => Box::new(json::JsonOutput),
    }
}
