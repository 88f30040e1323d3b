use std::sync::Arc;

use anyhow::Context as _;
use rpcbench_core::{Coordinator, plan_kinds};
use rpcbench_rpc::RpcClient;

use crate::cli::RunArgs;
use crate::config_file::{self, ConfigFile, RunSettings};
use crate::exit_codes::ExitCode;
use crate::invoker::RpcInvoker;
use crate::output;
use crate::run_error::RunError;

pub async fn run(args: RunArgs) -> Result<ExitCode, RunError> {
    let out = output::formatter(args.output);

    let file = match &args.config {
        Some(path) => config_file::load(path)
            .await
            .map_err(RunError::InvalidInput)?,
        None => ConfigFile::default(),
    };
    let settings = RunSettings::resolve(&args, file).map_err(RunError::InvalidInput)?;

    let client = RpcClient::new(&settings.url, settings.api_key.as_deref())
        .with_context(|| format!("invalid target RPC URL: {}", settings.url))
        .map_err(RunError::InvalidInput)?
        .with_timeout(args.request_timeout);
    let target = client.display_url().to_string();

    let input = settings.source.load().await.map_err(RunError::from_core)?;
    let plans = plan_kinds(&settings.options, &input).map_err(RunError::from_core)?;

    out.print_header(&target, input.len(), &plans);

    let mut coordinator = Coordinator::new(Arc::new(RpcInvoker::new(client)));
    if let Some(progress) = out.progress() {
        coordinator = coordinator.with_progress(progress);
    }

    let stop = coordinator.stop_signal();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, draining in-flight calls");
            stop.stop();
        }
    });

    let report = coordinator.execute(plans).await;
    interrupt.abort();
    let report = report.map_err(RunError::from_core)?;

    out.print_summary(&report)
        .map_err(RunError::RuntimeError)?;

    for (method, error) in report.failed() {
        eprintln!("method {method} failed: {error}");
    }

    Ok(ExitCode::from_report(&report))
}
