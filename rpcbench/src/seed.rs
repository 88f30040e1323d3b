use std::path::Path;

use anyhow::Context as _;
use rpcbench_rpc::RpcClient;
use tokio::io::AsyncWriteExt as _;

use crate::cli::SeedArgs;
use crate::exit_codes::ExitCode;
use crate::run_error::RunError;

/// Accounts gathered from a set of programs.
#[derive(Debug, Default)]
pub(crate) struct Seeded {
    pub accounts: Vec<String>,
    /// Programs whose listing failed, with the error.
    pub failed: Vec<(String, rpcbench_rpc::Error)>,
}

/// Lists the accounts owned by every program, keeping at most `limit` per program
/// (`0` = all). A failing program is recorded and skipped.
pub(crate) async fn collect_accounts(
    client: &RpcClient,
    programs: &[String],
    limit: u64,
) -> Seeded {
    let mut seeded = Seeded::default();

    for program in programs {
        match client.program_account_keys(program).await {
            Ok(mut keys) => {
                let found = keys.len();
                if limit > 0 {
                    keys.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
                }
                tracing::info!(program = %program, found, kept = keys.len(), "listed program accounts");
                seeded.accounts.extend(keys);
            }
            Err(err) => {
                tracing::warn!(program = %program, error = %err, "failed to list program accounts");
                seeded.failed.push((program.clone(), err));
            }
        }
    }

    seeded
}

/// Appends one address per line, creating the file and its directory if needed.
pub(crate) async fn append_lines(path: &Path, lines: &[String]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create output dir: {}", parent.display()))?;
    }

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .with_context(|| format!("failed to open output file: {}", path.display()))?;

    let mut buf = String::with_capacity(lines.len() * 45);
    for line in lines {
        buf.push_str(line);
        buf.push('\n');
    }
    file.write_all(buf.as_bytes())
        .await
        .with_context(|| format!("failed to write output file: {}", path.display()))?;
    file.flush()
        .await
        .with_context(|| format!("failed to write output file: {}", path.display()))?;
    Ok(())
}

async fn programs(args: &SeedArgs) -> anyhow::Result<Vec<String>> {
    let mut programs: Vec<String> = args
        .programs
        .iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();

    if let Some(path) = &args.program_file {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read program file: {}", path.display()))?;
        programs.extend(
            text.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(ToString::to_string),
        );
    }

    if programs.is_empty() {
        anyhow::bail!("no programs given (use --program or --program-file)");
    }
    Ok(programs)
}

pub async fn seed(args: SeedArgs) -> Result<ExitCode, RunError> {
    let programs = programs(&args).await.map_err(RunError::InvalidInput)?;

    let client = RpcClient::new(&args.url, args.api_key.as_deref())
        .map_err(|e| RunError::InvalidInput(e.into()))?
        .with_timeout(args.request_timeout);

    println!("Fetching accounts for {} programs", programs.len());
    let seeded = collect_accounts(&client, &programs, args.limit).await;

    for (program, err) in &seeded.failed {
        eprintln!("failed to list accounts of {program}: {err}");
    }
    if seeded.failed.len() == programs.len() {
        return Err(RunError::RuntimeError(anyhow::anyhow!(
            "no program could be listed via {}",
            client.display_url()
        )));
    }

    append_lines(&args.output, &seeded.accounts)
        .await
        .map_err(RunError::RuntimeError)?;
    println!(
        "Saved {} accounts to {}",
        seeded.accounts.len(),
        args.output.display()
    );

    Ok(ExitCode::Success)
}
