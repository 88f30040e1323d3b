use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Parses `10s`, `250ms`, `1m 30s` (humantime syntax) or bare seconds such as `15` and
/// `1.5`. Shared by the flags and the config file.
pub(crate) fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("duration cannot be empty (expected e.g. 10s, 250ms, 1m)".to_string());
    }

    if let Ok(secs) = s.parse::<f64>() {
        return Duration::try_from_secs_f64(secs)
            .map_err(|err| format!("invalid duration '{s}': {err}"));
    }

    humantime::parse_duration(s)
        .map_err(|err| format!("invalid duration '{s}' (expected e.g. 10s, 250ms, 1m): {err}"))
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Progress bars and a human-readable summary.
    HumanReadable,
    /// Emit JSON progress lines (NDJSON) and one summary line to stdout.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "rpcbench",
    author,
    version,
    about = "Load benchmark for Solana JSON-RPC endpoints",
    long_about = "rpcbench drives concurrent getAccountInfo, getMultipleAccounts and getProgramAccounts traffic against a Solana JSON-RPC endpoint for a fixed duration and reports throughput, success rate and latency per method.\n\nAll enabled methods run side by side, each with its own pool of workers.",
    after_help = "Examples:\n  rpcbench seed --url https://api.mainnet-beta.solana.com -p TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA --limit 200\n  rpcbench run --url http://127.0.0.1:8899 --account-file accounts.txt -c 20 -d 30s\n  rpcbench run --config bench.yaml --method getAccountInfo --output json\n  rpcbench serve --bind 127.0.0.1:8888"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Benchmark an RPC endpoint
    #[command(
        long_about = "Benchmark an RPC endpoint.\n\nCLI flags override values from --config, which override the built-in defaults (concurrency 5, duration 15s, no limit)."
    )]
    Run(RunArgs),

    /// Collect account addresses owned by one or more programs into a file
    Seed(SeedArgs),

    /// Serve an HTTP API that starts and tracks benchmark runs
    Serve(ServeArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Target RPC URL
    #[arg(short = 'u', long, env = "RPCBENCH_URL")]
    pub url: Option<String>,

    /// API key appended to the target URL as `?key=`
    #[arg(long, env = "RPCBENCH_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// YAML/JSON config file with defaults and per-method overrides
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Method to benchmark (repeatable; defaults to every supported method)
    #[arg(short = 'm', long = "method", value_name = "NAME")]
    pub methods: Vec<String>,

    /// Account address used as input (repeatable)
    #[arg(short = 'a', long = "account", value_name = "ADDRESS")]
    pub accounts: Vec<String>,

    /// File with one account address per line
    #[arg(short = 'f', long)]
    pub account_file: Option<PathBuf>,

    /// Use at most this many input addresses (0 = all)
    #[arg(short = 'l', long)]
    pub limit: Option<u64>,

    /// Concurrent workers per method
    #[arg(short = 'c', long)]
    pub concurrency: Option<u64>,

    /// Test duration per method (e.g. 10s, 250ms, 1m)
    #[arg(short = 'd', long, value_parser = parse_duration)]
    pub duration: Option<Duration>,

    /// Upper bound for a single RPC call (e.g. 5s)
    #[arg(long, value_parser = parse_duration)]
    pub request_timeout: Option<Duration>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,
}

#[derive(Debug, Args)]
pub struct SeedArgs {
    /// RPC URL used to list program accounts
    #[arg(short = 'u', long, env = "RPCBENCH_SEED_URL")]
    pub url: String,

    /// API key appended to the seeding URL as `?key=`
    #[arg(long, env = "RPCBENCH_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Program address (repeatable)
    #[arg(short = 'p', long = "program", value_name = "ADDRESS")]
    pub programs: Vec<String>,

    /// File with one program address per line
    #[arg(long)]
    pub program_file: Option<PathBuf>,

    /// File the account addresses are appended to
    #[arg(short = 'o', long, default_value = "accounts.txt")]
    pub output: PathBuf,

    /// Keep at most this many accounts per program (0 = all)
    #[arg(short = 'l', long, default_value_t = 0)]
    pub limit: u64,

    /// Upper bound for a single RPC call (e.g. 30s)
    #[arg(long, value_parser = parse_duration)]
    pub request_timeout: Option<Duration>,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "RPCBENCH_BIND", default_value = "127.0.0.1:8888")]
    pub bind: SocketAddr,
}
