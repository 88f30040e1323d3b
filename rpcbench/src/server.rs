use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime};

use anyhow::Context as _;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use rpcbench_core::{
    InputSource, ProgressFn, ProgressUpdate, RequestKind, RunHandle, RunRequest, RunStatus,
    start_run,
};
use rpcbench_rpc::RpcClient;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use uuid::Uuid;

use crate::cli::ServeArgs;
use crate::config_file::{MethodConfig, kind_defaults, run_options};
use crate::exit_codes::ExitCode;
use crate::invoker::RpcInvoker;
use crate::output::json::JsonReport;
use crate::run_error::RunError;
use crate::seed::collect_accounts;

const SEED_TIMEOUT: Duration = Duration::from_secs(30);

/// Body of `POST /test`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct TestRequest {
    target_rpc_url: String,
    api_key: Option<String>,
    /// RPC used to list `programs`; defaults to the target.
    rpc_url: Option<String>,
    #[serde(default)]
    programs: Vec<String>,
    /// Accounts kept per program when seeding (0 = all).
    #[serde(default)]
    seed_limit: u64,
    #[serde(default)]
    accounts: Vec<String>,
    account_file: Option<PathBuf>,
    #[serde(default)]
    methods: BTreeMap<String, MethodConfig>,
    #[serde(default, alias = "global")]
    global_config: MethodConfig,
}

#[derive(Debug, Serialize)]
struct ApiResponse<T> {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    timestamp: String,
}

fn reply<T: Serialize>(status: StatusCode, message: impl Into<String>, data: Option<T>) -> Response {
    let body = ApiResponse {
        success: status.is_success(),
        message: message.into(),
        data,
        timestamp: humantime::format_rfc3339_seconds(SystemTime::now()).to_string(),
    };
    (status, Json(body)).into_response()
}

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    reply::<()>(status, message, None)
}

#[derive(Debug, Clone, Serialize)]
struct LiveProgress {
    percent_complete: f64,
    requests: u64,
    failed_requests: u64,
    rps: f64,
}

#[derive(Debug)]
struct RunEntry {
    handle: RunHandle,
    target: String,
    started_at: SystemTime,
    progress: Arc<RwLock<BTreeMap<String, LiveProgress>>>,
}

impl RunEntry {
    fn summary(&self, id: Uuid) -> RunSummary {
        RunSummary {
            test_id: id,
            status: self.handle.status().as_str(),
            target: self.target.clone(),
            started_at: humantime::format_rfc3339_seconds(self.started_at).to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct RunSummary {
    test_id: Uuid,
    status: &'static str,
    target: String,
    started_at: String,
}

#[derive(Debug, Serialize)]
struct RunDetails {
    #[serde(flatten)]
    summary: RunSummary,
    progress: BTreeMap<String, LiveProgress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<JsonReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct Started {
    test_id: Uuid,
}

#[derive(Debug, Default)]
struct AppState {
    runs: RwLock<HashMap<Uuid, RunEntry>>,
}

impl AppState {
    fn cancel_all(&self) {
        let guard = self
            .runs
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for entry in guard.values() {
            entry.handle.cancel();
        }
    }
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/test", axum::routing::post(create_test))
        .route("/test/{id}", get(test_status).delete(delete_test))
        .route("/tests", get(list_tests))
        .with_state(state)
}

async fn index() -> Response {
    let methods: Vec<String> = RequestKind::ALL.iter().map(ToString::to_string).collect();
    let data = serde_json::json!({
        "service": "rpcbench",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "GET /": "Server information",
            "POST /test": "Start a new test",
            "GET /test/{id}": "Status and results of a test",
            "GET /tests": "List tests",
            "DELETE /test/{id}": "Cancel and remove a test",
        },
        "available_methods": methods,
    });
    reply(StatusCode::OK, "rpcbench server is running", Some(data))
}

fn progress_recorder(progress: Arc<RwLock<BTreeMap<String, LiveProgress>>>) -> ProgressFn {
    Arc::new(move |u: ProgressUpdate| {
        let live = LiveProgress {
            percent_complete: u.percent_complete(),
            requests: u.metrics.requests_total,
            failed_requests: u.metrics.failed_requests_total,
            rps: u.metrics.rps_now,
        };
        let mut guard = progress
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.insert(u.method.to_string(), live);
    })
}

async fn create_test(
    State(state): State<Arc<AppState>>,
    body: Result<Json<TestRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(v) => v,
        Err(rejection) => {
            return error(StatusCode::BAD_REQUEST, format!("invalid request body: {rejection}"));
        }
    };

    let client = match RpcClient::new(&req.target_rpc_url, req.api_key.as_deref()) {
        Ok(c) => c,
        Err(err) => return error(StatusCode::BAD_REQUEST, format!("invalid target_rpc_url: {err}")),
    };
    let target = client.display_url().to_string();

    let mut inline = req.accounts;
    if !req.programs.is_empty() {
        let seed_url = req.rpc_url.as_deref().unwrap_or(&req.target_rpc_url);
        let seeder = match RpcClient::new(seed_url, req.api_key.as_deref()) {
            Ok(c) => c.with_timeout(Some(SEED_TIMEOUT)),
            Err(err) => return error(StatusCode::BAD_REQUEST, format!("invalid rpc_url: {err}")),
        };
        let seeded = collect_accounts(&seeder, &req.programs, req.seed_limit).await;
        if seeded.failed.len() == req.programs.len() {
            let reasons: Vec<String> = seeded
                .failed
                .iter()
                .map(|(program, err)| format!("{program}: {err}"))
                .collect();
            return error(
                StatusCode::BAD_GATEWAY,
                format!("seeding failed: {}", reasons.join("; ")),
            );
        }
        inline.extend(seeded.accounts);
    }

    let defaults = kind_defaults(None, None, None, &req.global_config);
    let request = RunRequest {
        options: run_options(defaults, &req.global_config, &req.methods, &[]),
        source: InputSource {
            inline,
            file: req.account_file,
        },
        progress_interval: None,
    };

    let progress = Arc::new(RwLock::new(BTreeMap::new()));
    let handle = start_run(
        request,
        Arc::new(RpcInvoker::new(client)),
        Some(progress_recorder(progress.clone())),
    );

    let id = Uuid::new_v4();
    tracing::info!(test_id = %id, target = %target, "test started");
    {
        let mut guard = state
            .runs
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.insert(
            id,
            RunEntry {
                handle,
                target,
                started_at: SystemTime::now(),
                progress,
            },
        );
    }

    reply(StatusCode::ACCEPTED, "test started", Some(Started { test_id: id }))
}

fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw).ok()
}

async fn test_status(State(state): State<Arc<AppState>>, Path(raw): Path<String>) -> Response {
    let Some(id) = parse_id(&raw) else {
        return error(StatusCode::NOT_FOUND, format!("unknown test `{raw}`"));
    };

    let details = {
        let guard = state
            .runs
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let Some(entry) = guard.get(&id) else {
            return error(StatusCode::NOT_FOUND, format!("unknown test `{raw}`"));
        };

        let (report, err) = match entry.handle.status() {
            RunStatus::Running => (None, None),
            RunStatus::Completed(report) => (Some(JsonReport::from_report(&report)), None),
            RunStatus::Failed(err) => (None, Some(err)),
        };
        let progress = entry
            .progress
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();

        RunDetails {
            summary: entry.summary(id),
            progress,
            report,
            error: err,
        }
    };

    let message = format!("test {}", details.summary.status);
    reply(StatusCode::OK, message, Some(details))
}

async fn list_tests(State(state): State<Arc<AppState>>) -> Response {
    let mut runs: Vec<(SystemTime, RunSummary)> = {
        let guard = state
            .runs
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard
            .iter()
            .map(|(id, entry)| (entry.started_at, entry.summary(*id)))
            .collect()
    };
    runs.sort_by_key(|(started_at, _)| *started_at);
    let runs: Vec<RunSummary> = runs.into_iter().map(|(_, s)| s).collect();

    reply(StatusCode::OK, format!("{} tests", runs.len()), Some(runs))
}

async fn delete_test(State(state): State<Arc<AppState>>, Path(raw): Path<String>) -> Response {
    let removed = parse_id(&raw).and_then(|id| {
        state
            .runs
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&id)
    });

    let Some(entry) = removed else {
        return error(StatusCode::NOT_FOUND, format!("unknown test `{raw}`"));
    };

    if entry.handle.status().is_running() {
        entry.handle.cancel();
        tracing::info!(test_id = %raw, "test cancelled");
        return reply::<()>(StatusCode::OK, "test cancelled and removed", None);
    }
    reply::<()>(StatusCode::OK, "test removed", None)
}

pub async fn serve(args: ServeArgs) -> Result<ExitCode, RunError> {
    let listener = TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("failed to bind: {}", args.bind))
        .map_err(RunError::RuntimeError)?;
    let addr = listener
        .local_addr()
        .context("failed to resolve listen address")
        .map_err(RunError::RuntimeError)?;

    let state = Arc::new(AppState::default());
    let app = router(state.clone());

    println!("listening on http://{addr}");
    tracing::info!(%addr, "server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            state.cancel_all();
        })
        .await
        .context("server failed")
        .map_err(RunError::RuntimeError)?;

    Ok(ExitCode::Success)
}
