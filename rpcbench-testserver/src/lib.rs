use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::routing::post;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::{Duration, sleep};

pub const PATH_RPC: &str = "/";

/// Base58 public keys handed out by `getProgramAccounts` unless configured otherwise.
pub const DEFAULT_PROGRAM_ACCOUNTS: [&str; 3] = [
    "7Xnw7aDxJu1CxPPEkz9ttfGSn2bpH3R1GYYziJxTCv3e",
    "vines1vzrYbzLMRdu58ou5XTby4qAqVRLmqo36NKPTg",
    "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin",
];

/// How the fake node behaves.
#[derive(Debug, Clone)]
pub struct TestServerConfig {
    /// Added before every response.
    pub latency: Duration,
    /// Methods answered with a JSON-RPC error instead of a result.
    pub failing_methods: HashSet<String>,
    /// Answer every call with this HTTP status and no JSON body.
    pub http_status: Option<u16>,
    pub program_accounts: Vec<String>,
}

impl Default for TestServerConfig {
    fn default() -> Self {
        Self {
            latency: Duration::ZERO,
            failing_methods: HashSet::new(),
            http_status: None,
            program_accounts: DEFAULT_PROGRAM_ACCOUNTS
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

impl TestServerConfig {
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    #[must_use]
    pub fn failing(mut self, method: &str) -> Self {
        self.failing_methods.insert(method.to_string());
        self
    }

    #[must_use]
    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct TestServerStats {
    requests_total: Arc<AtomicU64>,
    account_info_total: Arc<AtomicU64>,
    multiple_accounts_total: Arc<AtomicU64>,
    program_accounts_total: Arc<AtomicU64>,
    saw_api_key: Arc<AtomicU64>,
    batch_min: Arc<AtomicU64>,
    batch_max: Arc<AtomicU64>,
}

impl TestServerStats {
    fn inc_requests_total(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    fn record_method(&self, method: &str) {
        let counter = match method {
            "getAccountInfo" => &self.account_info_total,
            "getMultipleAccounts" => &self.multiple_accounts_total,
            "getProgramAccounts" => &self.program_accounts_total,
            _ => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn record_batch(&self, size: u64) {
        // `0` in batch_min means "nothing seen yet".
        let _ = self
            .batch_min
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |cur| {
                (cur == 0 || size < cur).then_some(size)
            });
        self.batch_max.fetch_max(size, Ordering::Relaxed);
    }

    fn inc_saw_api_key(&self) {
        self.saw_api_key.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn method_total(&self, method: &str) -> u64 {
        match method {
            "getAccountInfo" => self.account_info_total.load(Ordering::Relaxed),
            "getMultipleAccounts" => self.multiple_accounts_total.load(Ordering::Relaxed),
            "getProgramAccounts" => self.program_accounts_total.load(Ordering::Relaxed),
            _ => 0,
        }
    }

    /// Requests whose URL carried a `key` query parameter.
    pub fn saw_api_key(&self) -> u64 {
        self.saw_api_key.load(Ordering::Relaxed)
    }

    /// Smallest and largest `getMultipleAccounts` batch seen so far.
    pub fn batch_bounds(&self) -> Option<(u64, u64)> {
        let min = self.batch_min.load(Ordering::Relaxed);
        let max = self.batch_max.load(Ordering::Relaxed);
        (min != 0).then_some((min, max))
    }
}

#[derive(Debug, Clone)]
struct AppState {
    stats: TestServerStats,
    config: Arc<TestServerConfig>,
}

#[derive(Debug, Deserialize)]
struct RpcCall {
    #[serde(default)]
    id: Value,
    method: String,
    #[serde(default)]
    params: Value,
}

fn rpc_error(id: Value, code: i64, message: &str) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "error": { "code": code, "message": message } })
}

fn rpc_result(id: Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn account_value() -> Value {
    json!({
        "data": ["", "base64"],
        "executable": false,
        "lamports": 1_000_000,
        "owner": "11111111111111111111111111111111",
        "rentEpoch": 0,
        "space": 0
    })
}

async fn handle_rpc(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> (axum::http::StatusCode, Json<Value>) {
    use axum::http::StatusCode;

    state.stats.inc_requests_total();
    if query.get("key").is_some_and(|k| !k.is_empty()) {
        state.stats.inc_saw_api_key();
    }

    if !state.config.latency.is_zero() {
        sleep(state.config.latency).await;
    }

    if let Some(status) = state.config.http_status {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (status, Json(json!({ "message": "simulated http failure" })));
    }

    let call: RpcCall = match serde_json::from_slice(&body) {
        Ok(call) => call,
        Err(_) => return (StatusCode::OK, Json(rpc_error(Value::Null, -32700, "Parse error"))),
    };
    state.stats.record_method(&call.method);

    if state.config.failing_methods.contains(&call.method) {
        return (StatusCode::OK, Json(rpc_error(call.id, -32000, "simulated failure")));
    }

    let context = json!({ "slot": 1 });
    let result = match call.method.as_str() {
        "getAccountInfo" => json!({ "context": context, "value": account_value() }),
        "getMultipleAccounts" => {
            let n = call
                .params
                .get(0)
                .and_then(Value::as_array)
                .map_or(0, Vec::len);
            state.stats.record_batch(n as u64);
            let values: Vec<Value> = (0..n).map(|_| account_value()).collect();
            json!({ "context": context, "value": values })
        }
        "getProgramAccounts" => Value::Array(
            state
                .config
                .program_accounts
                .iter()
                .map(|pubkey| json!({ "pubkey": pubkey, "account": account_value() }))
                .collect(),
        ),
        _ => {
            return (
                StatusCode::OK,
                Json(rpc_error(call.id, -32601, "Method not found")),
            );
        }
    };

    (StatusCode::OK, Json(rpc_result(call.id, result)))
}

pub fn router(stats: TestServerStats, config: TestServerConfig) -> Router {
    Router::new()
        .route(PATH_RPC, post(handle_rpc))
        .with_state(AppState {
            stats,
            config: Arc::new(config),
        })
}

/// Fake Solana JSON-RPC node bound to an ephemeral localhost port.
pub struct TestServer {
    addr: SocketAddr,
    base_url: String,
    stats: TestServerStats,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    pub async fn start() -> std::io::Result<Self> {
        Self::start_with(TestServerConfig::default()).await
    }

    pub async fn start_with(config: TestServerConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let stats = TestServerStats::default();
        let app = router(stats.clone(), config);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = serve.await;
        });

        Ok(Self {
            addr,
            base_url: format!("http://{addr}"),
            stats,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn stats(&self) -> &TestServerStats {
        &self.stats
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if self.shutdown_tx.is_some()
            && let Some(task) = self.task.take()
        {
            task.abort();
        }
    }
}
