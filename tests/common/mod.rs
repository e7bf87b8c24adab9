#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::Mutex;

use dsaas_backend::config::{PipelineConfig, VaultConfig};

/// Scripted Vault double. Counts login and read calls, plays back a queue of
/// statuses for secret reads (an empty queue means 200), and serves a
/// configurable secret payload.
pub struct MockVault {
    pub logins: AtomicUsize,
    pub reads: AtomicUsize,
    pub read_script: Mutex<VecDeque<u16>>,
    pub secret_data: Mutex<Value>,
    /// Artificial delay inside the login handler, to widen race windows.
    pub login_delay: Duration,
    /// Last X-Vault-Token header seen on a secret read.
    pub last_token: Mutex<Option<String>>,
}

impl MockVault {
    pub fn new() -> Arc<Self> {
        Self::with_login_delay(Duration::ZERO)
    }

    pub fn with_login_delay(login_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            logins: AtomicUsize::new(0),
            reads: AtomicUsize::new(0),
            read_script: Mutex::new(VecDeque::new()),
            secret_data: Mutex::new(json!({ "x-api-key": "key-123" })),
            login_delay,
            last_token: Mutex::new(None),
        })
    }

    pub async fn script_reads(&self, statuses: &[u16]) {
        let mut script = self.read_script.lock().await;
        script.extend(statuses.iter().copied());
    }

    pub async fn set_secret_data(&self, data: Value) {
        *self.secret_data.lock().await = data;
    }

    pub fn login_count(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

async fn vault_login(State(state): State<Arc<MockVault>>) -> Response {
    let n = state.logins.fetch_add(1, Ordering::SeqCst) + 1;
    tokio::time::sleep(state.login_delay).await;
    Json(json!({
        "auth": { "client_token": format!("token-{n}") }
    }))
    .into_response()
}

async fn vault_read(
    State(state): State<Arc<MockVault>>,
    Path((_engine, _path)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    state.reads.fetch_add(1, Ordering::SeqCst);
    let token = headers
        .get("X-Vault-Token")
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    *state.last_token.lock().await = token;

    let status = state.read_script.lock().await.pop_front().unwrap_or(200);
    if status != 200 {
        let code = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (code, Json(json!({ "errors": ["permission denied"] }))).into_response();
    }

    let data = state.secret_data.lock().await.clone();
    Json(json!({ "data": { "data": data } })).into_response()
}

/// Serves the mock Vault on an ephemeral port and returns its /v1 base URL.
pub async fn spawn_vault(state: Arc<MockVault>) -> String {
    let app = Router::new()
        .route("/v1/auth/approle/login", post(vault_login))
        .route("/v1/:engine/data/:path", get(vault_read))
        .with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/v1")
}

/// Scripted pipeline-trigger upstream: responds with a fixed status and body,
/// recording the API key header and payload it was called with.
pub struct MockPipeline {
    pub hits: AtomicUsize,
    pub status: u16,
    pub body: String,
    pub last_api_key: Mutex<Option<String>>,
    pub last_payload: Mutex<Option<Value>>,
}

impl MockPipeline {
    pub fn new(status: u16, body: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            hits: AtomicUsize::new(0),
            status,
            body: body.into(),
            last_api_key: Mutex::new(None),
            last_payload: Mutex::new(None),
        })
    }

    pub fn hit_count(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn pipeline_trigger(
    State(state): State<Arc<MockPipeline>>,
    Path(_pipeline_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    *state.last_api_key.lock().await = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    *state.last_payload.lock().await = Some(payload);

    let code = StatusCode::from_u16(state.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (code, state.body.clone()).into_response()
}

/// Serves the mock pipeline upstream and returns a URL template with the
/// `{pipeline_id}` placeholder.
pub async fn spawn_pipeline(state: Arc<MockPipeline>) -> String {
    let app = Router::new()
        .route("/webhook/:pipeline_id", post(pipeline_trigger))
        .with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/webhook/{{pipeline_id}}")
}

pub fn vault_config(base_url: String) -> VaultConfig {
    VaultConfig {
        base_url,
        namespace: "dataplatform".to_string(),
        role_id: "role-id".to_string(),
        secret_id: "secret-id".to_string(),
        timeout_secs: 5,
        max_connections: 8,
        engines: [("dev".to_string(), "kv-dev".to_string())].into(),
    }
}

pub fn pipeline_config(base_url: String) -> PipelineConfig {
    PipelineConfig {
        base_url,
        secret_path: "harness".to_string(),
        api_key_field: "x-api-key".to_string(),
        timeout_secs: 5,
    }
}
