//! HTTP surface of the backend.
//!
//! Caller authentication (JWT verification) is enforced by the fronting
//! gateway before requests reach this service.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use crate::metrics;
use crate::state::AppState;

/// Response envelope shared by every endpoint: `status` is `"1"` on success
/// and `"0"` on failure.
#[derive(Debug, Serialize)]
pub struct Envelope {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Envelope {
    pub fn ok(message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            status: "1".to_string(),
            message: message.into(),
            data,
        }
    }
}

pub async fn root() -> Response {
    (
        StatusCode::OK,
        Json(Envelope::ok("DSaaS Backend API", Some(Value::Object(Default::default())))),
    )
        .into_response()
}

pub async fn health() -> Response {
    (
        StatusCode::OK,
        Json(Envelope::ok("DSaaS Backend is healthy", None)),
    )
        .into_response()
}

/// Forwards the caller-supplied payload to the pipeline-execution service.
///
/// A successful trigger starts a real pipeline run upstream, so this handler
/// must not be retried blindly by clients.
pub async fn trigger_pipeline(
    State(app): State<AppState>,
    Path(pipeline_id): Path<String>,
    Json(payload): Json<Value>,
) -> Response {
    let timer = metrics::TRIGGER_DURATION.start_timer();
    let result = app
        .pipeline()
        .trigger(&pipeline_id, app.environment(), &payload)
        .await;
    timer.observe_duration();

    match result {
        Ok(data) => {
            metrics::PIPELINE_TRIGGERS_TOTAL
                .with_label_values(&["success"])
                .inc();
            metrics::REQUESTS_TOTAL
                .with_label_values(&["trigger", "ok"])
                .inc();
            (
                StatusCode::CREATED,
                Json(Envelope::ok("Pipeline triggered successfully", Some(data))),
            )
                .into_response()
        }
        Err(err) => {
            metrics::PIPELINE_TRIGGERS_TOTAL
                .with_label_values(&["error"])
                .inc();
            metrics::REQUESTS_TOTAL
                .with_label_values(&["trigger", "error"])
                .inc();
            err.into_response()
        }
    }
}
