use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use reqwest::{header, Client};
use serde_json::Value;
use thiserror::Error;

use crate::config::PipelineConfig;
use crate::vault::{VaultClient, VaultError};

/// Placeholder in the trigger URL template substituted with the pipeline id.
const PIPELINE_ID_PLACEHOLDER: &str = "{pipeline_id}";

/// Message returned to callers when the upstream failure has no usable detail.
const GENERIC_UPSTREAM_MESSAGE: &str = "An unexpected error occurred. Please try again later.";

const UNKNOWN_UPSTREAM_MESSAGE: &str = "Unknown error occurred while calling the pipeline API.";

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Pipeline API returned a non-200 status, or the transport itself failed
    #[error("upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },

    /// Fetching the pipeline API key from Vault failed
    #[error(transparent)]
    Secret(#[from] VaultError),
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let (code, message) = match &self {
            PipelineError::Upstream { status, message } => (
                StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                message.clone(),
            ),
            // Secret lookup details stay in the logs, callers get a generic 500.
            PipelineError::Secret(e) => {
                tracing::error!(error = %e, "secret lookup failed during pipeline trigger");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    GENERIC_UPSTREAM_MESSAGE.to_string(),
                )
            }
        };
        let body = serde_json::json!({
            "status": "0",
            "message": message,
        });
        (code, Json(body)).into_response()
    }
}

/// Triggers runs on the external pipeline-execution service.
///
/// Each successful call starts a real pipeline run, so nothing here retries:
/// a failed trigger is reported once and deduplication is the caller's
/// problem.
pub struct PipelineClient {
    client: Client,
    vault: Arc<VaultClient>,
    cfg: PipelineConfig,
}

impl PipelineClient {
    pub fn new(cfg: PipelineConfig, vault: Arc<VaultClient>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self { client, vault, cfg })
    }

    fn trigger_url(&self, pipeline_id: &str) -> String {
        self.cfg.base_url.replace(PIPELINE_ID_PLACEHOLDER, pipeline_id)
    }

    /// Triggers one pipeline run and returns the upstream JSON response.
    ///
    /// The API key is read from Vault on every call. Non-200 responses are
    /// mapped to [`PipelineError::Upstream`] with the best message the error
    /// body offers; transport failures surface the same way with a generic
    /// message.
    pub async fn trigger(
        &self,
        pipeline_id: &str,
        environment: &str,
        payload: &Value,
    ) -> Result<Value, PipelineError> {
        let url = self.trigger_url(pipeline_id);
        tracing::info!(pipeline_id, environment, "triggering pipeline");

        let secret = self
            .vault
            .read_secret(&self.cfg.secret_path, environment)
            .await?;
        let api_key = secret
            .get(&self.cfg.api_key_field)
            .and_then(Value::as_str)
            .ok_or_else(|| VaultError::Fetch {
                status: 200,
                body: format!(
                    "secret at '{}' is missing the '{}' field",
                    self.cfg.secret_path, self.cfg.api_key_field
                ),
            })?
            .to_string();

        let resp = match self
            .client
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-api-key", api_key)
            .json(payload)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                tracing::error!(error = %e, "transport failure while calling pipeline api");
                return Err(PipelineError::Upstream {
                    status: 500,
                    message: GENERIC_UPSTREAM_MESSAGE.to_string(),
                });
            }
        };

        let status = resp.status();
        let text = match resp.text().await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "failed to read pipeline api response");
                return Err(PipelineError::Upstream {
                    status: 500,
                    message: GENERIC_UPSTREAM_MESSAGE.to_string(),
                });
            }
        };

        if status == StatusCode::OK {
            tracing::info!(pipeline_id, "successfully called pipeline api");
            return serde_json::from_str(&text).map_err(|e| {
                tracing::error!(error = %e, "pipeline api returned malformed json");
                PipelineError::Upstream {
                    status: 500,
                    message: GENERIC_UPSTREAM_MESSAGE.to_string(),
                }
            });
        }

        tracing::error!(
            status = status.as_u16(),
            response = %text,
            "failed to call pipeline api"
        );
        Err(PipelineError::Upstream {
            status: status.as_u16(),
            message: extract_error_message(&text),
        })
    }
}

/// Pulls a usable message out of an upstream error body: the `message` field,
/// then the `error` field, then the raw text.
fn extract_error_message(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        for field in ["message", "error"] {
            if let Some(msg) = json.get(field).and_then(Value::as_str) {
                if !msg.is_empty() {
                    return msg.to_string();
                }
            }
        }
    }
    if body.is_empty() {
        UNKNOWN_UPSTREAM_MESSAGE.to_string()
    } else {
        body.to_string()
    }
}
