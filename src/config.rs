use std::collections::HashMap;

use serde::Deserialize;

/// Top-level service configuration, loaded from a TOML file at startup.
#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    /// Deployment environment; selects the Vault secret engine.
    pub environment: String,

    pub vault: VaultConfig,

    pub pipeline: PipelineConfig,
}

/// Connection settings for the Vault secret-management service.
#[derive(Clone, Debug, Deserialize)]
pub struct VaultConfig {
    /// Vault API base URL including the /v1 prefix.
    pub base_url: String,

    /// Value for the X-Vault-Namespace header.
    #[serde(default)]
    pub namespace: String,

    /// AppRole credentials.
    pub role_id: String,
    pub secret_id: String,

    /// Total request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Upper bound on pooled connections per host.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// KV v2 engine mount per environment.
    #[serde(default)]
    pub engines: HashMap<String, String>,
}

/// Settings for the pipeline-execution upstream.
#[derive(Clone, Debug, Deserialize)]
pub struct PipelineConfig {
    /// Trigger URL template containing the `{pipeline_id}` placeholder.
    pub base_url: String,

    /// Vault path holding the pipeline API key.
    #[serde(default = "default_secret_path")]
    pub secret_path: String,

    /// Field inside the fetched secret that carries the API key.
    #[serde(default = "default_api_key_field")]
    pub api_key_field: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_connections() -> usize {
    50
}

fn default_secret_path() -> String {
    "harness".to_string()
}

fn default_api_key_field() -> String {
    "x-api-key".to_string()
}

pub async fn load_from_toml(path: &str) -> anyhow::Result<AppConfig> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(_) => tokio::fs::read_to_string("config/dsaas.example.toml").await?,
    };
    let cfg: AppConfig = toml::from_str(&text)?;
    Ok(cfg)
}
