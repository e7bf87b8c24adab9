use std::sync::Arc;

use crate::config::AppConfig;
use crate::pipeline::PipelineClient;
use crate::vault::VaultClient;

/// Shared application state: one Vault client and one pipeline client per
/// process, handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    config: Arc<AppConfig>,
    vault: Arc<VaultClient>,
    pipeline: Arc<PipelineClient>,
}

impl AppState {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let vault = Arc::new(VaultClient::new(config.vault.clone()));
        let pipeline = Arc::new(PipelineClient::new(
            config.pipeline.clone(),
            Arc::clone(&vault),
        )?);
        Ok(Self {
            config: Arc::new(config),
            vault,
            pipeline,
        })
    }

    pub fn environment(&self) -> &str {
        &self.config.environment
    }

    pub fn vault(&self) -> Arc<VaultClient> {
        Arc::clone(&self.vault)
    }

    pub fn pipeline(&self) -> Arc<PipelineClient> {
        Arc::clone(&self.pipeline)
    }

    /// Warms the Vault credential so the first request does not pay the login
    /// round-trip. Failure is logged and not fatal: the client authenticates
    /// lazily on first use.
    pub async fn initialize(&self) {
        match self.vault.authenticate().await {
            Ok(_) => tracing::info!("vault client initialized and authenticated"),
            Err(e) => tracing::warn!(error = %e, "vault warm-up failed, will authenticate lazily"),
        }
    }

    /// Releases the Vault session. Idempotent.
    pub async fn shutdown(&self) {
        self.vault.close().await;
        tracing::info!("vault client closed");
    }
}
