use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::{Map, Value};
use tokio::sync::{Mutex, RwLock};

use super::{Result, VaultError};
use crate::config::VaultConfig;

/// How many times a secret read re-authenticates after a 403 before giving up.
const TOKEN_RETRIES: usize = 1;

/// Client for Vault AppRole login and KV v2 secret reads.
///
/// One instance is shared per process. The login token is cached and reused
/// across concurrent tasks; the auth lock serializes login calls so N callers
/// racing on an empty cache produce a single network round-trip. Tokens are
/// only invalidated reactively, when Vault rejects them with a 403; no TTL
/// is tracked.
pub struct VaultClient {
    cfg: VaultConfig,
    /// Pooled HTTP session, built lazily and dropped by `close()`.
    session: Mutex<Option<Client>>,
    /// Cached login token.
    token: RwLock<Option<String>>,
    /// Serializes login calls.
    auth_lock: Mutex<()>,
}

impl VaultClient {
    pub fn new(cfg: VaultConfig) -> Self {
        tracing::info!("vault client initialized");
        Self {
            cfg,
            session: Mutex::new(None),
            token: RwLock::new(None),
            auth_lock: Mutex::new(()),
        }
    }

    /// Returns the shared pooled client, creating it on first use.
    async fn session(&self) -> Result<Client> {
        let mut guard = self.session.lock().await;
        if let Some(client) = guard.as_ref() {
            return Ok(client.clone());
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(self.cfg.timeout_secs))
            .pool_max_idle_per_host(self.cfg.max_connections)
            .build()
            .map_err(|e| VaultError::Network(format!("failed to build http client: {e}")))?;
        tracing::info!("created new http session for vault client");
        *guard = Some(client.clone());
        Ok(client)
    }

    /// Returns the cached token, logging in first if none is cached.
    pub async fn ensure_token(&self) -> Result<String> {
        if let Some(token) = self.token.read().await.as_ref() {
            return Ok(token.clone());
        }
        self.authenticate().await
    }

    /// Logs in with AppRole credentials and caches the returned token.
    ///
    /// Callers racing on an empty cache queue on the auth lock; the winner
    /// performs the login and the rest observe the cached token on the
    /// re-check, so only one login request goes out.
    pub async fn authenticate(&self) -> Result<String> {
        let _guard = self.auth_lock.lock().await;

        // Another task may have logged in while we waited for the lock.
        if let Some(token) = self.token.read().await.as_ref() {
            return Ok(token.clone());
        }

        let session = self.session().await?;
        let url = format!("{}/auth/approle/login", self.cfg.base_url);
        let resp = session
            .post(&url)
            .header("X-Vault-Namespace", &self.cfg.namespace)
            .json(&serde_json::json!({
                "role_id": self.cfg.role_id,
                "secret_id": self.cfg.secret_id,
            }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), "vault authentication failed");
            return Err(VaultError::Authentication {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = resp.json().await?;
        let token = body
            .pointer("/auth/client_token")
            .and_then(Value::as_str)
            .ok_or_else(|| VaultError::Authentication {
                status: status.as_u16(),
                body: "login response missing auth.client_token".to_string(),
            })?
            .to_string();

        *self.token.write().await = Some(token.clone());
        tracing::info!("vault authentication successful");
        Ok(token)
    }

    /// Reads a KV v2 secret and returns its nested data object.
    ///
    /// A 403 invalidates the cached token and triggers one re-login before
    /// the read is retried; a second 403 is a fatal authentication failure.
    /// Secret contents are never cached, only the token is.
    pub async fn read_secret(&self, path: &str, environment: &str) -> Result<Map<String, Value>> {
        self.ensure_token().await?;
        let engine = self
            .cfg
            .engines
            .get(environment)
            .filter(|engine| !engine.is_empty())
            .ok_or_else(|| VaultError::Config(environment.to_string()))?;
        let url = format!("{}/{}/data/{}", self.cfg.base_url, engine, path);

        let mut retries = 0;
        loop {
            let token = self.ensure_token().await?;
            let session = self.session().await?;
            let resp = session
                .get(&url)
                .header("X-Vault-Token", &token)
                .header("X-Vault-Namespace", &self.cfg.namespace)
                .send()
                .await?;

            let status = resp.status();
            if status == StatusCode::FORBIDDEN && retries < TOKEN_RETRIES {
                retries += 1;
                self.token.write().await.take();
                tracing::info!("vault token expired, reauthenticating");
                self.authenticate().await?;
                continue;
            }
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                if status == StatusCode::FORBIDDEN {
                    tracing::error!("vault token still rejected after reauthentication");
                    return Err(VaultError::Authentication {
                        status: status.as_u16(),
                        body,
                    });
                }
                tracing::error!(status = status.as_u16(), path, "failed to read secret");
                return Err(VaultError::Fetch {
                    status: status.as_u16(),
                    body,
                });
            }

            let body: Value = resp.json().await?;
            let data = body
                .pointer("/data/data")
                .and_then(Value::as_object)
                .cloned()
                .ok_or_else(|| VaultError::Fetch {
                    status: status.as_u16(),
                    body: "secret response missing data.data".to_string(),
                })?;
            tracing::info!(path, "secret read successfully");
            return Ok(data);
        }
    }

    /// Drops the pooled session and clears the cached token. Idempotent; a
    /// new session is built if the client is used again.
    pub async fn close(&self) {
        self.token.write().await.take();
        if self.session.lock().await.take().is_some() {
            tracing::info!("closed vault http session");
        }
    }
}
