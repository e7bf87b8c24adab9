//! Vault Integration Module
//!
//! This module provides AppRole authentication and KV v2 secret reads against
//! a Vault server. One [`VaultClient`] is shared per process: the login token
//! is cached and reused by all concurrent tasks, and re-acquired transparently
//! when Vault rejects it.
//!
//! # Example
//!
//! ```no_run
//! use dsaas_backend::config::VaultConfig;
//! use dsaas_backend::vault::VaultClient;
//!
//! async fn example(cfg: VaultConfig) -> Result<(), Box<dyn std::error::Error>> {
//!     let vault = VaultClient::new(cfg);
//!
//!     let secret = vault.read_secret("harness", "dev").await?;
//!     let api_key = secret.get("x-api-key");
//!
//!     vault.close().await;
//!     Ok(())
//! }
//! ```

mod client;
mod error;

pub use client::VaultClient;
pub use error::{Result, VaultError};
