/// Errors related to Vault operations
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// Login failed, or a retried secret read was still rejected
    #[error("vault authentication failed: {status} - {body}")]
    Authentication { status: u16, body: String },

    /// No secret engine configured for the requested environment
    #[error("no secret engine configured for environment '{0}'")]
    Config(String),

    /// Secret endpoint returned a failure status other than 403
    #[error("failed to read secret: {status} - {body}")]
    Fetch { status: u16, body: String },

    /// Transport-level failure
    #[error("vault request failed: {0}")]
    Network(String),
}

impl From<reqwest::Error> for VaultError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Network("request timed out".to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, VaultError>;
