use crate::provider::ProviderError;
use thiserror::Error;

/// Failures local to one job. The runner records them and moves on.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("login handshake failed: {0}")]
    LoginHandshake(String),
    #[error("identity provider login failed: {0}")]
    Provider(#[from] ProviderError),
    #[error("{url} answered {status} {reason}")]
    Transport {
        url: String,
        status: u16,
        reason: String,
    },
    #[error("malformed response from {url} (status {status}): {message}")]
    Malformed {
        url: String,
        status: u16,
        message: String,
    },
    #[error(transparent)]
    Network(#[from] anyhow::Error),
}

impl JobError {
    pub fn is_login_failure(&self) -> bool {
        matches!(self, JobError::LoginHandshake(_) | JobError::Provider(_))
    }
}

/// A status page no longer matches the configured pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("pattern `{pattern}` not found in {url}")]
pub struct SchemaDrift {
    pub url: String,
    pub pattern: String,
}
