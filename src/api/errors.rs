//! Error types for the platform API client.
//!
//! `ApiError` is `Clone` because a single in-flight request may resolve many
//! waiters with the same failure.

use std::sync::Arc;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    #[error("no authentication token found")]
    MissingToken,
    #[error("session expired, login required")]
    Unauthorized,
    #[error("{message}")]
    Status { status: u16, message: String },
    #[error("request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: Arc<reqwest::Error>,
    },
    #[error("failed to parse response from {url} ({status}): {detail}")]
    ParseFailed {
        status: u16,
        url: String,
        detail: String,
    },
    #[error("in-flight request for `{key}` resolves to a different payload type")]
    KeyTypeMismatch { key: String },
}

impl ApiError {
    pub(crate) fn transport(url: &str, source: reqwest::Error) -> Self {
        ApiError::Transport {
            url: url.to_owned(),
            source: Arc::new(source),
        }
    }

    /// Whether the failure came from the network rather than from the server's answer.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Transport { .. })
    }
}
