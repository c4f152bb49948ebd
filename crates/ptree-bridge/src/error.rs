//! Errors raised while talking to an AI or import backend.
//!
//! Every variant is recoverable: callers render it as a message and keep
//! the session alive.

use ptree_core::ErrorCode;

/// Longest response body kept in a [`BridgeError::Status`].
const MAX_BODY_CHARS: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("backend unreachable at {url}: {reason}")]
    Unreachable { url: String, reason: String },

    #[error("backend at {url} returned HTTP {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("backend at {url} timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    #[error("malformed response from {url}: {reason}")]
    Malformed { url: String, reason: String },

    #[error("{0}")]
    Disabled(String),
}

impl BridgeError {
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Unreachable { .. } => ErrorCode::BackendUnavailable,
            Self::Timeout { .. } => ErrorCode::BackendTimeout,
            Self::Status { .. } | Self::Malformed { .. } => ErrorCode::BackendBadResponse,
            Self::Disabled(_) => ErrorCode::BackendDisabled,
        }
    }

    pub(crate) fn status(url: &str, status: u16, body: &str) -> Self {
        let body = body.trim();
        let body = match body.char_indices().nth(MAX_BODY_CHARS) {
            Some((cut, _)) => format!("{}...", &body[..cut]),
            None => body.to_string(),
        };
        Self::Status {
            url: url.to_string(),
            status,
            body,
        }
    }

    pub(crate) fn malformed(url: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}
