//! Error types for the execution API boundary.
//!
//! [`ClientError`] covers the failures an [`ExecutionClient`](super::ExecutionClient)
//! can report. [`ClientError::is_transient`] decides which of them the retry
//! layer is allowed to try again.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The remote no longer knows this execution id (HTTP 404).
    #[error("execution not found: {0}")]
    NotFound(String),

    /// The remote refused the action for the execution's current state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Transport-level failure (DNS, connection refused, 5xx, rate limit).
    #[error("network error: {0}")]
    Network(String),

    /// The call did not complete within the per-request timeout.
    #[error("request timed out after {0}ms")]
    Timeout(u64),

    /// Any other non-success HTTP status.
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ClientError {
    /// Only transport hiccups are worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, ClientError::Network(_) | ClientError::Timeout(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(ClientError::Network("reset".into()).is_transient());
        assert!(ClientError::Timeout(500).is_transient());
        assert!(!ClientError::NotFound("x".into()).is_transient());
        assert!(!ClientError::InvalidState("already running".into()).is_transient());
        assert!(!ClientError::Decode("eof".into()).is_transient());
        assert!(
            !ClientError::Api {
                status: 401,
                message: "unauthorized".into()
            }
            .is_transient()
        );
    }

    #[test]
    fn api_error_display() {
        let err = ClientError::Api {
            status: 401,
            message: "Invalid token".into(),
        };
        assert_eq!(err.to_string(), "API error (status 401): Invalid token");
    }

    #[test]
    fn timeout_display() {
        assert_eq!(
            ClientError::Timeout(2500).to_string(),
            "request timed out after 2500ms"
        );
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ClientError>();
    }
}
