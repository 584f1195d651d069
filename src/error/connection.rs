//! Errors surfaced by outward requests to the peer.

use thiserror::Error;

use crate::traits::HttpError;

/// Result alias for outward requests.
pub type ConnectionResult<T> = Result<T, ConnectionError>;

/// Errors returned by the outward HTTP interface.
///
/// `NotReady`, `Disconnected` and `ExpectedSuccess` are transient: they also
/// drive the supervisor into the offline state and a reconnect, but are only
/// surfaced to the caller that issued the failing request.
#[derive(Debug, Clone, Error)]
pub enum ConnectionError {
    /// No endpoint is configured.
    #[error("connection to the peer is not configured")]
    NotConfigured,

    /// The peer answered with a server error (5xx).
    #[error("peer is not ready: status {status} for {method} {path}")]
    NotReady {
        method: &'static str,
        path: String,
        status: u16,
    },

    /// A transport-level failure indicating loss of connectivity.
    #[error("disconnected from peer: {0}")]
    Disconnected(String),

    /// A request issued with "expect success" semantics got a status >= 400.
    #[error("expected success but got status {status} for {method} {path}")]
    ExpectedSuccess {
        method: &'static str,
        path: String,
        status: u16,
    },

    /// Any other transport failure.
    #[error("transport error: {0}")]
    Transport(#[from] HttpError),

    /// The supervisor is gone.
    #[error("connection supervisor has shut down")]
    Shutdown,
}

impl ConnectionError {
    /// Whether the error is expected to clear once the peer is reachable again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ConnectionError::NotReady { .. }
                | ConnectionError::Disconnected(_)
                | ConnectionError::ExpectedSuccess { .. }
        )
    }

    /// Short code for log lines.
    pub fn error_code(&self) -> &'static str {
        match self {
            ConnectionError::NotConfigured => "NOT_CONFIGURED",
            ConnectionError::NotReady { .. } => "NOT_READY",
            ConnectionError::Disconnected(_) => "DISCONNECTED",
            ConnectionError::ExpectedSuccess { .. } => "EXPECTED_SUCCESS",
            ConnectionError::Transport(_) => "TRANSPORT",
            ConnectionError::Shutdown => "SHUTDOWN",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            ConnectionError::NotConfigured.to_string(),
            "connection to the peer is not configured"
        );
        assert_eq!(
            ConnectionError::NotReady {
                method: "GET",
                path: "/rest/items".to_string(),
                status: 503,
            }
            .to_string(),
            "peer is not ready: status 503 for GET /rest/items"
        );
        assert_eq!(
            ConnectionError::Disconnected("connection refused".to_string()).to_string(),
            "disconnected from peer: connection refused"
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ConnectionError::NotConfigured.error_code(), "NOT_CONFIGURED");
        assert_eq!(ConnectionError::Shutdown.error_code(), "SHUTDOWN");
        assert_eq!(
            ConnectionError::Disconnected(String::new()).error_code(),
            "DISCONNECTED"
        );
    }
}
