//! Error types for authenticated execution

use bytes::Bytes;
use reqwest::StatusCode;
use transport::TransportError;

/// Why a request did not produce a successful response.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Failure {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("{message} (status {status})")]
    Status {
        status: StatusCode,
        /// Server-provided `message`, or a generic fallback.
        message: String,
        body: Bytes,
    },
}

impl Failure {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Failure::Transport(_) => None,
            Failure::Status { status, .. } => Some(*status),
        }
    }

    /// Human-readable message suitable for display.
    pub fn message(&self) -> String {
        match self {
            Failure::Transport(e) => e.to_string(),
            Failure::Status { message, .. } => message.clone(),
        }
    }
}

/// Errors returned by `AuthClient`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The session ended while this request was waiting on a refresh.
    #[error("session terminated: {0}")]
    SessionTerminated(String),

    #[error("request failed: {0}")]
    RequestFailed(#[from] Failure),

    #[error("client configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::RequestFailed(failure) => failure.status(),
            _ => None,
        }
    }
}

/// Result alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_failure_display_includes_message_and_code() {
        let failure = Failure::Status {
            status: StatusCode::NOT_FOUND,
            message: "Board not found".into(),
            body: Bytes::new(),
        };
        assert_eq!(failure.to_string(), "Board not found (status 404 Not Found)");
        assert_eq!(failure.message(), "Board not found");
        assert_eq!(failure.status(), Some(StatusCode::NOT_FOUND));
    }

    #[test]
    fn transport_failure_is_transparent() {
        let failure: Failure = TransportError::Connect("connection refused".into()).into();
        assert_eq!(failure.to_string(), "connection failed: connection refused");
        assert!(failure.status().is_none());
    }

    #[test]
    fn error_status_only_for_request_failures() {
        let err = Error::SessionTerminated("refresh token rejected".into());
        assert!(err.status().is_none());
        assert!(err.to_string().contains("refresh token rejected"));

        let err: Error = Failure::Status {
            status: StatusCode::GONE,
            message: "expired".into(),
            body: Bytes::new(),
        }
        .into();
        assert_eq!(err.status(), Some(StatusCode::GONE));
    }
}
