//! Error types for GetRC client operations.
//!
//! One [`Error`] enum covers every failure class the SDK surfaces:
//! pre-network validation, HTTP-level failures, network unreachability,
//! session storage, and the download workflow's permission and
//! verification failures. Only the bounded 403 refresh described in
//! [`crate::client::pipeline`] is ever retried; every other error is
//! single-attempt and surfaced to the caller.

use std::path::PathBuf;

/// Errors that can occur during client, session, or download operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required field was missing or malformed before any network call.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The backend answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code returned by the backend.
        status: u16,
        /// Message extracted from the response body, or the raw body.
        message: String,
    },

    /// The transport could not reach the backend at all.
    #[error("network unreachable: {0}")]
    Network(String),

    /// Credential handling failed (missing refresh token, failed refresh).
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Write permission for the destination location was denied.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The file did not exist (or was empty) after a write completed.
    #[error("post-write verification failed for {}", path.display())]
    WriteVerification {
        /// Destination path that failed verification.
        path: PathBuf,
    },

    /// Underlying session or file storage failed.
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// A payload could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A base64 artifact could not be decoded for writing.
    #[error("decode error: {0}")]
    Decode(#[from] base64::DecodeError),

    /// An internal invariant was violated.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an authentication error.
    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a network-unreachable error.
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// True for the "check your connection" class of failures.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

/// Result type alias using the crate [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_display_includes_status_and_message() {
        let err = Error::Http {
            status: 403,
            message: "Forbidden".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 403: Forbidden");
    }

    #[test]
    fn network_error_classification() {
        let err = Error::network("connection refused");
        assert!(err.is_network());
        assert!(!Error::validation("missing field").is_network());
    }
}
