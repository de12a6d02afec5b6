//! Error types for the sync engine.

use feedsync_core::CoreError;
use feedsync_protocol::ProtocolError;
use std::fmt;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// How a network request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    /// The request timed out.
    Timeout,
    /// The connection could not be established or broke.
    Connection,
    /// The request could not be built, e.g. from a malformed base URL.
    InvalidRequest,
    /// The server answered with a non-success status.
    Status(u16),
}

impl fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkErrorKind::Timeout => f.write_str("timeout"),
            NetworkErrorKind::Connection => f.write_str("connection failure"),
            NetworkErrorKind::InvalidRequest => f.write_str("invalid request"),
            NetworkErrorKind::Status(code) => write!(f, "HTTP {code}"),
        }
    }
}

/// Error taxonomy used for retry decisions and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The server broke the change-list contract. Not retried.
    ProtocolViolation,
    /// Timeout, connection failure, HTTP 5xx or 429. Retried.
    NetworkRetryable,
    /// Other HTTP status, an unbuildable request or an unparseable body.
    /// Not retried.
    NetworkFatal,
    /// The local store failed. Not retried.
    LocalStoreFailure,
    /// The run was cancelled.
    Cancelled,
}

/// Errors that end a sync attempt.
#[derive(Error, Debug)]
pub enum SyncError {
    /// A change-list item is not above the cursor it was requested with.
    #[error("malformed change list: item {id} has version {version}, cursor is {cursor}")]
    MalformedChangeList {
        /// Offending id.
        id: String,
        /// Its version.
        version: u64,
        /// Cursor the change list was requested after.
        cursor: u64,
    },

    /// A request failed.
    #[error("network error ({kind}): {message}")]
    Network {
        /// Failure class.
        kind: NetworkErrorKind,
        /// Details.
        message: String,
    },

    /// A response body could not be parsed or validated.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// Local store error.
    #[error("local store error: {0}")]
    LocalStore(#[from] CoreError),

    /// The run was cancelled.
    #[error("sync cancelled")]
    Cancelled,
}

impl SyncError {
    /// Creates a network error.
    pub fn network(kind: NetworkErrorKind, message: impl Into<String>) -> Self {
        Self::Network {
            kind,
            message: message.into(),
        }
    }

    /// Creates a network error for an HTTP status.
    pub fn status(code: u16, message: impl Into<String>) -> Self {
        Self::network(NetworkErrorKind::Status(code), message)
    }

    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::MalformedChangeList { .. } => ErrorKind::ProtocolViolation,
            SyncError::Network { kind, .. } => match kind {
                NetworkErrorKind::Timeout | NetworkErrorKind::Connection => {
                    ErrorKind::NetworkRetryable
                }
                NetworkErrorKind::Status(429) => ErrorKind::NetworkRetryable,
                NetworkErrorKind::Status(code) if (500..600).contains(code) => {
                    ErrorKind::NetworkRetryable
                }
                NetworkErrorKind::InvalidRequest | NetworkErrorKind::Status(_) => {
                    ErrorKind::NetworkFatal
                }
            },
            SyncError::MalformedPayload(_) => ErrorKind::NetworkFatal,
            SyncError::LocalStore(_) => ErrorKind::LocalStoreFailure,
            SyncError::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::NetworkRetryable
    }
}

impl From<ProtocolError> for SyncError {
    fn from(err: ProtocolError) -> Self {
        SyncError::MalformedPayload(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        let retryable = [
            SyncError::network(NetworkErrorKind::Timeout, "slow"),
            SyncError::network(NetworkErrorKind::Connection, "refused"),
            SyncError::status(500, "boom"),
            SyncError::status(503, "unavailable"),
            SyncError::status(429, "slow down"),
        ];
        for err in &retryable {
            assert!(err.is_retryable(), "{err}");
        }

        assert_eq!(SyncError::status(404, "").kind(), ErrorKind::NetworkFatal);
        assert_eq!(SyncError::status(400, "").kind(), ErrorKind::NetworkFatal);
        assert_eq!(
            SyncError::network(NetworkErrorKind::InvalidRequest, "bad url").kind(),
            ErrorKind::NetworkFatal
        );
        assert_eq!(
            SyncError::MalformedPayload("bad".into()).kind(),
            ErrorKind::NetworkFatal
        );
        assert_eq!(
            SyncError::MalformedChangeList {
                id: "1".into(),
                version: 9,
                cursor: 10
            }
            .kind(),
            ErrorKind::ProtocolViolation
        );
        assert_eq!(
            SyncError::from(CoreError::JournalPoisoned).kind(),
            ErrorKind::LocalStoreFailure
        );
        assert!(!SyncError::Cancelled.is_retryable());
    }

    #[test]
    fn error_display() {
        let err = SyncError::status(503, "unavailable");
        assert_eq!(err.to_string(), "network error (HTTP 503): unavailable");

        let err = SyncError::MalformedChangeList {
            id: "5".into(),
            version: 9,
            cursor: 10,
        };
        assert!(err.to_string().contains("version 9"));
    }
}
