//! Protocol error types.

use thiserror::Error;

/// Result type for protocol decoding.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// A response body that cannot be used.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The body is not the expected JSON shape.
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The body parsed but carries values the client cannot accept.
    #[error("invalid payload: {message}")]
    InvalidPayload {
        /// What was wrong.
        message: String,
    },
}

impl ProtocolError {
    /// Creates an invalid payload error.
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            message: message.into(),
        }
    }
}
