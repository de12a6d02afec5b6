//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Attempted to read beyond the end of the log.
    #[error("read beyond end of storage: offset {offset}, len {len}, size {size}")]
    ReadPastEnd {
        /// Requested offset.
        offset: u64,
        /// Requested length.
        len: usize,
        /// Current log size.
        size: u64,
    },

    /// Truncation target lies past the end of the log.
    #[error("cannot truncate to {requested} bytes, log holds {size}")]
    TruncatePastEnd {
        /// Requested size.
        requested: u64,
        /// Current log size.
        size: u64,
    },

    /// A simulated write failure (in-memory backend only).
    #[error("injected write failure after {written} bytes")]
    InjectedFailure {
        /// Bytes that reached the log before the failure.
        written: u64,
    },
}
