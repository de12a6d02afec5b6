//! Error types for the local store.

use crate::types::Collection;
use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by the local store.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] feedsync_storage::StorageError),

    /// I/O error outside the backends (directory handling).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A journal record could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),

    /// The journal holds bytes that are neither a valid frame nor a torn tail.
    #[error("journal corruption at offset {offset}: {message}")]
    JournalCorruption {
        /// Offset of the bad frame.
        offset: u64,
        /// Description of the damage.
        message: String,
    },

    /// A frame's checksum did not match its contents.
    #[error("checksum mismatch at offset {offset}: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Offset of the frame.
        offset: u64,
        /// Checksum stored in the frame.
        expected: u32,
        /// Checksum computed over the frame.
        actual: u32,
    },

    /// A previous write failed and its torn bytes could not be removed.
    /// The store must be reopened so recovery can repair the journal.
    #[error("journal is poisoned by an earlier failed write; reopen the store")]
    JournalPoisoned,

    /// Another process holds the store directory.
    #[error("store locked: another process has exclusive access")]
    StoreLocked,

    /// The store directory is missing or malformed.
    #[error("invalid store format: {message}")]
    InvalidFormat {
        /// Description of the problem.
        message: String,
    },

    /// A batch tried to move a cursor backwards.
    #[error("cursor regression for {collection}: current {current}, requested {requested}")]
    CursorRegression {
        /// Collection whose cursor was targeted.
        collection: Collection,
        /// Cursor value currently committed.
        current: u64,
        /// Value the batch asked for.
        requested: u64,
    },

    /// A batch carried content that does not belong to its collection.
    #[error("invalid batch: {message}")]
    InvalidBatch {
        /// Description of the problem.
        message: String,
    },

    /// A preference mutation would break `bookmarked ⊆ viewed`.
    #[error("preference invariant violated: bookmarked resource {id} is not viewed")]
    PreferenceInvariant {
        /// The offending news resource id.
        id: String,
    },
}

impl CoreError {
    /// Creates a journal corruption error.
    pub fn journal_corruption(offset: u64, message: impl Into<String>) -> Self {
        Self::JournalCorruption {
            offset,
            message: message.into(),
        }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Creates an invalid batch error.
    pub fn invalid_batch(message: impl Into<String>) -> Self {
        Self::InvalidBatch {
            message: message.into(),
        }
    }
}
