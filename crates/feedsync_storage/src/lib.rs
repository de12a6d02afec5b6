//! # feedsync storage
//!
//! Byte-level backends for the feedsync journals.
//!
//! A backend is an **opaque, append-only byte log**. It knows nothing about
//! journal frames, CBOR, topics or cursors; `feedsync_core` owns all of that.
//! The only non-append operations are `truncate` (used to drop a torn tail
//! found during recovery) and `replace_contents` (used by compaction, and
//! atomic with respect to crashes on the file backend).
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - ephemeral storage, shareable between handles and
//!   able to simulate torn writes
//! - [`FileBackend`] - persistent storage using OS file APIs
//!
//! ## Example
//!
//! ```rust
//! use feedsync_storage::{InMemoryBackend, StorageBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let offset = backend.append(b"frame").unwrap();
//! assert_eq!(backend.read_at(offset, 5).unwrap(), b"frame");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
