//! In-memory storage backend.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::sync::Arc;

/// An in-memory byte log.
///
/// Cloning an `InMemoryBackend` yields a second handle onto the *same* bytes,
/// which lets tests drop a store and "reopen" it from what was written, the
/// same way a process restart would re-read a file.
///
/// A write limit can be set to simulate a crash in the middle of an append:
/// the bytes up to the limit land in the log and the append fails.
///
/// # Example
///
/// ```rust
/// use feedsync_storage::{InMemoryBackend, StorageBackend};
///
/// let mut backend = InMemoryBackend::new();
/// let reopened = backend.clone();
/// backend.append(b"abc").unwrap();
/// assert_eq!(reopened.size().unwrap(), 3);
/// ```
#[derive(Debug, Default, Clone)]
pub struct InMemoryBackend {
    data: Arc<RwLock<Vec<u8>>>,
    write_limit: Arc<RwLock<Option<u64>>>,
}

impl InMemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend holding `data`, e.g. a hand-built damaged journal.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data: Arc::new(RwLock::new(data)),
            write_limit: Arc::new(RwLock::new(None)),
        }
    }

    /// Returns a copy of the stored bytes.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.data.read().clone()
    }

    /// Caps the total log size. An append that would cross the cap writes
    /// the bytes that fit and then fails with
    /// [`StorageError::InjectedFailure`]. `None` removes the cap.
    pub fn set_write_limit(&self, limit: Option<u64>) {
        *self.write_limit.write() = limit;
    }
}

impl StorageBackend for InMemoryBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let data = self.data.read();
        let size = data.len() as u64;
        let start = offset as usize;
        let end = start.saturating_add(len);

        if offset > size || end > data.len() {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }

        Ok(data[start..end].to_vec())
    }

    fn append(&mut self, bytes: &[u8]) -> StorageResult<u64> {
        let mut data = self.data.write();
        let offset = data.len() as u64;

        if let Some(limit) = *self.write_limit.read() {
            let room = limit.saturating_sub(offset) as usize;
            if bytes.len() > room {
                data.extend_from_slice(&bytes[..room]);
                return Err(StorageError::InjectedFailure {
                    written: room as u64,
                });
            }
        }

        data.extend_from_slice(bytes);
        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn sync(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.data.read().len() as u64)
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        let mut data = self.data.write();
        let size = data.len() as u64;
        if new_size > size {
            return Err(StorageError::TruncatePastEnd {
                requested: new_size,
                size,
            });
        }
        data.truncate(new_size as usize);
        Ok(())
    }

    fn replace_contents(&mut self, bytes: &[u8]) -> StorageResult<()> {
        if let Some(limit) = *self.write_limit.read() {
            if bytes.len() as u64 > limit {
                return Err(StorageError::InjectedFailure { written: 0 });
            }
        }
        *self.data.write() = bytes.to_vec();
        Ok(())
    }
}
