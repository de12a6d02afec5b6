//! Store directory layout and locking.
//!
//! ```text
//! <store>/
//! ├─ LOCK          # advisory lock, one process per store
//! ├─ content.log   # content journal (topics, news resources, cursors)
//! └─ prefs.log     # preference journal
//! ```

use crate::error::{CoreError, CoreResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";
const CONTENT_LOG: &str = "content.log";
const PREFS_LOG: &str = "prefs.log";

/// An exclusively locked store directory.
///
/// The lock is held for as long as the value lives.
#[derive(Debug)]
pub struct StoreDir {
    path: PathBuf,
    _lock_file: File,
}

impl StoreDir {
    /// Opens (and optionally creates) a store directory and takes its lock.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidFormat`] if the directory is missing and
    ///   `create_if_missing` is false, or the path is not a directory
    /// - [`CoreError::StoreLocked`] if another handle holds the lock
    pub fn open(path: &Path, create_if_missing: bool) -> CoreResult<Self> {
        if !path.exists() {
            if create_if_missing {
                fs::create_dir_all(path)?;
            } else {
                return Err(CoreError::invalid_format(format!(
                    "store directory does not exist: {}",
                    path.display()
                )));
            }
        }

        if !path.is_dir() {
            return Err(CoreError::invalid_format(format!(
                "path is not a directory: {}",
                path.display()
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(CoreError::StoreLocked);
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Root of the store.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the content journal.
    #[must_use]
    pub fn content_log_path(&self) -> PathBuf {
        self.path.join(CONTENT_LOG)
    }

    /// Path of the preference journal.
    #[must_use]
    pub fn prefs_log_path(&self) -> PathBuf {
        self.path.join(PREFS_LOG)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_missing_directory() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("store");
        let dir = StoreDir::open(&path, true).unwrap();
        assert!(path.is_dir());
        assert!(path.join(LOCK_FILE).exists());
        assert_eq!(dir.content_log_path(), path.join("content.log"));
        assert_eq!(dir.prefs_log_path(), path.join("prefs.log"));
    }

    #[test]
    fn missing_directory_without_create() {
        let tmp = tempdir().unwrap();
        let result = StoreDir::open(&tmp.path().join("absent"), false);
        assert!(matches!(result, Err(CoreError::InvalidFormat { .. })));
    }

    #[test]
    fn second_open_is_locked() {
        let tmp = tempdir().unwrap();
        let _first = StoreDir::open(tmp.path(), true).unwrap();
        let second = StoreDir::open(tmp.path(), true);
        assert!(matches!(second, Err(CoreError::StoreLocked)));
    }

    #[test]
    fn lock_released_on_drop() {
        let tmp = tempdir().unwrap();
        drop(StoreDir::open(tmp.path(), true).unwrap());
        assert!(StoreDir::open(tmp.path(), true).is_ok());
    }

    #[test]
    fn file_path_is_rejected() {
        let tmp = tempdir().unwrap();
        let file = tmp.path().join("plain");
        std::fs::write(&file, b"x").unwrap();
        assert!(matches!(
            StoreDir::open(&file, true),
            Err(CoreError::InvalidFormat { .. })
        ));
    }
}
