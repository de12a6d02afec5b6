//! Test fixtures and database helpers.

use feedsync_core::{Database, StoreConfig};
use feedsync_storage::InMemoryBackend;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// A test database with automatic cleanup.
pub struct TestDatabase {
    /// The database instance.
    pub db: Arc<Database>,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: Option<TempDir>,
}

impl TestDatabase {
    /// Creates a new in-memory test database.
    pub fn memory() -> Self {
        Self {
            db: Arc::new(Database::open_in_memory().expect("Failed to open in-memory database")),
            temp_dir: None,
        }
    }

    /// Creates an in-memory test database whose content journal can be made
    /// to fail.
    ///
    /// Returns the content backend handle; call
    /// [`InMemoryBackend::set_write_limit`] on it to inject write failures.
    pub fn faulty() -> (Self, InMemoryBackend) {
        let content = InMemoryBackend::new();
        let db = Database::open_with_backends(
            StoreConfig::default(),
            Box::new(content.clone()),
            Box::new(InMemoryBackend::new()),
        )
        .expect("Failed to open faulty database");
        (
            Self {
                db: Arc::new(db),
                temp_dir: None,
            },
            content,
        )
    }

    /// Creates a new on-disk test database in a temporary directory.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db = Database::open(temp_dir.path(), StoreConfig::default())
            .expect("Failed to open file database");
        Self {
            db: Arc::new(db),
            temp_dir: Some(temp_dir),
        }
    }

    /// Returns the store directory if file-based, None if in-memory.
    pub fn path(&self) -> Option<&Path> {
        self.temp_dir.as_ref().map(TempDir::path)
    }

    /// Closes and reopens an on-disk database, as a process restart would.
    ///
    /// # Panics
    ///
    /// Panics for in-memory databases, or if another handle to the database
    /// is still alive.
    pub fn reopen(self) -> Self {
        let temp_dir = self.temp_dir.expect("only file databases can be reopened");
        let db = Arc::try_unwrap(self.db).unwrap_or_else(|_| panic!("database still shared"));
        drop(db);
        let db = Database::open(temp_dir.path(), StoreConfig::default())
            .expect("Failed to reopen file database");
        Self {
            db: Arc::new(db),
            temp_dir: Some(temp_dir),
        }
    }
}

impl std::ops::Deref for TestDatabase {
    type Target = Database;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}

/// Runs a test with a temporary in-memory database.
pub fn with_temp_db<F, R>(f: F) -> R
where
    F: FnOnce(&Database) -> R,
{
    let test_db = TestDatabase::memory();
    f(&test_db.db)
}

/// Runs a test with a temporary on-disk database.
pub fn with_file_db<F, R>(f: F) -> R
where
    F: FnOnce(&Database, &Path) -> R,
{
    let test_db = TestDatabase::file();
    let path = test_db.path().expect("File database should have a path");
    f(&test_db.db, path)
}
