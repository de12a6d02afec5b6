//! Database handle.

use crate::config::StoreConfig;
use crate::content::ContentStore;
use crate::dir::StoreDir;
use crate::error::CoreResult;
use crate::preferences::PreferenceStore;
use feedsync_storage::{FileBackend, InMemoryBackend, StorageBackend};
use std::path::Path;
use tracing::info;

/// The local store: content and preferences behind one handle.
///
/// There is one `Database` per store directory and process; share it as
/// `Arc<Database>`. Both stores serialize their own writers and never block
/// readers.
///
/// ```rust,ignore
/// use feedsync_core::{Database, StoreConfig};
///
/// let db = std::sync::Arc::new(Database::open(Path::new("feed"), StoreConfig::default())?);
/// let topics = db.content().read_all(Collection::Topic);
/// ```
pub struct Database {
    config: StoreConfig,
    dir: Option<StoreDir>,
    content: ContentStore,
    preferences: PreferenceStore,
}

impl Database {
    /// Opens a store directory, taking its lock and replaying both journals.
    ///
    /// # Errors
    ///
    /// - [`crate::CoreError::StoreLocked`] if another handle owns the directory
    /// - [`crate::CoreError::InvalidFormat`] if the directory is missing and
    ///   `create_if_missing` is false
    /// - journal corruption or I/O errors
    pub fn open(path: &Path, config: StoreConfig) -> CoreResult<Self> {
        let dir = StoreDir::open(path, config.create_if_missing)?;
        let content_backend = FileBackend::open_with_create_dirs(&dir.content_log_path())?;
        let prefs_backend = FileBackend::open_with_create_dirs(&dir.prefs_log_path())?;

        let mut db = Self::open_with_backends(
            config,
            Box::new(content_backend),
            Box::new(prefs_backend),
        )?;
        info!(path = %dir.path().display(), "store opened");
        db.dir = Some(dir);
        Ok(db)
    }

    /// Opens a store over explicit backends.
    pub fn open_with_backends(
        config: StoreConfig,
        content_backend: Box<dyn StorageBackend>,
        prefs_backend: Box<dyn StorageBackend>,
    ) -> CoreResult<Self> {
        let content = ContentStore::open(content_backend, &config)?;
        let preferences = PreferenceStore::open(prefs_backend, &config)?;
        Ok(Self {
            config,
            dir: None,
            content,
            preferences,
        })
    }

    /// Opens a fresh, non-persistent store.
    pub fn open_in_memory() -> CoreResult<Self> {
        Self::open_with_backends(
            StoreConfig::default(),
            Box::new(InMemoryBackend::new()),
            Box::new(InMemoryBackend::new()),
        )
    }

    /// The content store.
    #[must_use]
    pub fn content(&self) -> &ContentStore {
        &self.content
    }

    /// The preference store.
    #[must_use]
    pub fn preferences(&self) -> &PreferenceStore {
        &self.preferences
    }

    /// Store directory, `None` for in-memory stores.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.dir.as_ref().map(StoreDir::path)
    }

    /// Configuration the store was opened with.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Compacts both journals.
    pub fn compact(&self) -> CoreResult<()> {
        self.content.compact()?;
        self.preferences.compact()
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.content.snapshot();
        f.debug_struct("Database")
            .field("path", &self.path())
            .field("sequence", &snapshot.sequence())
            .field("cursors", &snapshot.cursors())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentBatch;
    use crate::error::CoreError;
    use crate::types::{Collection, EntityContent, Topic};
    use tempfile::tempdir;

    #[test]
    fn in_memory_starts_empty() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.content().snapshot().is_empty());
        assert_eq!(db.content().read_cursor(Collection::Topic), 0);
        assert!(db.path().is_none());
    }

    #[test]
    fn reopen_from_disk() {
        let tmp = tempdir().unwrap();
        {
            let db = Database::open(tmp.path(), StoreConfig::default()).unwrap();
            db.content()
                .atomic_apply(
                    &ContentBatch::new(Collection::Topic, 4)
                        .upsert(EntityContent::Topic(Topic::shell("t1"))),
                )
                .unwrap();
            db.preferences()
                .atomic_mutate(|p| {
                    p.followed_topics.insert("t1".into());
                })
                .unwrap();
        }

        let db = Database::open(tmp.path(), StoreConfig::default()).unwrap();
        assert_eq!(db.content().read_cursor(Collection::Topic), 4);
        assert!(db.preferences().get().is_following("t1"));
        assert_eq!(db.path(), Some(tmp.path()));
    }

    #[test]
    fn directory_is_exclusive() {
        let tmp = tempdir().unwrap();
        let _db = Database::open(tmp.path(), StoreConfig::default()).unwrap();
        let second = Database::open(tmp.path(), StoreConfig::default());
        assert!(matches!(second, Err(CoreError::StoreLocked)));
    }

    #[test]
    fn compact_on_disk() {
        let tmp = tempdir().unwrap();
        let db = Database::open(tmp.path(), StoreConfig::default()).unwrap();
        for v in 1..=5 {
            db.content()
                .atomic_apply(
                    &ContentBatch::new(Collection::Topic, v)
                        .upsert(EntityContent::Topic(Topic::shell(v.to_string()))),
                )
                .unwrap();
        }
        db.compact().unwrap();
        drop(db);

        let db = Database::open(tmp.path(), StoreConfig::default()).unwrap();
        assert_eq!(db.content().snapshot().len(Collection::Topic), 5);
    }
}
