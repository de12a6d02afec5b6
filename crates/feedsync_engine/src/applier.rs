//! Applying reconciled batches to the local store.

use crate::error::SyncResult;
use feedsync_core::{CommitSummary, ContentBatch, ContentSnapshot, Database, UserPreferences};
use std::sync::Arc;

/// The local side of a sync run.
///
/// The orchestrator reads cursors and ids from [`SyncApplier::snapshot`] and
/// commits each collection through [`SyncApplier::apply`]. Preferences are
/// only read, to decide which new content deserves a notification.
pub trait SyncApplier: Send + Sync {
    /// Latest committed content snapshot.
    fn snapshot(&self) -> Arc<ContentSnapshot>;

    /// Commits a batch, with its cursor advance, as one atomic unit.
    fn apply(&self, batch: &ContentBatch) -> SyncResult<CommitSummary>;

    /// Current user preferences.
    fn preferences(&self) -> Arc<UserPreferences>;
}

/// A sync applier backed by a feedsync [`Database`].
///
/// ```ignore
/// let db = Arc::new(Database::open_in_memory()?);
/// let orchestrator = SyncOrchestrator::new(config, transport, DatabaseApplier::new(db));
/// ```
pub struct DatabaseApplier {
    database: Arc<Database>,
}

impl DatabaseApplier {
    /// Creates an applier writing to `database`.
    pub fn new(database: Arc<Database>) -> Self {
        Self { database }
    }

    /// The underlying database.
    pub fn database(&self) -> &Arc<Database> {
        &self.database
    }
}

impl SyncApplier for DatabaseApplier {
    fn snapshot(&self) -> Arc<ContentSnapshot> {
        self.database.content().snapshot()
    }

    fn apply(&self, batch: &ContentBatch) -> SyncResult<CommitSummary> {
        Ok(self.database.content().atomic_apply(batch)?)
    }

    fn preferences(&self) -> Arc<UserPreferences> {
        self.database.preferences().get()
    }
}
