//! Content store: topics, news resources, their cross references and the
//! per-collection version cursors.
//!
//! All mutation goes through [`ContentStore::atomic_apply`], which commits a
//! [`ContentBatch`] as one unit:
//!
//! 1. the batch is applied to a private copy of the current snapshot
//! 2. the batch is appended to the journal as one frame and made durable
//! 3. the copy replaces the published snapshot
//! 4. a [`ContentChange`] is emitted to subscribers
//!
//! A failure in steps 1 or 2 leaves both the published snapshot and the journal
//! as they were. Readers holding an older snapshot keep it until they drop it.

use crate::change_feed::{ChangeFeed, Sequenced, Subscription};
use crate::config::StoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::journal::Journal;
use crate::types::{Collection, EntityContent, NewsResource, Topic, VersionCursor};
use feedsync_storage::StorageBackend;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Changes to one collection that commit together with its cursor advance.
///
/// Deletes are applied before upserts. Deleting an id that is not present is
/// a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBatch {
    /// Collection the batch targets.
    pub collection: Collection,
    /// Entities to insert or overwrite.
    pub upserts: Vec<EntityContent>,
    /// Ids to delete.
    pub deletes: Vec<String>,
    /// Cursor value committed with the batch.
    pub new_cursor: u64,
}

impl ContentBatch {
    /// Creates an empty batch advancing `collection` to `new_cursor`.
    #[must_use]
    pub fn new(collection: Collection, new_cursor: u64) -> Self {
        Self {
            collection,
            upserts: Vec::new(),
            deletes: Vec::new(),
            new_cursor,
        }
    }

    /// Adds an upsert.
    #[must_use]
    pub fn upsert(mut self, content: EntityContent) -> Self {
        self.upserts.push(content);
        self
    }

    /// Adds a delete.
    #[must_use]
    pub fn delete(mut self, id: impl Into<String>) -> Self {
        self.deletes.push(id.into());
        self
    }

    /// Returns true if the batch carries no entity changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.deletes.is_empty()
    }

    fn validate(&self, current_cursor: u64) -> CoreResult<()> {
        if self.new_cursor < current_cursor {
            return Err(CoreError::CursorRegression {
                collection: self.collection,
                current: current_cursor,
                requested: self.new_cursor,
            });
        }
        for content in &self.upserts {
            if content.collection() != self.collection {
                return Err(CoreError::invalid_batch(format!(
                    "{} entity {} in a {} batch",
                    content.collection(),
                    content.id(),
                    self.collection
                )));
            }
            if content.id().is_empty() {
                return Err(CoreError::invalid_batch("entity with an empty id"));
            }
        }
        Ok(())
    }
}

/// What a committed unit changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitSummary {
    /// Commit sequence of the unit. Unchanged when nothing was committed.
    pub sequence: u64,
    /// Collection the unit targeted.
    pub collection: Option<Collection>,
    /// Ids inserted.
    pub created: Vec<String>,
    /// Ids overwritten.
    pub updated: Vec<String>,
    /// Ids removed.
    pub deleted: Vec<String>,
    /// Placeholder topics inserted for unknown topic references.
    pub topic_shells: Vec<String>,
    /// Cursor after the unit.
    pub cursor: u64,
}

impl CommitSummary {
    /// Number of entities created, updated or deleted.
    #[must_use]
    pub fn changed(&self) -> usize {
        self.created.len() + self.updated.len() + self.deleted.len()
    }
}

/// Notification emitted after a unit commits.
#[derive(Debug, Clone)]
pub struct ContentChange {
    /// What the unit changed.
    pub summary: CommitSummary,
    /// The store as of this unit.
    pub snapshot: Arc<ContentSnapshot>,
}

impl Sequenced for ContentChange {
    fn sequence(&self) -> u64 {
        self.summary.sequence
    }
}

/// Cross references between news resources and topics, indexed both ways.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct RelationshipTable {
    by_resource: BTreeMap<String, BTreeSet<String>>,
    by_topic: BTreeMap<String, BTreeSet<String>>,
}

impl RelationshipTable {
    fn replace_for_resource(&mut self, resource_id: &str, topic_ids: &BTreeSet<String>) {
        self.remove_resource(resource_id);
        if topic_ids.is_empty() {
            return;
        }
        for topic_id in topic_ids {
            self.by_topic
                .entry(topic_id.clone())
                .or_default()
                .insert(resource_id.to_string());
        }
        self.by_resource
            .insert(resource_id.to_string(), topic_ids.clone());
    }

    fn remove_resource(&mut self, resource_id: &str) -> usize {
        let Some(topics) = self.by_resource.remove(resource_id) else {
            return 0;
        };
        for topic_id in &topics {
            if let Some(resources) = self.by_topic.get_mut(topic_id) {
                resources.remove(resource_id);
                if resources.is_empty() {
                    self.by_topic.remove(topic_id);
                }
            }
        }
        topics.len()
    }

    fn remove_topic(&mut self, topic_id: &str) -> usize {
        let Some(resources) = self.by_topic.remove(topic_id) else {
            return 0;
        };
        for resource_id in &resources {
            if let Some(topics) = self.by_resource.get_mut(resource_id) {
                topics.remove(topic_id);
                if topics.is_empty() {
                    self.by_resource.remove(resource_id);
                }
            }
        }
        resources.len()
    }

    fn len(&self) -> usize {
        self.by_resource.values().map(BTreeSet::len).sum()
    }
}

/// An immutable, fully committed view of the content store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSnapshot {
    topics: BTreeMap<String, Topic>,
    resources: BTreeMap<String, NewsResource>,
    relations: RelationshipTable,
    topic_cursor: u64,
    resource_cursor: u64,
    sequence: u64,
}

impl ContentSnapshot {
    /// Commit sequence of the last unit in this snapshot.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Committed cursor of `collection`.
    #[must_use]
    pub fn cursor(&self, collection: Collection) -> u64 {
        match collection {
            Collection::Topic => self.topic_cursor,
            Collection::NewsResource => self.resource_cursor,
        }
    }

    /// Both cursors.
    #[must_use]
    pub fn cursors(&self) -> [VersionCursor; 2] {
        Collection::ALL.map(|collection| VersionCursor {
            collection,
            value: self.cursor(collection),
        })
    }

    /// Looks up a topic.
    #[must_use]
    pub fn topic(&self, id: &str) -> Option<&Topic> {
        self.topics.get(id)
    }

    /// Looks up a news resource.
    #[must_use]
    pub fn news_resource(&self, id: &str) -> Option<&NewsResource> {
        self.resources.get(id)
    }

    /// All topics ordered by id.
    pub fn topics(&self) -> impl Iterator<Item = &Topic> {
        self.topics.values()
    }

    /// All news resources ordered by id.
    pub fn news_resources(&self) -> impl Iterator<Item = &NewsResource> {
        self.resources.values()
    }

    /// Returns true if `id` exists in `collection`.
    #[must_use]
    pub fn contains(&self, collection: Collection, id: &str) -> bool {
        match collection {
            Collection::Topic => self.topics.contains_key(id),
            Collection::NewsResource => self.resources.contains_key(id),
        }
    }

    /// Ids present in `collection`.
    #[must_use]
    pub fn ids(&self, collection: Collection) -> BTreeSet<String> {
        match collection {
            Collection::Topic => self.topics.keys().cloned().collect(),
            Collection::NewsResource => self.resources.keys().cloned().collect(),
        }
    }

    /// Number of entities in `collection`.
    #[must_use]
    pub fn len(&self, collection: Collection) -> usize {
        match collection {
            Collection::Topic => self.topics.len(),
            Collection::NewsResource => self.resources.len(),
        }
    }

    /// Returns true if neither collection holds anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.topics.is_empty() && self.resources.is_empty()
    }

    /// Ids of the topics a resource is tagged with.
    #[must_use]
    pub fn topic_ids_for(&self, resource_id: &str) -> BTreeSet<String> {
        self.relations
            .by_resource
            .get(resource_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Topics a resource is tagged with.
    #[must_use]
    pub fn topics_for(&self, resource_id: &str) -> Vec<&Topic> {
        self.relations
            .by_resource
            .get(resource_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.topics.get(id))
            .collect()
    }

    /// Resources tagged with a topic, newest first.
    #[must_use]
    pub fn resources_for_topic(&self, topic_id: &str) -> Vec<&NewsResource> {
        let mut resources: Vec<&NewsResource> = self
            .relations
            .by_topic
            .get(topic_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.resources.get(id))
            .collect();
        resources.sort_by(|a, b| b.publish_date.cmp(&a.publish_date));
        resources
    }

    /// Total number of relationship rows.
    #[must_use]
    pub fn relationship_count(&self) -> usize {
        self.relations.len()
    }

    /// Every entity of `collection` as upsertable content.
    #[must_use]
    pub fn read_all(&self, collection: Collection) -> Vec<EntityContent> {
        match collection {
            Collection::Topic => self.topics.values().cloned().map(EntityContent::Topic).collect(),
            Collection::NewsResource => self
                .resources
                .values()
                .map(|resource| EntityContent::NewsResource {
                    resource: resource.clone(),
                    topic_ids: self.topic_ids_for(&resource.id),
                })
                .collect(),
        }
    }

    /// Applies a batch in place and advances the sequence.
    ///
    /// Validation runs first; on error `self` is untouched.
    pub(crate) fn apply_batch(&mut self, batch: &ContentBatch) -> CoreResult<CommitSummary> {
        batch.validate(self.cursor(batch.collection))?;

        let mut summary = CommitSummary {
            collection: Some(batch.collection),
            ..CommitSummary::default()
        };

        for id in &batch.deletes {
            let removed = match batch.collection {
                Collection::Topic => {
                    let existed = self.topics.remove(id).is_some();
                    self.relations.remove_topic(id);
                    existed
                }
                Collection::NewsResource => {
                    let existed = self.resources.remove(id).is_some();
                    self.relations.remove_resource(id);
                    existed
                }
            };
            if removed {
                summary.deleted.push(id.clone());
            }
        }

        for content in &batch.upserts {
            let existed = self.contains(batch.collection, content.id());
            match content {
                EntityContent::Topic(topic) => {
                    self.topics.insert(topic.id.clone(), topic.clone());
                }
                EntityContent::NewsResource {
                    resource,
                    topic_ids,
                } => {
                    for topic_id in topic_ids {
                        if !self.topics.contains_key(topic_id) {
                            self.topics
                                .insert(topic_id.clone(), Topic::shell(topic_id.clone()));
                            summary.topic_shells.push(topic_id.clone());
                        }
                    }
                    self.resources.insert(resource.id.clone(), resource.clone());
                    self.relations.replace_for_resource(&resource.id, topic_ids);
                }
            }
            let id = content.id().to_string();
            if existed {
                summary.updated.push(id);
            } else {
                summary.created.push(id);
            }
        }

        match batch.collection {
            Collection::Topic => self.topic_cursor = batch.new_cursor,
            Collection::NewsResource => self.resource_cursor = batch.new_cursor,
        }
        self.sequence += 1;

        summary.sequence = self.sequence;
        summary.cursor = batch.new_cursor;
        Ok(summary)
    }
}

/// Journal record, owned form used on replay.
#[derive(Deserialize)]
enum ContentRecord {
    Unit(ContentBatch),
    Snapshot(ContentSnapshot),
}

/// Journal record, borrowed form used on write. Serializes like
/// [`ContentRecord`].
#[derive(Serialize)]
enum ContentRecordRef<'a> {
    Unit(&'a ContentBatch),
    Snapshot(&'a ContentSnapshot),
}

/// The content store.
///
/// One writer at a time; any number of concurrent readers, each holding a
/// fully committed [`ContentSnapshot`].
pub struct ContentStore {
    state: RwLock<Arc<ContentSnapshot>>,
    journal: Mutex<Journal>,
    feed: ChangeFeed<ContentChange>,
    compact_threshold: u64,
}

impl ContentStore {
    /// Opens the store over `backend`, replaying its journal.
    ///
    /// # Errors
    ///
    /// Fails on journal corruption other than a torn tail, or if a replayed
    /// unit is invalid against the state before it.
    pub fn open(backend: Box<dyn StorageBackend>, config: &StoreConfig) -> CoreResult<Self> {
        let mut journal = Journal::new(backend, config.sync_on_commit);
        let records: Vec<ContentRecord> = journal.recover()?;

        let mut snapshot = ContentSnapshot::default();
        for record in records {
            match record {
                ContentRecord::Snapshot(state) => snapshot = state,
                ContentRecord::Unit(batch) => {
                    snapshot.apply_batch(&batch).map_err(|e| {
                        CoreError::journal_corruption(
                            snapshot.sequence,
                            format!("unit does not replay: {e}"),
                        )
                    })?;
                }
            }
        }

        info!(
            sequence = snapshot.sequence,
            topics = snapshot.topics.len(),
            news_resources = snapshot.resources.len(),
            topic_cursor = snapshot.topic_cursor,
            news_cursor = snapshot.resource_cursor,
            "content store opened"
        );

        Ok(Self {
            state: RwLock::new(Arc::new(snapshot)),
            journal: Mutex::new(journal),
            feed: ChangeFeed::with_max_history(config.notification_history),
            compact_threshold: config.compact_threshold_bytes,
        })
    }

    /// Returns the latest committed snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<ContentSnapshot> {
        Arc::clone(&self.state.read())
    }

    /// Every entity of `collection`.
    #[must_use]
    pub fn read_all(&self, collection: Collection) -> Vec<EntityContent> {
        self.snapshot().read_all(collection)
    }

    /// Ids present in `collection`.
    #[must_use]
    pub fn ids(&self, collection: Collection) -> BTreeSet<String> {
        self.snapshot().ids(collection)
    }

    /// Committed cursor of `collection`.
    #[must_use]
    pub fn read_cursor(&self, collection: Collection) -> u64 {
        self.state.read().cursor(collection)
    }

    /// Commits `batch` as one atomic unit.
    ///
    /// A batch with no entity changes that leaves the cursor where it is
    /// commits nothing and emits nothing.
    ///
    /// # Errors
    ///
    /// - [`CoreError::CursorRegression`] if `new_cursor` is below the
    ///   committed cursor
    /// - [`CoreError::InvalidBatch`] for content of the wrong collection
    /// - storage errors from the journal append
    ///
    /// On error nothing is committed.
    pub fn atomic_apply(&self, batch: &ContentBatch) -> CoreResult<CommitSummary> {
        let mut journal = self.journal.lock();
        let current = self.snapshot();

        if batch.is_empty() && batch.new_cursor == current.cursor(batch.collection) {
            debug!(collection = %batch.collection, "empty batch, nothing to commit");
            return Ok(CommitSummary {
                sequence: current.sequence,
                collection: Some(batch.collection),
                cursor: batch.new_cursor,
                ..CommitSummary::default()
            });
        }

        let mut next = (*current).clone();
        let summary = next.apply_batch(batch)?;
        journal.append(&ContentRecordRef::Unit(batch))?;

        let next = Arc::new(next);
        *self.state.write() = Arc::clone(&next);

        info!(
            collection = %batch.collection,
            sequence = summary.sequence,
            created = summary.created.len(),
            updated = summary.updated.len(),
            deleted = summary.deleted.len(),
            cursor = summary.cursor,
            "content unit committed"
        );

        self.feed.emit(ContentChange {
            summary: summary.clone(),
            snapshot: Arc::clone(&next),
        });

        if self.compact_threshold > 0 {
            match journal.size() {
                Ok(size) if size > self.compact_threshold => {
                    if let Err(e) = journal.rewrite(&ContentRecordRef::Snapshot(&next)) {
                        warn!(error = %e, "content journal compaction failed");
                    }
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "could not size content journal"),
            }
        }

        Ok(summary)
    }

    /// Rewrites the journal as a single snapshot frame.
    pub fn compact(&self) -> CoreResult<()> {
        let mut journal = self.journal.lock();
        let before = journal.size()?;
        let snapshot = self.snapshot();
        journal.rewrite(&ContentRecordRef::Snapshot(&snapshot))?;
        info!(before, after = journal.size()?, "content journal compacted");
        Ok(())
    }

    /// Current journal size in bytes.
    pub fn journal_size(&self) -> CoreResult<u64> {
        self.journal.lock().size()
    }

    /// Subscribes to committed units.
    pub fn subscribe(&self) -> Subscription<ContentChange> {
        self.feed.subscribe()
    }

    /// Retained notifications with sequence > `after`.
    pub fn poll(&self, after: u64, limit: usize) -> Vec<ContentChange> {
        self.feed.poll(after, limit)
    }
}
