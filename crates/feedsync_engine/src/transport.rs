//! Transport layer abstraction for sync operations.

use crate::error::{NetworkErrorKind, SyncError, SyncResult};
use async_trait::async_trait;
use feedsync_core::Collection;
use feedsync_protocol::{ChangeListItem, EntityPayload};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Duration;

/// Access to the remote change-list API.
///
/// This trait abstracts the network layer, allowing for different
/// implementations (HTTP, mock for testing, etc.).
#[async_trait]
pub trait SyncTransport: Send + Sync {
    /// Fetches the change list of `collection` with versions above `after`.
    async fn fetch_change_list(
        &self,
        collection: Collection,
        after: u64,
    ) -> SyncResult<Vec<ChangeListItem>>;

    /// Fetches the content of `ids`.
    async fn fetch_entities(
        &self,
        collection: Collection,
        ids: &[String],
    ) -> SyncResult<Vec<EntityPayload>>;
}

/// A transport call, as recorded by [`MockTransport`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MockCall {
    /// `fetch_change_list(collection, after)`.
    ChangeList(Collection, u64),
    /// `fetch_entities(collection, ids)`.
    Entities(Collection, Vec<String>),
}

impl MockCall {
    fn target(&self) -> MockTarget {
        match self {
            MockCall::ChangeList(c, _) => MockTarget::ChangeList(*c),
            MockCall::Entities(c, _) => MockTarget::Entities(*c),
        }
    }
}

/// Which endpoint a scripted failure applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockTarget {
    /// Change list requests for a collection.
    ChangeList(Collection),
    /// Content requests for a collection.
    Entities(Collection),
}

/// A failure a [`MockTransport`] can be scripted to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// Request timed out.
    Timeout,
    /// Connection failed.
    Connection,
    /// Server answered with this status.
    Status(u16),
    /// Body did not parse.
    MalformedPayload,
}

impl MockFailure {
    fn into_error(self) -> SyncError {
        match self {
            MockFailure::Timeout => SyncError::network(NetworkErrorKind::Timeout, "mock timeout"),
            MockFailure::Connection => {
                SyncError::network(NetworkErrorKind::Connection, "mock connection failure")
            }
            MockFailure::Status(code) => SyncError::status(code, "mock status"),
            MockFailure::MalformedPayload => SyncError::MalformedPayload("mock payload".into()),
        }
    }
}

#[derive(Default)]
struct MockServer {
    change_lists: HashMap<Collection, Vec<ChangeListItem>>,
    entities: HashMap<Collection, BTreeMap<String, EntityPayload>>,
    scripted_lists: HashMap<Collection, VecDeque<Vec<ChangeListItem>>>,
    failures: HashMap<MockTarget, VecDeque<MockFailure>>,
    calls: Vec<MockCall>,
}

/// An in-memory remote for tests.
///
/// Holds a change log and entity content per collection, answers like the
/// real API, and can be scripted to fail, to return a fixed change list, or
/// to take time.
#[derive(Default)]
pub struct MockTransport {
    server: Mutex<MockServer>,
    latency: Option<Duration>,
}

impl MockTransport {
    /// Creates an empty mock remote.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call wait `latency` before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Publishes content at `version`: stores it and appends an upsert to
    /// its collection's change log.
    pub fn publish(&self, payload: EntityPayload, version: u64) {
        let collection = payload.collection();
        let mut server = self.server.lock();
        server
            .change_lists
            .entry(collection)
            .or_default()
            .push(ChangeListItem::upsert(payload.id(), version));
        server
            .entities
            .entry(collection)
            .or_default()
            .insert(payload.id().to_string(), payload);
    }

    /// Removes content at `version` and appends a delete to the change log.
    pub fn publish_delete(&self, collection: Collection, id: &str, version: u64) {
        let mut server = self.server.lock();
        server
            .change_lists
            .entry(collection)
            .or_default()
            .push(ChangeListItem::delete(id, version));
        if let Some(entities) = server.entities.get_mut(&collection) {
            entities.remove(id);
        }
    }

    /// Makes the next change list request for `collection` return `items`
    /// verbatim, whatever cursor it asks for.
    pub fn script_change_list(&self, collection: Collection, items: Vec<ChangeListItem>) {
        self.server
            .lock()
            .scripted_lists
            .entry(collection)
            .or_default()
            .push_back(items);
    }

    /// Makes the next request to `target` fail. Failures queue up.
    pub fn fail_next(&self, target: MockTarget, failure: MockFailure) {
        self.server
            .lock()
            .failures
            .entry(target)
            .or_default()
            .push_back(failure);
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.server.lock().calls.clone()
    }

    /// Number of calls made to `target`.
    pub fn call_count(&self, target: MockTarget) -> usize {
        self.server
            .lock()
            .calls
            .iter()
            .filter(|call| call.target() == target)
            .count()
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn record(&self, call: MockCall) -> SyncResult<()> {
        let mut server = self.server.lock();
        let target = call.target();
        server.calls.push(call);
        match server.failures.get_mut(&target).and_then(VecDeque::pop_front) {
            Some(failure) => Err(failure.into_error()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SyncTransport for MockTransport {
    async fn fetch_change_list(
        &self,
        collection: Collection,
        after: u64,
    ) -> SyncResult<Vec<ChangeListItem>> {
        self.delay().await;
        self.record(MockCall::ChangeList(collection, after))?;

        let mut server = self.server.lock();
        if let Some(items) = server
            .scripted_lists
            .get_mut(&collection)
            .and_then(VecDeque::pop_front)
        {
            return Ok(items);
        }
        Ok(server
            .change_lists
            .get(&collection)
            .map(|log| {
                log.iter()
                    .filter(|item| item.change_list_version > after)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn fetch_entities(
        &self,
        collection: Collection,
        ids: &[String],
    ) -> SyncResult<Vec<EntityPayload>> {
        self.delay().await;
        self.record(MockCall::Entities(collection, ids.to_vec()))?;

        let server = self.server.lock();
        let Some(entities) = server.entities.get(&collection) else {
            return Ok(Vec::new());
        };
        Ok(ids.iter().filter_map(|id| entities.get(id).cloned()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedsync_protocol::NetworkTopic;

    fn topic(id: &str) -> EntityPayload {
        EntityPayload::Topic(NetworkTopic {
            id: id.into(),
            name: format!("Topic {id}"),
            ..NetworkTopic::default()
        })
    }

    #[tokio::test]
    async fn serves_change_list_after_cursor() {
        let transport = MockTransport::new();
        transport.publish(topic("1"), 1);
        transport.publish(topic("2"), 2);
        transport.publish_delete(Collection::Topic, "1", 3);

        let items = transport.fetch_change_list(Collection::Topic, 1).await.unwrap();
        assert_eq!(
            items,
            vec![ChangeListItem::upsert("2", 2), ChangeListItem::delete("1", 3)]
        );

        let entities = transport
            .fetch_entities(Collection::Topic, &["1".into(), "2".into()])
            .await
            .unwrap();
        assert_eq!(entities, vec![topic("2")]);
    }

    #[tokio::test]
    async fn scripted_failure_is_consumed_once() {
        let transport = MockTransport::new();
        transport.fail_next(MockTarget::ChangeList(Collection::Topic), MockFailure::Status(503));

        let err = transport
            .fetch_change_list(Collection::Topic, 0)
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert!(transport.fetch_change_list(Collection::Topic, 0).await.is_ok());
        assert_eq!(transport.call_count(MockTarget::ChangeList(Collection::Topic)), 2);
    }

    #[tokio::test]
    async fn scripted_change_list_overrides_log() {
        let transport = MockTransport::new();
        transport.publish(topic("1"), 1);
        transport.script_change_list(Collection::Topic, vec![ChangeListItem::upsert("9", 9)]);

        let items = transport.fetch_change_list(Collection::Topic, 100).await.unwrap();
        assert_eq!(items, vec![ChangeListItem::upsert("9", 9)]);
        let items = transport.fetch_change_list(Collection::Topic, 0).await.unwrap();
        assert_eq!(items, vec![ChangeListItem::upsert("1", 1)]);
    }
}
