//! Domain types held by the local store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A synchronizable entity collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Collection {
    /// Topics users can follow.
    Topic,
    /// News resources tagged with topics.
    NewsResource,
}

impl Collection {
    /// Every collection, in the order a sync run processes them.
    pub const ALL: [Collection; 2] = [Collection::Topic, Collection::NewsResource];

    /// Path segment used by the remote API for this collection.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Collection::Topic => "topics",
            Collection::NewsResource => "newsresources",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A topic.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Topic {
    /// Unique id within the topic collection.
    pub id: String,
    /// Display name. Empty for a shell.
    pub name: String,
    /// One-line description.
    pub short_description: String,
    /// Long description.
    pub long_description: String,
    /// Link to more information.
    pub url: String,
    /// Icon URL.
    pub image_url: String,
}

impl Topic {
    /// Creates a placeholder topic holding only its id.
    ///
    /// Shells are inserted when a news resource references a topic the store
    /// has not received yet, so the cross reference points at an existing row.
    #[must_use]
    pub fn shell(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Returns true if this topic is a shell awaiting its content.
    #[must_use]
    pub fn is_shell(&self) -> bool {
        self.name.is_empty()
            && self.short_description.is_empty()
            && self.long_description.is_empty()
            && self.url.is_empty()
            && self.image_url.is_empty()
    }
}

/// A news resource (article, video, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsResource {
    /// Unique id within the news resource collection.
    pub id: String,
    /// Headline.
    pub title: String,
    /// Summary text.
    pub content: String,
    /// Link to the full resource.
    pub url: String,
    /// Optional header image.
    pub header_image_url: Option<String>,
    /// Publication instant.
    pub publish_date: DateTime<Utc>,
    /// Free-form resource type, e.g. "Article" or "Video 📺".
    pub resource_type: String,
}

/// Content for one upserted entity.
///
/// A news resource carries the ids of the topics it is tagged with; applying
/// it replaces the resource's relationship rows with exactly those topics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityContent {
    /// A topic.
    Topic(Topic),
    /// A news resource and its topic ids.
    NewsResource {
        /// The resource.
        resource: NewsResource,
        /// Topics the resource is tagged with.
        topic_ids: BTreeSet<String>,
    },
}

impl EntityContent {
    /// Id of the entity.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            EntityContent::Topic(topic) => &topic.id,
            EntityContent::NewsResource { resource, .. } => &resource.id,
        }
    }

    /// Collection the entity belongs to.
    #[must_use]
    pub fn collection(&self) -> Collection {
        match self {
            EntityContent::Topic(_) => Collection::Topic,
            EntityContent::NewsResource { .. } => Collection::NewsResource,
        }
    }
}

/// The committed cursor of one collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionCursor {
    /// Collection the cursor tracks.
    pub collection: Collection,
    /// Highest change-list version applied, 0 if none.
    pub value: u64,
}
