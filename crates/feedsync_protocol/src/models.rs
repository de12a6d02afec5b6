//! Network representations of topics and news resources.

use crate::error::{ProtocolError, ProtocolResult};
use chrono::{DateTime, Utc};
use feedsync_core::{Collection, EntityContent, NewsResource, Topic};
use serde::{Deserialize, Serialize};

/// A topic as served by the API.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkTopic {
    /// Topic id.
    pub id: String,
    /// Display name.
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

impl From<NetworkTopic> for Topic {
    fn from(topic: NetworkTopic) -> Self {
        Topic {
            id: topic.id,
            name: topic.name,
            short_description: topic.short_description,
            long_description: topic.long_description,
            url: topic.url,
            image_url: topic.image_url,
        }
    }
}

/// A news resource as served by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkNewsResource {
    /// Resource id.
    pub id: String,
    /// Headline.
    pub title: String,
    /// Summary text.
    #[serde(default)]
    pub content: String,
    /// Link to the full resource.
    pub url: String,
    /// Optional header image.
    #[serde(default)]
    pub header_image_url: Option<String>,
    /// Publication instant (RFC 3339).
    pub publish_date: DateTime<Utc>,
    /// Free-form resource type.
    #[serde(rename = "type", default)]
    pub resource_type: String,
    /// Ids of the topics the resource is tagged with.
    #[serde(default)]
    pub topics: Vec<String>,
}

impl From<NetworkNewsResource> for EntityContent {
    fn from(resource: NetworkNewsResource) -> Self {
        EntityContent::NewsResource {
            topic_ids: resource.topics.into_iter().collect(),
            resource: NewsResource {
                id: resource.id,
                title: resource.title,
                content: resource.content,
                url: resource.url,
                header_image_url: resource.header_image_url,
                publish_date: resource.publish_date,
                resource_type: resource.resource_type,
            },
        }
    }
}

/// Content of one fetched entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityPayload {
    /// A topic.
    Topic(NetworkTopic),
    /// A news resource.
    NewsResource(NetworkNewsResource),
}

impl EntityPayload {
    /// Id of the entity.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            EntityPayload::Topic(topic) => &topic.id,
            EntityPayload::NewsResource(resource) => &resource.id,
        }
    }

    /// Collection of the entity.
    #[must_use]
    pub fn collection(&self) -> Collection {
        match self {
            EntityPayload::Topic(_) => Collection::Topic,
            EntityPayload::NewsResource(_) => Collection::NewsResource,
        }
    }

    /// Checks the fields the store relies on.
    ///
    /// # Errors
    ///
    /// Fails for an empty id or an empty topic id reference.
    pub fn validate(&self) -> ProtocolResult<()> {
        if self.id().is_empty() {
            return Err(ProtocolError::invalid_payload(format!(
                "{} entity with an empty id",
                self.collection()
            )));
        }
        if let EntityPayload::NewsResource(resource) = self {
            if resource.topics.iter().any(String::is_empty) {
                return Err(ProtocolError::invalid_payload(format!(
                    "news resource {} references an empty topic id",
                    resource.id
                )));
            }
        }
        Ok(())
    }
}

impl From<EntityPayload> for EntityContent {
    fn from(payload: EntityPayload) -> Self {
        match payload {
            EntityPayload::Topic(topic) => EntityContent::Topic(topic.into()),
            EntityPayload::NewsResource(resource) => resource.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESOURCE: &str = r#"{
        "id": "125",
        "title": "Android Basics with Compose",
        "content": "We released the first two units",
        "url": "https://goo.gle/AndroidBasicsWithCompose",
        "headerImageUrl": "https://example.com/header.png",
        "publishDate": "2022-05-04T23:00:00.000Z",
        "type": "Article 📚",
        "topics": ["2", "3", "2"]
    }"#;

    #[test]
    fn resource_decodes_and_converts() {
        let resource: NetworkNewsResource = serde_json::from_str(RESOURCE).unwrap();
        assert_eq!(resource.resource_type, "Article 📚");

        let content: EntityContent = resource.into();
        match content {
            EntityContent::NewsResource {
                resource,
                topic_ids,
            } => {
                assert_eq!(resource.id, "125");
                assert_eq!(topic_ids.len(), 2);
                assert_eq!(
                    resource.header_image_url.as_deref(),
                    Some("https://example.com/header.png")
                );
            }
            EntityContent::Topic(_) => panic!("expected a news resource"),
        }
    }

    #[test]
    fn topic_missing_fields_default() {
        let topic: NetworkTopic = serde_json::from_str(r#"{"id":"1","name":"Headlines"}"#).unwrap();
        assert_eq!(topic.url, "");
        let topic: Topic = topic.into();
        assert!(!topic.is_shell());
    }

    #[test]
    fn empty_id_fails_validation() {
        let payload = EntityPayload::Topic(NetworkTopic::default());
        assert!(matches!(
            payload.validate(),
            Err(ProtocolError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn empty_topic_reference_fails_validation() {
        let mut resource: NetworkNewsResource = serde_json::from_str(RESOURCE).unwrap();
        resource.topics.push(String::new());
        assert!(EntityPayload::NewsResource(resource).validate().is_err());
    }
}
