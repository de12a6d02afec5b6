//! Sample topics and news resources.
//!
//! Every builder is deterministic in its arguments, so the same id always
//! yields the same content.

use chrono::{DateTime, TimeZone, Utc};
use feedsync_core::{EntityContent, NewsResource, Topic};
use feedsync_protocol::{EntityPayload, NetworkNewsResource, NetworkTopic};

/// A topic with content derived from its id.
pub fn sample_topic(id: &str) -> Topic {
    Topic {
        id: id.to_string(),
        name: format!("Topic {id}"),
        short_description: format!("About {id}"),
        long_description: format!("Everything about topic {id}"),
        url: format!("https://example.com/topics/{id}"),
        image_url: format!("https://example.com/topics/{id}.svg"),
    }
}

/// Publication date for sample resource `seq`: one day apart from 2024-01-01.
pub fn sample_date(seq: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
        + chrono::Duration::days(i64::from(seq))
}

/// A news resource with content derived from its id.
pub fn sample_news_resource(id: &str) -> NewsResource {
    let seq = id.bytes().map(u32::from).sum::<u32>() % 365;
    NewsResource {
        id: id.to_string(),
        title: format!("Resource {id}"),
        content: format!("Summary of resource {id}"),
        url: format!("https://example.com/news/{id}"),
        header_image_url: Some(format!("https://example.com/news/{id}.png")),
        publish_date: sample_date(seq),
        resource_type: "Article 📚".to_string(),
    }
}

/// Store content for a sample topic.
pub fn topic_content(id: &str) -> EntityContent {
    EntityContent::Topic(sample_topic(id))
}

/// Store content for a sample news resource tagged with `topics`.
pub fn resource_content(id: &str, topics: &[&str]) -> EntityContent {
    EntityContent::NewsResource {
        resource: sample_news_resource(id),
        topic_ids: topics.iter().map(|t| t.to_string()).collect(),
    }
}

/// Wire form of [`sample_topic`].
pub fn network_topic(id: &str) -> EntityPayload {
    let topic = sample_topic(id);
    EntityPayload::Topic(NetworkTopic {
        id: topic.id,
        name: topic.name,
        short_description: topic.short_description,
        long_description: topic.long_description,
        url: topic.url,
        image_url: topic.image_url,
    })
}

/// Wire form of [`sample_news_resource`] tagged with `topics`.
pub fn network_resource(id: &str, topics: &[&str]) -> EntityPayload {
    let resource = sample_news_resource(id);
    EntityPayload::NewsResource(NetworkNewsResource {
        id: resource.id,
        title: resource.title,
        content: resource.content,
        url: resource.url,
        header_image_url: resource.header_image_url,
        publish_date: resource.publish_date,
        resource_type: resource.resource_type,
        topics: topics.iter().map(|t| t.to_string()).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_and_store_forms_agree() {
        let from_wire: EntityContent = network_resource("7", &["a", "b"]).into();
        assert_eq!(from_wire, resource_content("7", &["b", "a"]));

        let from_wire: EntityContent = network_topic("3").into();
        assert_eq!(from_wire, topic_content("3"));
    }

    #[test]
    fn samples_are_deterministic() {
        assert_eq!(sample_news_resource("x"), sample_news_resource("x"));
        assert!(!sample_topic("x").is_shell());
    }
}
