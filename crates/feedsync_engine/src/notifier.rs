//! New-content notifications.

use feedsync_core::{ContentSnapshot, NewsResource, UserPreferences};
use parking_lot::Mutex;
use tracing::info;

/// Receives news resources worth telling the user about.
pub trait Notifier: Send + Sync {
    /// Called after a news resource unit commits, with the newly created
    /// resources tagged with a followed topic. Never called with an empty
    /// slice.
    fn post_news_notifications(&self, resources: &[NewsResource]);
}

/// Discards notifications.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn post_news_notifications(&self, _resources: &[NewsResource]) {}
}

/// Logs notifications.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn post_news_notifications(&self, resources: &[NewsResource]) {
        for resource in resources {
            info!(id = %resource.id, title = %resource.title, "new content in a followed topic");
        }
    }
}

/// Keeps every notification batch, for tests.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    posted: Mutex<Vec<Vec<NewsResource>>>,
}

impl RecordingNotifier {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Batches posted so far.
    pub fn posted(&self) -> Vec<Vec<NewsResource>> {
        self.posted.lock().clone()
    }

    /// Ids of every resource posted so far.
    pub fn posted_ids(&self) -> Vec<String> {
        self.posted
            .lock()
            .iter()
            .flatten()
            .map(|r| r.id.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn post_news_notifications(&self, resources: &[NewsResource]) {
        self.posted.lock().push(resources.to_vec());
    }
}

/// Selects, among `created`, the resources tagged with a followed topic.
///
/// Users who have not finished onboarding get nothing.
pub(crate) fn resources_to_notify(
    snapshot: &ContentSnapshot,
    preferences: &UserPreferences,
    created: &[String],
) -> Vec<NewsResource> {
    if !preferences.should_hide_onboarding || preferences.followed_topics.is_empty() {
        return Vec::new();
    }
    created
        .iter()
        .filter(|id| {
            snapshot
                .topic_ids_for(id)
                .iter()
                .any(|topic| preferences.is_following(topic))
        })
        .filter_map(|id| snapshot.news_resource(id).cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use feedsync_core::{Collection, ContentBatch, Database, EntityContent};

    fn resource(id: &str, topic: &str) -> EntityContent {
        EntityContent::NewsResource {
            resource: NewsResource {
                id: id.into(),
                title: id.into(),
                content: String::new(),
                url: String::new(),
                header_image_url: None,
                publish_date: Utc::now(),
                resource_type: "Article".into(),
            },
            topic_ids: [topic.to_string()].into(),
        }
    }

    #[test]
    fn only_followed_topics_after_onboarding() {
        let db = Database::open_in_memory().unwrap();
        db.content()
            .atomic_apply(
                &ContentBatch::new(Collection::NewsResource, 1)
                    .upsert(resource("r1", "followed"))
                    .upsert(resource("r2", "other")),
            )
            .unwrap();
        let snapshot = db.content().snapshot();
        let created = vec!["r1".to_string(), "r2".to_string()];

        let mut prefs = UserPreferences::default();
        prefs.followed_topics.insert("followed".into());
        assert!(resources_to_notify(&snapshot, &prefs, &created).is_empty());

        prefs.should_hide_onboarding = true;
        let picked = resources_to_notify(&snapshot, &prefs, &created);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].id, "r1");
    }

    #[test]
    fn recorder_keeps_batches() {
        let notifier = RecordingNotifier::new();
        notifier.post_news_notifications(&[]);
        assert_eq!(notifier.posted().len(), 1);
        assert!(notifier.posted_ids().is_empty());
    }
}
