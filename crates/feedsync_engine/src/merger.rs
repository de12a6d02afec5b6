//! User-initiated preference mutations.
//!
//! One operation per user intent, each a single
//! [`PreferenceStore::atomic_mutate`](feedsync_core::PreferenceStore::atomic_mutate)
//! unit. None of them touch the network or wait for a sync run.

use feedsync_core::{CoreResult, DarkThemeConfig, Database, ThemeBrand, UserPreferences};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Applies user intents to preference state, keeping `bookmarked ⊆ viewed`.
#[derive(Clone)]
pub struct UserDataMerger {
    database: Arc<Database>,
}

impl UserDataMerger {
    /// Creates a merger writing to `database`.
    pub fn new(database: Arc<Database>) -> Self {
        Self { database }
    }

    /// Current preferences.
    pub fn preferences(&self) -> Arc<UserPreferences> {
        self.database.preferences().get()
    }

    fn mutate<R>(&self, mutate: impl FnOnce(&mut UserPreferences) -> R) -> CoreResult<R> {
        self.database.preferences().atomic_mutate(mutate)
    }

    /// Follows a topic.
    pub fn follow_topic(&self, topic_id: &str) -> CoreResult<()> {
        debug!(topic_id, "follow");
        self.mutate(|p| {
            p.followed_topics.insert(topic_id.to_string());
        })
    }

    /// Unfollows a topic. Unfollowing the last followed topic shows
    /// onboarding again.
    pub fn unfollow_topic(&self, topic_id: &str) -> CoreResult<()> {
        debug!(topic_id, "unfollow");
        self.mutate(|p| {
            p.followed_topics.remove(topic_id);
            if p.followed_topics.is_empty() {
                p.should_hide_onboarding = false;
            }
        })
    }

    /// Replaces the followed topic set.
    pub fn set_followed_topics(&self, topic_ids: BTreeSet<String>) -> CoreResult<()> {
        debug!(count = topic_ids.len(), "set followed topics");
        self.mutate(|p| {
            if topic_ids.is_empty() {
                p.should_hide_onboarding = false;
            }
            p.followed_topics = topic_ids;
        })
    }

    /// Bookmarks a resource, marking it viewed in the same unit.
    pub fn bookmark(&self, resource_id: &str) -> CoreResult<()> {
        debug!(resource_id, "bookmark");
        self.mutate(|p| {
            p.viewed.insert(resource_id.to_string());
            p.bookmarked.insert(resource_id.to_string());
        })
    }

    /// Removes a bookmark. The resource stays viewed.
    pub fn unbookmark(&self, resource_id: &str) -> CoreResult<()> {
        debug!(resource_id, "unbookmark");
        self.mutate(|p| {
            p.bookmarked.remove(resource_id);
        })
    }

    /// Marks a resource viewed.
    pub fn mark_viewed(&self, resource_id: &str) -> CoreResult<()> {
        self.mutate(|p| {
            p.viewed.insert(resource_id.to_string());
        })
    }

    /// Clears view history. Bookmarked resources stay viewed.
    pub fn clear_view_history(&self) -> CoreResult<()> {
        debug!("clear view history");
        self.mutate(|p| {
            p.viewed = p.bookmarked.clone();
        })
    }

    /// Sets the theme brand.
    pub fn set_theme_brand(&self, brand: ThemeBrand) -> CoreResult<()> {
        self.mutate(|p| p.theme_brand = brand)
    }

    /// Sets the dark theme selection.
    pub fn set_dark_theme_config(&self, config: DarkThemeConfig) -> CoreResult<()> {
        self.mutate(|p| p.dark_theme_config = config)
    }

    /// Sets whether to use dynamic colour.
    pub fn set_dynamic_color(&self, enabled: bool) -> CoreResult<()> {
        self.mutate(|p| p.use_dynamic_color = enabled)
    }

    /// Marks onboarding complete.
    pub fn complete_onboarding(&self) -> CoreResult<()> {
        debug!("onboarding complete");
        self.mutate(|p| p.should_hide_onboarding = true)
    }

    /// Shows onboarding again.
    pub fn reset_onboarding(&self) -> CoreResult<()> {
        self.mutate(|p| p.should_hide_onboarding = false)
    }
}
