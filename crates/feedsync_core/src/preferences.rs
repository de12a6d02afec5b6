//! User preference state.
//!
//! Preferences are user-owned: sync never writes them. Every mutation runs
//! through [`PreferenceStore::atomic_mutate`], which checks
//! `bookmarked ⊆ viewed` on the mutated copy before anything is persisted or
//! published.

use crate::change_feed::{ChangeFeed, Sequenced, Subscription};
use crate::config::StoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::journal::Journal;
use feedsync_storage::StorageBackend;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Colour scheme brand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ThemeBrand {
    /// The default brand.
    #[default]
    Default,
    /// The Android brand.
    Android,
}

/// Dark theme selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DarkThemeConfig {
    /// Follow the system setting.
    #[default]
    FollowSystem,
    /// Always light.
    Light,
    /// Always dark.
    Dark,
}

/// Everything the user has chosen.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Bookmarked news resource ids. Always a subset of `viewed`.
    pub bookmarked: BTreeSet<String>,
    /// Viewed news resource ids.
    pub viewed: BTreeSet<String>,
    /// Followed topic ids.
    pub followed_topics: BTreeSet<String>,
    /// Theme brand.
    pub theme_brand: ThemeBrand,
    /// Dark theme selection.
    pub dark_theme_config: DarkThemeConfig,
    /// Whether to use wallpaper-derived colours.
    pub use_dynamic_color: bool,
    /// Whether onboarding has been completed.
    pub should_hide_onboarding: bool,
}

impl UserPreferences {
    /// Checks `bookmarked ⊆ viewed`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::PreferenceInvariant`] naming the first bookmarked
    /// id that is not viewed.
    pub fn check_invariants(&self) -> CoreResult<()> {
        match self.bookmarked.difference(&self.viewed).next() {
            Some(id) => Err(CoreError::PreferenceInvariant { id: id.clone() }),
            None => Ok(()),
        }
    }

    /// Returns true if the resource is bookmarked.
    #[must_use]
    pub fn is_bookmarked(&self, resource_id: &str) -> bool {
        self.bookmarked.contains(resource_id)
    }

    /// Returns true if the resource has been viewed.
    #[must_use]
    pub fn is_viewed(&self, resource_id: &str) -> bool {
        self.viewed.contains(resource_id)
    }

    /// Returns true if the topic is followed.
    #[must_use]
    pub fn is_following(&self, topic_id: &str) -> bool {
        self.followed_topics.contains(topic_id)
    }
}

/// Notification emitted after a preference mutation commits.
#[derive(Debug, Clone)]
pub struct PreferenceChange {
    /// Commit sequence of the mutation.
    pub sequence: u64,
    /// State after the mutation.
    pub preferences: Arc<UserPreferences>,
}

impl Sequenced for PreferenceChange {
    fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// Journal record: the full state after a mutation. The last record wins.
#[derive(Serialize, Deserialize)]
struct PreferenceRecord {
    sequence: u64,
    preferences: UserPreferences,
}

#[derive(Serialize)]
struct PreferenceRecordRef<'a> {
    sequence: u64,
    preferences: &'a UserPreferences,
}

struct Writer {
    journal: Journal,
    sequence: u64,
}

/// The preference store.
pub struct PreferenceStore {
    state: RwLock<Arc<UserPreferences>>,
    writer: Mutex<Writer>,
    feed: ChangeFeed<PreferenceChange>,
    compact_threshold: u64,
}

impl PreferenceStore {
    /// Opens the store over `backend`, restoring the last recorded state.
    pub fn open(backend: Box<dyn StorageBackend>, config: &StoreConfig) -> CoreResult<Self> {
        let mut journal = Journal::new(backend, config.sync_on_commit);
        let records: Vec<PreferenceRecord> = journal.recover()?;

        let (sequence, preferences) = records
            .into_iter()
            .last()
            .map(|r| (r.sequence, r.preferences))
            .unwrap_or_default();
        preferences.check_invariants()?;

        debug!(
            sequence,
            followed = preferences.followed_topics.len(),
            bookmarked = preferences.bookmarked.len(),
            "preference store opened"
        );

        Ok(Self {
            state: RwLock::new(Arc::new(preferences)),
            writer: Mutex::new(Writer { journal, sequence }),
            feed: ChangeFeed::with_max_history(config.notification_history),
            compact_threshold: config.compact_threshold_bytes,
        })
    }

    /// Returns the current preferences.
    #[must_use]
    pub fn get(&self) -> Arc<UserPreferences> {
        Arc::clone(&self.state.read())
    }

    /// Applies `mutate` to a copy of the state and commits it if the
    /// invariants hold.
    ///
    /// The closure's return value is passed through. A mutation that changes
    /// nothing commits nothing.
    ///
    /// # Errors
    ///
    /// [`CoreError::PreferenceInvariant`] if the mutated state breaks
    /// `bookmarked ⊆ viewed`, or a storage error from the journal. In both
    /// cases the state is unchanged.
    pub fn atomic_mutate<R>(&self, mutate: impl FnOnce(&mut UserPreferences) -> R) -> CoreResult<R> {
        let mut writer = self.writer.lock();
        let current = self.get();

        let mut next = (*current).clone();
        let output = mutate(&mut next);
        next.check_invariants()?;

        if next == *current {
            return Ok(output);
        }

        let sequence = writer.sequence + 1;
        writer.journal.append(&PreferenceRecordRef {
            sequence,
            preferences: &next,
        })?;
        writer.sequence = sequence;

        let next = Arc::new(next);
        *self.state.write() = Arc::clone(&next);
        info!(sequence, "preferences committed");

        self.feed.emit(PreferenceChange {
            sequence,
            preferences: Arc::clone(&next),
        });

        if self.compact_threshold > 0 {
            let record = PreferenceRecordRef {
                sequence,
                preferences: &next,
            };
            match writer.journal.size() {
                Ok(size) if size > self.compact_threshold => {
                    if let Err(e) = writer.journal.rewrite(&record) {
                        warn!(error = %e, "preference journal compaction failed");
                    }
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "could not size preference journal"),
            }
        }

        Ok(output)
    }

    /// Rewrites the journal as a single record holding the current state.
    pub fn compact(&self) -> CoreResult<()> {
        let mut writer = self.writer.lock();
        let sequence = writer.sequence;
        let state = self.get();
        writer.journal.rewrite(&PreferenceRecordRef {
            sequence,
            preferences: &state,
        })
    }

    /// Current journal size in bytes.
    pub fn journal_size(&self) -> CoreResult<u64> {
        self.writer.lock().journal.size()
    }

    /// Subscribes to committed mutations.
    pub fn subscribe(&self) -> Subscription<PreferenceChange> {
        self.feed.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedsync_storage::InMemoryBackend;
    use proptest::prelude::*;

    fn open(backend: &InMemoryBackend) -> PreferenceStore {
        PreferenceStore::open(Box::new(backend.clone()), &StoreConfig::default()).unwrap()
    }

    #[test]
    fn mutation_persists() {
        let backend = InMemoryBackend::new();
        let store = open(&backend);
        store
            .atomic_mutate(|p| {
                p.followed_topics.insert("1".into());
                p.theme_brand = ThemeBrand::Android;
            })
            .unwrap();

        let reopened = open(&backend);
        let prefs = reopened.get();
        assert!(prefs.is_following("1"));
        assert_eq!(prefs.theme_brand, ThemeBrand::Android);
    }

    #[test]
    fn invariant_violation_discards_mutation() {
        let backend = InMemoryBackend::new();
        let store = open(&backend);
        let err = store
            .atomic_mutate(|p| {
                p.followed_topics.insert("1".into());
                p.bookmarked.insert("r1".into());
            })
            .unwrap_err();

        assert!(matches!(err, CoreError::PreferenceInvariant { ref id } if id == "r1"));
        assert_eq!(*store.get(), UserPreferences::default());
        assert!(backend.data().is_empty());
    }

    #[test]
    fn unchanged_state_writes_nothing() {
        let backend = InMemoryBackend::new();
        let store = open(&backend);
        let sub = store.subscribe();
        let value = store.atomic_mutate(|p| p.viewed.len()).unwrap();
        assert_eq!(value, 0);
        assert!(backend.data().is_empty());
        assert!(sub.try_recv().is_none());
    }

    #[test]
    fn notifications_are_sequenced() {
        let store = open(&InMemoryBackend::new());
        let sub = store.subscribe();
        store.atomic_mutate(|p| p.use_dynamic_color = true).unwrap();
        store
            .atomic_mutate(|p| p.dark_theme_config = DarkThemeConfig::Dark)
            .unwrap();

        let changes = sub.drain();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].sequence, 1);
        assert_eq!(changes[1].sequence, 2);
        assert_eq!(changes[1].preferences.dark_theme_config, DarkThemeConfig::Dark);
    }

    #[test]
    fn compaction_keeps_latest_state() {
        let backend = InMemoryBackend::new();
        let store = open(&backend);
        for i in 0..10 {
            store
                .atomic_mutate(|p| {
                    p.viewed.insert(i.to_string());
                })
                .unwrap();
        }
        let before = store.journal_size().unwrap();
        store.compact().unwrap();
        assert!(store.journal_size().unwrap() < before);

        let reopened = open(&backend);
        assert_eq!(reopened.get().viewed.len(), 10);
    }

    proptest! {
        #[test]
        fn committed_state_always_satisfies_invariant(
            ops in proptest::collection::vec((0u8..3, 0u8..6), 0..40)
        ) {
            let store = open(&InMemoryBackend::new());
            for (op, id) in ops {
                let id = id.to_string();
                let _ = store.atomic_mutate(|p| match op {
                    0 => { p.viewed.insert(id); }
                    1 => { p.bookmarked.insert(id); }
                    _ => { p.viewed.remove(&id); }
                });
                prop_assert!(store.get().check_invariants().is_ok());
            }
        }
    }
}
