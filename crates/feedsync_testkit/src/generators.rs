//! Property-based test generators using proptest.

use feedsync_protocol::ChangeListItem;
use proptest::prelude::*;
use std::collections::BTreeSet;

/// Strategy for entity ids drawn from a small pool, so lists repeat ids.
pub fn entity_id_strategy() -> impl Strategy<Value = String> {
    (0u8..12).prop_map(|n| n.to_string())
}

/// Strategy for a set of locally present ids.
pub fn local_ids_strategy() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set(entity_id_strategy(), 0..8)
}

/// Strategy for a well-formed change list fetched after `cursor`: every
/// version is above the cursor and versions never decrease.
pub fn change_list_strategy(cursor: u64) -> impl Strategy<Value = Vec<ChangeListItem>> {
    prop::collection::vec((entity_id_strategy(), 0u64..3, any::<bool>()), 0..24).prop_map(
        move |steps| {
            let mut version = cursor;
            steps
                .into_iter()
                .map(|(id, step, is_delete)| {
                    version += step.max(u64::from(version == cursor));
                    ChangeListItem {
                        id,
                        change_list_version: version,
                        is_delete,
                    }
                })
                .collect()
        },
    )
}

/// A user intent, for driving preference mutations in property tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreferenceOp {
    /// Follow a topic.
    Follow(String),
    /// Unfollow a topic.
    Unfollow(String),
    /// Bookmark a resource.
    Bookmark(String),
    /// Remove a bookmark.
    Unbookmark(String),
    /// Mark a resource viewed.
    MarkViewed(String),
    /// Clear view history.
    ClearHistory,
    /// Complete onboarding.
    CompleteOnboarding,
}

/// Strategy for a single user intent.
pub fn preference_op_strategy() -> impl Strategy<Value = PreferenceOp> {
    prop_oneof![
        entity_id_strategy().prop_map(PreferenceOp::Follow),
        entity_id_strategy().prop_map(PreferenceOp::Unfollow),
        entity_id_strategy().prop_map(PreferenceOp::Bookmark),
        entity_id_strategy().prop_map(PreferenceOp::Unbookmark),
        entity_id_strategy().prop_map(PreferenceOp::MarkViewed),
        Just(PreferenceOp::ClearHistory),
        Just(PreferenceOp::CompleteOnboarding),
    ]
}
