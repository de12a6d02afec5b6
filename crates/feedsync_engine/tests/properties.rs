//! Property tests for reconciliation and preference mutations.

use feedsync_core::Database;
use feedsync_engine::{reconcile, ErrorKind, UserDataMerger};
use feedsync_protocol::ChangeListItem;
use feedsync_testkit::prelude::*;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// The winning item per id: highest version, later listed on ties.
fn expected_winners(items: &[ChangeListItem]) -> BTreeMap<String, &ChangeListItem> {
    let mut winners: BTreeMap<String, &ChangeListItem> = BTreeMap::new();
    for item in items {
        match winners.get(&item.id) {
            Some(w) if w.change_list_version > item.change_list_version => {}
            _ => {
                winners.insert(item.id.clone(), item);
            }
        }
    }
    winners
}

fn apply(merger: &UserDataMerger, op: &PreferenceOp) {
    let result = match op {
        PreferenceOp::Follow(id) => merger.follow_topic(id),
        PreferenceOp::Unfollow(id) => merger.unfollow_topic(id),
        PreferenceOp::Bookmark(id) => merger.bookmark(id),
        PreferenceOp::Unbookmark(id) => merger.unbookmark(id),
        PreferenceOp::MarkViewed(id) => merger.mark_viewed(id),
        PreferenceOp::ClearHistory => merger.clear_view_history(),
        PreferenceOp::CompleteOnboarding => merger.complete_onboarding(),
    };
    result.unwrap();
}

proptest! {
    #[test]
    fn reconciliation_partitions_listed_ids(
        local in local_ids_strategy(),
        (cursor, items) in (0u64..100).prop_flat_map(|c| (Just(c), change_list_strategy(c))),
    ) {
        let result = reconcile(&local, &items, cursor).unwrap();
        let winners = expected_winners(&items);

        let listed: BTreeSet<String> = winners.keys().cloned().collect();
        let mut covered = BTreeSet::new();
        for set in [&result.to_create, &result.to_update, &result.to_delete] {
            for id in set {
                prop_assert!(covered.insert(id.clone()), "{id} in two sets");
            }
        }
        prop_assert_eq!(covered, listed);

        for (id, item) in &winners {
            if item.is_delete {
                prop_assert!(result.to_delete.contains(id));
            } else if local.contains(id) {
                prop_assert!(result.to_update.contains(id));
            } else {
                prop_assert!(result.to_create.contains(id));
            }
        }

        let max = items.iter().map(|i| i.change_list_version).max().unwrap_or(cursor);
        prop_assert_eq!(result.new_cursor, max.max(cursor));
    }

    #[test]
    fn any_generated_list_reconciles(
        local in local_ids_strategy(),
        (cursor, items) in (0u64..100).prop_flat_map(|c| (Just(c), change_list_strategy(c))),
    ) {
        let result = reconcile(&local, &items, cursor).unwrap();
        prop_assert!(result.new_cursor >= cursor);
        prop_assert!(result.to_create.is_disjoint(&local));
        prop_assert!(result.to_update.is_subset(&local));
    }

    #[test]
    fn stale_item_rejects_whole_list(
        local in local_ids_strategy(),
        (cursor, mut items) in (1u64..100).prop_flat_map(|c| (Just(c), change_list_strategy(c))),
        stale in 0u64..=100,
        at in any::<prop::sample::Index>(),
    ) {
        let stale = stale.min(cursor);
        let position = at.index(items.len() + 1);
        items.insert(position, ChangeListItem::upsert("stale", stale));

        let err = reconcile(&local, &items, cursor).unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::ProtocolViolation);
    }

    #[test]
    fn reconciling_twice_is_stable(
        local in local_ids_strategy(),
        (cursor, items) in (0u64..100).prop_flat_map(|c| (Just(c), change_list_strategy(c))),
    ) {
        let first = reconcile(&local, &items, cursor).unwrap();
        let second = reconcile(&local, &items, cursor).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn bookmarks_stay_viewed(ops in prop::collection::vec(preference_op_strategy(), 0..50)) {
        let merger = UserDataMerger::new(Arc::new(Database::open_in_memory().unwrap()));
        for op in &ops {
            apply(&merger, op);
            let prefs = merger.preferences();
            prop_assert!(prefs.bookmarked.is_subset(&prefs.viewed), "after {op:?}");
            if prefs.followed_topics.is_empty() && matches!(op, PreferenceOp::Unfollow(_)) {
                prop_assert!(!prefs.should_hide_onboarding);
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn preferences_survive_reopen(ops in prop::collection::vec(preference_op_strategy(), 1..20)) {
        let db = TestDatabase::file();
        let expected = {
            let merger = UserDataMerger::new(Arc::clone(&db.db));
            for op in &ops {
                apply(&merger, op);
            }
            merger.preferences()
        };
        let db = db.reopen();
        prop_assert_eq!(db.preferences().get(), expected);
    }
}
