//! Change-list reconciliation.
//!
//! A pure function from (local ids, change list, cursor) to the sets of ids to
//! create, update and delete, plus the cursor to commit with them.

use crate::error::{SyncError, SyncResult};
use feedsync_protocol::ChangeListItem;
use std::collections::{BTreeMap, BTreeSet};

/// The outcome of reconciling one change list.
///
/// `to_create`, `to_update` and `to_delete` are pairwise disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Upserted ids not present locally.
    pub to_create: BTreeSet<String>,
    /// Upserted ids present locally.
    pub to_update: BTreeSet<String>,
    /// Ids whose latest change is a delete.
    pub to_delete: BTreeSet<String>,
    /// Highest version in the change list, or the old cursor if it was empty.
    pub new_cursor: u64,
}

impl Reconciliation {
    /// Ids whose content must be fetched, in id order.
    pub fn to_upsert(&self) -> Vec<String> {
        self.to_create
            .union(&self.to_update)
            .cloned()
            .collect()
    }

    /// Returns true if nothing changes.
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }
}

/// Reconciles `items` fetched after `cursor` against the ids present locally.
///
/// For an id listed several times, the item with the highest version wins;
/// among equal versions the one listed last wins.
///
/// # Errors
///
/// [`SyncError::MalformedChangeList`] if any item's version is not greater
/// than `cursor`. Nothing is reconciled in that case.
pub fn reconcile(
    local_ids: &BTreeSet<String>,
    items: &[ChangeListItem],
    cursor: u64,
) -> SyncResult<Reconciliation> {
    let mut winners: BTreeMap<&str, &ChangeListItem> = BTreeMap::new();
    let mut new_cursor = cursor;

    for item in items {
        if item.change_list_version <= cursor {
            return Err(SyncError::MalformedChangeList {
                id: item.id.clone(),
                version: item.change_list_version,
                cursor,
            });
        }
        new_cursor = new_cursor.max(item.change_list_version);

        winners
            .entry(item.id.as_str())
            .and_modify(|winner| {
                if item.change_list_version >= winner.change_list_version {
                    *winner = item;
                }
            })
            .or_insert(item);
    }

    let mut result = Reconciliation {
        new_cursor,
        ..Reconciliation::default()
    };
    for (id, item) in winners {
        let id = id.to_string();
        if item.is_delete {
            result.to_delete.insert(id);
        } else if local_ids.contains(&id) {
            result.to_update.insert(id);
        } else {
            result.to_create.insert(id);
        }
    }
    Ok(result)
}
