//! Change list entries.

use serde::{Deserialize, Serialize};

/// One entry of a collection's change feed.
///
/// Produced only by the remote service. Within one response, versions are
/// non-decreasing and greater than the `after` value requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeListItem {
    /// Entity id.
    pub id: String,
    /// Version at which the entity changed.
    pub change_list_version: u64,
    /// Whether the entity was deleted at this version.
    #[serde(default)]
    pub is_delete: bool,
}

impl ChangeListItem {
    /// An upsert entry.
    #[must_use]
    pub fn upsert(id: impl Into<String>, version: u64) -> Self {
        Self {
            id: id.into(),
            change_list_version: version,
            is_delete: false,
        }
    }

    /// A delete entry.
    #[must_use]
    pub fn delete(id: impl Into<String>, version: u64) -> Self {
        Self {
            id: id.into(),
            change_list_version: version,
            is_delete: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_case_fields() {
        let item: ChangeListItem =
            serde_json::from_str(r#"{"id":"5","changeListVersion":4,"isDelete":true}"#).unwrap();
        assert_eq!(item, ChangeListItem::delete("5", 4));
    }

    #[test]
    fn is_delete_defaults_to_false() {
        let item: ChangeListItem =
            serde_json::from_str(r#"{"id":"5","changeListVersion":3}"#).unwrap();
        assert!(!item.is_delete);
    }

    #[test]
    fn negative_version_is_rejected() {
        let result: Result<ChangeListItem, _> =
            serde_json::from_str(r#"{"id":"5","changeListVersion":-1,"isDelete":false}"#);
        assert!(result.is_err());
    }
}
