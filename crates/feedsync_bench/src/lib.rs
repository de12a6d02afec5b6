//! Benchmark utilities.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use feedsync_core::{Collection, ContentBatch};
use feedsync_protocol::ChangeListItem;
use feedsync_testkit::{resource_content, topic_content};
use rand::seq::SliceRandom;
use rand::Rng;

/// Generate a change list of `len` items over `distinct` ids, fetched after
/// `cursor`. Roughly one item in ten is a delete.
pub fn random_change_list(len: usize, distinct: usize, cursor: u64) -> Vec<ChangeListItem> {
    let mut rng = rand::thread_rng();
    let mut version = cursor;
    (0..len)
        .map(|_| {
            version += rng.gen_range(1..3);
            ChangeListItem {
                id: rng.gen_range(0..distinct.max(1)).to_string(),
                change_list_version: version,
                is_delete: rng.gen_bool(0.1),
            }
        })
        .collect()
}

/// Generate a news resource batch of `count` upserts, each tagged with up to
/// three of `topics` topic ids.
pub fn news_batch(count: usize, topics: usize, new_cursor: u64) -> ContentBatch {
    let mut rng = rand::thread_rng();
    let topic_ids: Vec<String> = (0..topics.max(1)).map(|t| format!("t{t}")).collect();
    (0..count).fold(ContentBatch::new(Collection::NewsResource, new_cursor), |batch, n| {
        let tags: Vec<&str> = topic_ids
            .choose_multiple(&mut rng, 3)
            .map(String::as_str)
            .collect();
        batch.upsert(resource_content(&format!("n{n}"), &tags))
    })
}

/// Generate a topic batch of `count` upserts.
pub fn topic_batch(count: usize, new_cursor: u64) -> ContentBatch {
    (0..count).fold(ContentBatch::new(Collection::Topic, new_cursor), |batch, t| {
        batch.upsert(topic_content(&format!("t{t}")))
    })
}
