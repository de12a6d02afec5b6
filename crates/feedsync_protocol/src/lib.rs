//! # feedsync protocol
//!
//! Wire types for the remote change-list API and their decoding.
//!
//! The API is a read-only JSON service. Lists arrive wrapped in a
//! `{"data": [...]}` envelope:
//!
//! - `GET /changelists/{collection}?after={version}` returns
//!   [`ChangeListItem`]s with versions greater than `version`
//! - `GET /{collection}?id=a&id=b` returns the content of those ids
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod change_list;
mod envelope;
mod error;
mod models;

pub use change_list::ChangeListItem;
pub use envelope::{
    decode_change_list, decode_entities, decode_news_resources, decode_topics, encode_envelope,
    Envelope,
};
pub use error::{ProtocolError, ProtocolResult};
pub use models::{EntityPayload, NetworkNewsResource, NetworkTopic};

/// Path segment of a collection's change list endpoint.
#[must_use]
pub fn change_list_path(collection: feedsync_core::Collection) -> String {
    format!("changelists/{}", collection.as_str())
}

/// Path segment of a collection's content endpoint.
#[must_use]
pub fn content_path(collection: feedsync_core::Collection) -> &'static str {
    collection.as_str()
}
