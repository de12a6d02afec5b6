//! The `{"data": ...}` response envelope.

use crate::change_list::ChangeListItem;
use crate::error::ProtocolResult;
use crate::models::{EntityPayload, NetworkNewsResource, NetworkTopic};
use feedsync_core::Collection;
use serde::{Deserialize, Serialize};

/// Wrapper around every API response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// The payload.
    pub data: T,
}

impl<T> Envelope<T> {
    /// Wraps `data`.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Serializes `data` inside an envelope, as the API does.
///
/// # Errors
///
/// Fails only if `data` cannot be represented as JSON.
pub fn encode_envelope<T: Serialize>(data: &T) -> ProtocolResult<String> {
    Ok(serde_json::to_string(&Envelope::new(data))?)
}

/// Decodes a change list response.
pub fn decode_change_list(body: &[u8]) -> ProtocolResult<Vec<ChangeListItem>> {
    let envelope: Envelope<Vec<ChangeListItem>> = serde_json::from_slice(body)?;
    Ok(envelope.data)
}

/// Decodes a topic content response.
pub fn decode_topics(body: &[u8]) -> ProtocolResult<Vec<NetworkTopic>> {
    let envelope: Envelope<Vec<NetworkTopic>> = serde_json::from_slice(body)?;
    Ok(envelope.data)
}

/// Decodes a news resource content response.
pub fn decode_news_resources(body: &[u8]) -> ProtocolResult<Vec<NetworkNewsResource>> {
    let envelope: Envelope<Vec<NetworkNewsResource>> = serde_json::from_slice(body)?;
    Ok(envelope.data)
}

/// Decodes a content response for `collection` and validates every entity.
pub fn decode_entities(collection: Collection, body: &[u8]) -> ProtocolResult<Vec<EntityPayload>> {
    let payloads: Vec<EntityPayload> = match collection {
        Collection::Topic => decode_topics(body)?
            .into_iter()
            .map(EntityPayload::Topic)
            .collect(),
        Collection::NewsResource => decode_news_resources(body)?
            .into_iter()
            .map(EntityPayload::NewsResource)
            .collect(),
    };
    for payload in &payloads {
        payload.validate()?;
    }
    Ok(payloads)
}
