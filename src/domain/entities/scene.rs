use crate::domain::value_objects::{ContentHash, ContentId, MediaUrl};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Resolved displayable content. The server decides which kind a device
/// currently plays; the kind is fixed once at the API boundary rather than
/// re-inspected at each use site.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScenePayload {
    Playlist { items: Vec<Value> },
    Layout { zones: Vec<Value> },
    Campaign { resolution: Value },
}

impl ScenePayload {
    pub fn kind(&self) -> &'static str {
        match self {
            ScenePayload::Playlist { .. } => "playlist",
            ScenePayload::Layout { .. } => "layout",
            ScenePayload::Campaign { .. } => "campaign",
        }
    }
}

/// A cached scene. Owned by the local store; mutated only through cache-write
/// and touch operations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SceneEntry {
    pub id: ContentId,
    pub payload: ScenePayload,
    pub content_hash: ContentHash,
    pub media_hash: ContentHash,
    pub referenced_media_urls: Vec<MediaUrl>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub cached_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_accessed_at: DateTime<Utc>,
    pub is_stale: bool,
}

impl SceneEntry {
    pub fn new(
        id: ContentId,
        payload: ScenePayload,
        content_hash: ContentHash,
        media_hash: ContentHash,
        referenced_media_urls: Vec<MediaUrl>,
        cached_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            payload,
            content_hash,
            media_hash,
            referenced_media_urls,
            cached_at,
            last_accessed_at: cached_at,
            is_stale: false,
        }
    }
}
