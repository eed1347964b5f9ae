use crate::domain::value_objects::{ContentId, MediaUrl};
use bytes::Bytes;
use chrono::{DateTime, Utc};

/// A cached media blob. Deleting the owning scene cascades to every entry
/// whose `associated_content_id` matches it.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaEntry {
    pub url: MediaUrl,
    pub bytes: Bytes,
    pub mime_type: String,
    pub size_bytes: u64,
    pub associated_content_id: Option<ContentId>,
    pub cached_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
}

impl MediaEntry {
    pub fn new(
        url: MediaUrl,
        bytes: Bytes,
        mime_type: String,
        associated_content_id: Option<ContentId>,
        cached_at: DateTime<Utc>,
    ) -> Self {
        let size_bytes = bytes.len() as u64;
        Self {
            url,
            bytes,
            mime_type,
            size_bytes,
            associated_content_id,
            cached_at,
            last_accessed_at: cached_at,
        }
    }
}
