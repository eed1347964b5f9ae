use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    None,
    Ok,
    Stale,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSizeInfo {
    pub scene_bytes: u64,
    pub media_bytes: u64,
    pub media_entries: u64,
}

/// What the playback layer sees when it asks whether a piece of content is
/// locally available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStatus {
    pub status: ContentStatus,
    pub last_sync: Option<DateTime<Utc>>,
    pub size_info: CacheSizeInfo,
}

impl CacheStatus {
    pub fn missing() -> Self {
        Self {
            status: ContentStatus::None,
            last_sync: None,
            size_info: CacheSizeInfo::default(),
        }
    }
}
