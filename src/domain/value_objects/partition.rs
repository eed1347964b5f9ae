use serde::{Deserialize, Serialize};
use std::fmt;

/// Named partitions of the local store. Each maps to one table; the index
/// whitelist is the set of secondary indices the schema actually carries, so a
/// typo'd index name fails fast instead of scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    Scenes,
    Media,
    DeviceState,
    OfflineQueue,
}

impl Partition {
    pub fn table(&self) -> &'static str {
        match self {
            Partition::Scenes => "scenes",
            Partition::Media => "media",
            Partition::DeviceState => "device_state",
            Partition::OfflineQueue => "offline_queue",
        }
    }

    pub fn indexes(&self) -> &'static [&'static str] {
        match self {
            Partition::Scenes => &["content_hash", "cached_at"],
            Partition::Media => &["associated_content_id", "cached_at", "size_bytes"],
            Partition::DeviceState => &[],
            Partition::OfflineQueue => &["event_type", "created_at", "synced"],
        }
    }

    /// Device state and the offline queue are never evicted: losing either
    /// loses credentials or telemetry.
    pub fn is_evictable(&self) -> bool {
        matches!(self, Partition::Scenes | Partition::Media)
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.table())
    }
}
