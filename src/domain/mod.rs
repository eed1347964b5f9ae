pub mod connectivity;
pub mod entities;
pub mod value_objects;

pub use connectivity::{ConnectivityEvent, ConnectivityState};
pub use entities::{
    CacheSizeInfo, CacheStatus, ContentStatus, MediaEntry, QueueEvent, SceneEntry, ScenePayload,
};
pub use value_objects::{ContentHash, ContentId, MediaUrl, Partition, QueueEventType};
