pub mod cache_status;
pub mod media;
pub mod queue_event;
pub mod scene;

pub use cache_status::{CacheSizeInfo, CacheStatus, ContentStatus};
pub use media::MediaEntry;
pub use queue_event::QueueEvent;
pub use scene::{SceneEntry, ScenePayload};
