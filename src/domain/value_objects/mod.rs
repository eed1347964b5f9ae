pub mod content_hash;
pub mod content_id;
pub mod event_type;
pub mod media_url;
pub mod partition;

pub use content_hash::ContentHash;
pub use content_id::ContentId;
pub use event_type::QueueEventType;
pub use media_url::MediaUrl;
pub use partition::Partition;
