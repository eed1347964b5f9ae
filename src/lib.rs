pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;
pub mod state;

pub use application::ports::content_api::{MediaFetch, RemoteContentApi, ResolvedContent};
pub use application::ports::delivery_api::EventDeliveryApi;
pub use application::ports::local_store::{IndexValue, LocalStore, StoredRecord};
pub use application::services::{
    ConnectivityMonitor, ContentService, ContentSource, CredentialService, LoadOptions,
    LoadedContent, SyncReport, SyncService,
};
pub use domain::connectivity::{ConnectivityEvent, ConnectivityState};
pub use domain::entities::{
    CacheSizeInfo, CacheStatus, ContentStatus, MediaEntry, QueueEvent, SceneEntry, ScenePayload,
};
pub use domain::value_objects::{ContentHash, ContentId, MediaUrl, Partition, QueueEventType};
pub use infrastructure::cache::{EvictionManager, EvictionReport};
pub use infrastructure::database::{ConnectionPool, SqliteLocalStore};
pub use infrastructure::offline::OfflineEventQueue;
pub use shared::config::AppConfig;
pub use shared::error::AppError;
pub use shared::retry::backoff;
pub use state::PlayerState;

/// Opt-in tracing setup for binaries and manual harnesses. Library consumers
/// that already install a subscriber should skip this.
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marquee=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
