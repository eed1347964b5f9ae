pub mod connectivity_service;
pub mod content_service;
pub mod credential_service;
pub mod sync_service;

pub use connectivity_service::ConnectivityMonitor;
pub use content_service::{ContentService, ContentSource, LoadOptions, LoadedContent};
pub use credential_service::CredentialService;
pub use sync_service::{SyncReport, SyncService};

/// Well-known device-state keys. Device state is never evicted, so these
/// survive any amount of cache pressure.
pub(crate) mod keys {
    pub const CURRENT_CONTENT: &str = "current_content_id";
    pub const LAST_SYNC: &str = "last_sync";
    pub const CREDENTIAL_HASH: &str = "credential_hash";
}
