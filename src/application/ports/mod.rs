pub mod content_api;
pub mod delivery_api;
pub mod local_store;

pub use content_api::{MediaFetch, RemoteContentApi, ResolvedContent};
pub use delivery_api::EventDeliveryApi;
pub use local_store::{IndexValue, LocalStore, StoredRecord};
