pub mod ports;
pub mod services;

pub use services::{ConnectivityMonitor, ContentService, CredentialService, SyncService};
