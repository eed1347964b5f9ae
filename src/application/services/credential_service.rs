use crate::application::ports::local_store::LocalStore;
use crate::application::services::keys;
use crate::domain::value_objects::Partition;
use crate::infrastructure::crypto::sha256_hex;
use crate::infrastructure::database::mappers::{device_state_record, device_state_value};
use crate::shared::error::AppError;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Verifies the kiosk-exit credential without network access. The one-way
/// hash lives in device state, which is never evicted. No lockout on repeated
/// failures: physical access to the device is the real gate.
pub struct CredentialService {
    store: Arc<dyn LocalStore>,
}

impl CredentialService {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    /// Caching a new secret invalidates every previously valid candidate.
    pub async fn cache_credential_hash(&self, secret: &str) -> Result<(), AppError> {
        let digest = sha256_hex(secret);
        self.store
            .put(
                Partition::DeviceState,
                device_state_record(keys::CREDENTIAL_HASH, Value::String(digest)),
            )
            .await?;
        info!("offline credential hash updated");
        Ok(())
    }

    /// `true` iff the candidate hashes to the cached digest. With no cached
    /// digest, an optionally provided plaintext reference is compared directly:
    /// the pre-hash compatibility path, kept loud in the logs.
    pub async fn verify_offline(
        &self,
        candidate: &str,
        legacy_reference: Option<&str>,
    ) -> Result<bool, AppError> {
        if let Some(record) = self.store.get(Partition::DeviceState, keys::CREDENTIAL_HASH).await? {
            if let Some(cached) = device_state_value(&record).and_then(Value::as_str) {
                return Ok(cached == sha256_hex(candidate));
            }
        }

        match legacy_reference {
            Some(reference) => {
                warn!("no cached credential hash; falling back to plaintext comparison");
                Ok(candidate == reference)
            }
            None => Ok(false),
        }
    }
}
