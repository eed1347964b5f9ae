use crate::application::ports::local_store::{IndexValue, LocalStore, StoredRecord};
use crate::domain::value_objects::{ContentId, Partition};
use crate::shared::config::{CacheConfig, PartitionLimits};
use crate::shared::error::AppError;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvictionReport {
    pub evicted_count: u64,
    pub freed_bytes: u64,
}

/// Keeps the evictable partitions within their byte and entry ceilings.
/// Runs before every write into such a partition; idempotent and safe to call
/// redundantly. Evicts down to 90% of each limit so the very next write does
/// not re-trigger a full pass.
pub struct EvictionManager {
    store: Arc<dyn LocalStore>,
    config: CacheConfig,
}

struct Candidate {
    key: String,
    size: u64,
    accessed_at: i64,
}

impl EvictionManager {
    pub fn new(store: Arc<dyn LocalStore>, config: CacheConfig) -> Self {
        Self { store, config }
    }

    fn limits(&self, partition: Partition) -> Option<PartitionLimits> {
        match partition {
            Partition::Scenes => Some(self.config.scenes),
            Partition::Media => Some(self.config.media),
            _ => None,
        }
    }

    pub async fn enforce(&self, partition: Partition) -> Result<EvictionReport, AppError> {
        let Some(limits) = self.limits(partition) else {
            return Ok(EvictionReport::default());
        };

        let records = self.store.get_all(partition).await?;
        let mut candidates: Vec<Candidate> = records.iter().map(candidate_from_record).collect();
        let total_bytes: u64 = candidates.iter().map(|c| c.size).sum();
        let total_entries = candidates.len() as u64;

        if total_bytes <= limits.max_bytes && total_entries <= limits.max_entries {
            return Ok(EvictionReport::default());
        }

        // Least recently used first; key order breaks timestamp ties so the
        // pass is deterministic.
        candidates.sort_by(|a, b| {
            a.accessed_at
                .cmp(&b.accessed_at)
                .then_with(|| a.key.cmp(&b.key))
        });

        // Rounded up: with small limits a floor would over-evict (a 3-entry
        // ceiling must keep 3 entries, not 2).
        let byte_target = div_ceil(limits.max_bytes * 9, 10);
        let entry_target = div_ceil(limits.max_entries * 9, 10);

        let mut report = EvictionReport::default();
        let mut remaining_bytes = total_bytes;
        let mut remaining_entries = total_entries;

        for candidate in &candidates {
            if remaining_bytes <= byte_target && remaining_entries <= entry_target {
                break;
            }
            if !self.store.delete(partition, &candidate.key).await? {
                continue;
            }
            debug!(
                partition = %partition,
                key = %candidate.key,
                size = candidate.size,
                "evicted cache entry"
            );
            report.evicted_count += 1;
            report.freed_bytes += candidate.size;
            remaining_bytes = remaining_bytes.saturating_sub(candidate.size);
            remaining_entries -= 1;

            // A deleted scene takes its media with it; cascaded media count
            // toward freed bytes but not toward the partition's evicted count.
            if partition == Partition::Scenes {
                report.freed_bytes += self.delete_associated_media(&candidate.key).await?;
            }
        }

        info!(
            partition = %partition,
            evicted = report.evicted_count,
            freed_bytes = report.freed_bytes,
            "eviction pass complete"
        );
        Ok(report)
    }

    /// Deletes a scene and all media associated with it. Used both by the
    /// eviction pass and when a server-side content deletion propagates.
    pub async fn cascade_delete_scene(&self, content_id: &ContentId) -> Result<u64, AppError> {
        let mut freed = 0;
        if let Some(record) = self.store.get(Partition::Scenes, content_id.as_str()).await? {
            if self.store.delete(Partition::Scenes, content_id.as_str()).await? {
                freed += record.size_bytes();
            }
        }
        freed += self.delete_associated_media(content_id.as_str()).await?;
        Ok(freed)
    }

    async fn delete_associated_media(&self, content_id: &str) -> Result<u64, AppError> {
        let media = self
            .store
            .get_all_by_index(
                Partition::Media,
                "associated_content_id",
                IndexValue::from(content_id),
            )
            .await?;

        let mut freed = 0;
        for record in media {
            if self.store.delete(Partition::Media, &record.key).await? {
                freed += record.size_bytes();
            }
        }
        Ok(freed)
    }
}

fn div_ceil(value: u64, divisor: u64) -> u64 {
    (value + divisor - 1) / divisor
}

fn candidate_from_record(record: &StoredRecord) -> Candidate {
    let accessed_at = record
        .fields
        .get("last_accessed_at")
        .and_then(Value::as_i64)
        .or_else(|| record.fields.get("cached_at").and_then(Value::as_i64))
        .unwrap_or(0);

    Candidate {
        key: record.key.clone(),
        size: record.size_bytes(),
        accessed_at,
    }
}
