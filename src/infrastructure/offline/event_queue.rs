use crate::application::ports::local_store::{IndexValue, LocalStore};
use crate::domain::entities::QueueEvent;
use crate::domain::value_objects::{Partition, QueueEventType};
use crate::infrastructure::database::mappers::{queue_event_from_record, queue_event_to_record};
use crate::shared::error::AppError;
use chrono::Utc;
use serde_json::Value;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Append-only queue of telemetry awaiting delivery. Growth is unbounded by
/// design: an offline device must never lose telemetry, so the only ceiling is
/// the device's storage itself.
pub struct OfflineEventQueue {
    store: Arc<dyn LocalStore>,
    next_id: AtomicI64,
}

impl OfflineEventQueue {
    /// Seeds the monotonic id counter from the partition's high-water mark, so
    /// ids stay increasing across restarts. Single-writer per device makes the
    /// atomic counter sufficient.
    pub async fn new(store: Arc<dyn LocalStore>) -> Result<Self, AppError> {
        let records = store.get_all(Partition::OfflineQueue).await?;
        let high_water = records
            .iter()
            .filter_map(|r| r.fields.get("id").and_then(Value::as_i64))
            .max()
            .unwrap_or(0);

        Ok(Self {
            store,
            next_id: AtomicI64::new(high_water + 1),
        })
    }

    pub async fn enqueue(
        &self,
        event_type: QueueEventType,
        payload: Value,
    ) -> Result<QueueEvent, AppError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let event = QueueEvent::new(id, event_type, payload, Utc::now());
        self.store
            .put(Partition::OfflineQueue, queue_event_to_record(&event)?)
            .await?;
        debug!(id, event_type = %event_type, "queued offline event");
        Ok(event)
    }

    /// Unsynced events in FIFO order (`created_at`, id as tie-break),
    /// optionally restricted to one type. An undecodable record cannot ever be
    /// delivered, so it is dropped with a warning rather than wedging the
    /// queue.
    pub async fn pending(
        &self,
        event_type: Option<QueueEventType>,
    ) -> Result<Vec<QueueEvent>, AppError> {
        let records = self
            .store
            .get_all_by_index(Partition::OfflineQueue, "synced", IndexValue::from(false))
            .await?;

        let mut events = Vec::with_capacity(records.len());
        for record in records {
            match queue_event_from_record(&record) {
                Ok(event) => events.push(event),
                Err(err) => {
                    warn!(key = %record.key, error = %err, "dropping undecodable queue record");
                    let _ = self.store.delete(Partition::OfflineQueue, &record.key).await;
                }
            }
        }

        if let Some(ty) = event_type {
            events.retain(|e| e.event_type == ty);
        }
        events.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(events)
    }

    pub async fn mark_synced(&self, ids: &[i64]) -> Result<(), AppError> {
        let now = Utc::now();
        for id in ids {
            let key = id.to_string();
            let Some(record) = self.store.get(Partition::OfflineQueue, &key).await? else {
                continue;
            };
            let mut event = queue_event_from_record(&record)?;
            event.synced = true;
            event.synced_at = Some(now);
            self.store
                .put(Partition::OfflineQueue, queue_event_to_record(&event)?)
                .await?;
        }
        Ok(())
    }

    /// Periodic housekeeping; not required for correctness.
    pub async fn purge_synced(&self) -> Result<u64, AppError> {
        let records = self
            .store
            .get_all_by_index(Partition::OfflineQueue, "synced", IndexValue::from(true))
            .await?;

        let mut purged = 0;
        for record in records {
            if self.store.delete(Partition::OfflineQueue, &record.key).await? {
                purged += 1;
            }
        }
        Ok(purged)
    }

    pub async fn pending_counts(&self) -> Result<Vec<(QueueEventType, u64)>, AppError> {
        let pending = self.pending(None).await?;
        let mut counts = Vec::new();
        for ty in [
            QueueEventType::Heartbeat,
            QueueEventType::Screenshot,
            QueueEventType::Playback,
            QueueEventType::Error,
        ] {
            let count = pending.iter().filter(|e| e.event_type == ty).count() as u64;
            if count > 0 {
                counts.push((ty, count));
            }
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::connection_pool::ConnectionPool;
    use crate::infrastructure::database::sqlite_store::SqliteLocalStore;
    use serde_json::json;

    async fn setup_queue() -> (OfflineEventQueue, Arc<dyn LocalStore>) {
        let pool = ConnectionPool::from_memory().await.unwrap();
        pool.migrate().await.unwrap();
        let store: Arc<dyn LocalStore> = Arc::new(SqliteLocalStore::new(pool.get_pool().clone()));
        (OfflineEventQueue::new(store.clone()).await.unwrap(), store)
    }

    #[tokio::test]
    async fn enqueue_assigns_increasing_ids() {
        let (queue, _) = setup_queue().await;
        let a = queue
            .enqueue(QueueEventType::Playback, json!({"n": 1}))
            .await
            .unwrap();
        let b = queue
            .enqueue(QueueEventType::Playback, json!({"n": 2}))
            .await
            .unwrap();
        assert!(b.id > a.id);
        assert!(!a.synced);
    }

    #[tokio::test]
    async fn id_counter_survives_restart() {
        let (queue, store) = setup_queue().await;
        let last = queue
            .enqueue(QueueEventType::Error, json!({}))
            .await
            .unwrap();

        let reopened = OfflineEventQueue::new(store).await.unwrap();
        let next = reopened
            .enqueue(QueueEventType::Error, json!({}))
            .await
            .unwrap();
        assert!(next.id > last.id);
    }

    #[tokio::test]
    async fn pending_is_fifo_and_filterable() {
        let (queue, _) = setup_queue().await;
        queue
            .enqueue(QueueEventType::Playback, json!({"n": 1}))
            .await
            .unwrap();
        queue
            .enqueue(QueueEventType::Screenshot, json!({"n": 2}))
            .await
            .unwrap();
        queue
            .enqueue(QueueEventType::Playback, json!({"n": 3}))
            .await
            .unwrap();

        let playback = queue.pending(Some(QueueEventType::Playback)).await.unwrap();
        assert_eq!(playback.len(), 2);
        assert!(playback[0].id < playback[1].id);
        assert_eq!(playback[0].payload["n"], 1);

        let all = queue.pending(None).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn mark_synced_flips_flag_and_stamps_time() {
        let (queue, _) = setup_queue().await;
        let a = queue
            .enqueue(QueueEventType::Screenshot, json!({}))
            .await
            .unwrap();
        let b = queue
            .enqueue(QueueEventType::Screenshot, json!({}))
            .await
            .unwrap();

        queue.mark_synced(&[a.id]).await.unwrap();

        let remaining = queue.pending(Some(QueueEventType::Screenshot)).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, b.id);
    }

    #[tokio::test]
    async fn purge_removes_only_synced_events() {
        let (queue, store) = setup_queue().await;
        let a = queue
            .enqueue(QueueEventType::Playback, json!({}))
            .await
            .unwrap();
        queue
            .enqueue(QueueEventType::Playback, json!({}))
            .await
            .unwrap();
        queue.mark_synced(&[a.id]).await.unwrap();

        let purged = queue.purge_synced().await.unwrap();
        assert_eq!(purged, 1);
        assert_eq!(store.count(Partition::OfflineQueue).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn undecodable_record_is_dropped_not_fatal() {
        let (queue, store) = setup_queue().await;
        queue
            .enqueue(QueueEventType::Playback, json!({}))
            .await
            .unwrap();
        store
            .put(
                Partition::OfflineQueue,
                crate::application::ports::local_store::StoredRecord::new(
                    "garbage".into(),
                    json!({"synced": false, "event_type": "telemetry"}),
                ),
            )
            .await
            .unwrap();

        let pending = queue.pending(None).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert!(store
            .get(Partition::OfflineQueue, "garbage")
            .await
            .unwrap()
            .is_none());
    }
}
