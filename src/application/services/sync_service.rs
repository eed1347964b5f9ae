use crate::application::ports::delivery_api::EventDeliveryApi;
use crate::application::ports::local_store::LocalStore;
use crate::application::services::connectivity_service::ConnectivityMonitor;
use crate::application::services::keys;
use crate::domain::connectivity::ConnectivityState;
use crate::domain::entities::QueueEvent;
use crate::domain::value_objects::{Partition, QueueEventType};
use crate::infrastructure::database::mappers::device_state_record;
use crate::infrastructure::offline::OfflineEventQueue;
use crate::shared::config::{NetworkConfig, RetryConfig};
use crate::shared::error::AppError;
use crate::shared::retry::backoff;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub delivered: u64,
    pub superseded_heartbeats: u64,
    pub purged: u64,
    /// Per-type delivery failures: the event type whose drain stopped and the
    /// id it stopped at. Everything after a failed id stays queued in order;
    /// other types are unaffected.
    pub failed: Vec<(QueueEventType, i64)>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Drains the offline queue once connectivity returns. Per event type the
/// drain is strictly FIFO and stops at the first failure, since skipping ahead
/// would reorder the device's history. Each delivered event is marked synced
/// immediately, so a mid-drain crash never re-delivers.
pub struct SyncService {
    queue: Arc<OfflineEventQueue>,
    delivery: Arc<dyn EventDeliveryApi>,
    monitor: Arc<ConnectivityMonitor>,
    store: Arc<dyn LocalStore>,
    network: NetworkConfig,
    retry: RetryConfig,
    is_syncing: RwLock<bool>,
}

impl SyncService {
    pub fn new(
        queue: Arc<OfflineEventQueue>,
        delivery: Arc<dyn EventDeliveryApi>,
        monitor: Arc<ConnectivityMonitor>,
        store: Arc<dyn LocalStore>,
        network: NetworkConfig,
        retry: RetryConfig,
    ) -> Self {
        Self {
            queue,
            delivery,
            monitor,
            store,
            network,
            retry,
            is_syncing: RwLock::new(false),
        }
    }

    /// Listens for the offline-to-connected transition and drains. Returned
    /// handle is owned (and aborted) by the caller.
    pub fn spawn_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let service = Arc::clone(self);
        let mut rx = service.monitor.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) if event.is_back_online() => {
                        info!("connectivity restored; draining offline queue");
                        service.drain_with_retry().await;
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "connectivity events lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    /// One drain pass, retried with full-jitter backoff while deliveries keep
    /// failing and the device stays connected. Partial failure is expected
    /// steady-state during flaky connectivity, not an error.
    pub async fn drain_with_retry(&self) {
        for attempt in 0..=self.network.sync_max_retry {
            if attempt > 0 {
                let delay = backoff(attempt - 1, self.retry.base_delay_ms, self.retry.max_delay_ms);
                debug!(attempt, delay_ms = delay.as_millis() as u64, "retrying queue drain");
                tokio::time::sleep(delay).await;
            }
            if self.monitor.current().await != ConnectivityState::Connected {
                debug!("connectivity lost mid-drain; leaving queue for next trigger");
                return;
            }
            match self.drain().await {
                Ok(report) if report.is_clean() => return,
                Ok(report) => {
                    warn!(failed = ?report.failed, "queue drain stopped at failed delivery");
                }
                Err(err) => {
                    warn!(error = %err, "queue drain failed");
                }
            }
        }
    }

    pub async fn drain(&self) -> Result<SyncReport, AppError> {
        {
            let mut guard = self.is_syncing.write().await;
            if *guard {
                debug!("drain already in progress; skipping redundant trigger");
                return Ok(SyncReport::default());
            }
            *guard = true;
        }

        let result = self.drain_inner().await;
        *self.is_syncing.write().await = false;
        result
    }

    async fn drain_inner(&self) -> Result<SyncReport, AppError> {
        let mut report = SyncReport::default();

        // A queued heartbeat only ever said "this device is reachable"; the
        // live heartbeat that triggered this drain already said it better.
        let heartbeats = self.queue.pending(Some(QueueEventType::Heartbeat)).await?;
        if !heartbeats.is_empty() {
            let ids: Vec<i64> = heartbeats.iter().map(|e| e.id).collect();
            self.queue.mark_synced(&ids).await?;
            report.superseded_heartbeats = ids.len() as u64;
        }

        for event_type in QueueEventType::DELIVERED {
            let events = self.queue.pending(Some(event_type)).await?;
            for event in events {
                match self.deliver(&event).await {
                    Ok(()) => {
                        self.queue.mark_synced(&[event.id]).await?;
                        report.delivered += 1;
                    }
                    Err(err) => {
                        warn!(
                            event_type = %event_type,
                            id = event.id,
                            error = %err,
                            "delivery failed; remaining events of this type stay queued"
                        );
                        report.failed.push((event_type, event.id));
                        break;
                    }
                }
            }
        }

        if report.is_clean() {
            if let Err(err) = self
                .store
                .put(
                    Partition::DeviceState,
                    device_state_record(keys::LAST_SYNC, json!(Utc::now().timestamp_millis())),
                )
                .await
            {
                warn!(error = %err, "failed to record last sync time");
            }
            report.purged = self.queue.purge_synced().await?;
            info!(
                delivered = report.delivered,
                superseded = report.superseded_heartbeats,
                purged = report.purged,
                "offline queue drained"
            );
        }

        Ok(report)
    }

    async fn deliver(&self, event: &QueueEvent) -> Result<(), AppError> {
        match event.event_type {
            QueueEventType::Screenshot => self.delivery.upload_screenshot(&event.payload).await,
            QueueEventType::Playback | QueueEventType::Error => {
                self.delivery.submit_playback_batch(&event.payload).await
            }
            QueueEventType::Heartbeat => Ok(()),
        }
    }
}
