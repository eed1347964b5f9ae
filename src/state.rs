use crate::application::ports::content_api::RemoteContentApi;
use crate::application::ports::delivery_api::EventDeliveryApi;
use crate::application::ports::local_store::LocalStore;
use crate::application::services::{
    ConnectivityMonitor, ContentService, CredentialService, SyncService,
};
use crate::application::services::content_service::LoadedContent;
use crate::application::services::sync_service::SyncReport;
use crate::domain::connectivity::{ConnectivityEvent, ConnectivityState};
use crate::domain::entities::{CacheStatus, QueueEvent};
use crate::domain::value_objects::{ContentId, QueueEventType};
use crate::infrastructure::cache::EvictionManager;
use crate::infrastructure::database::{ConnectionPool, SqliteLocalStore};
use crate::infrastructure::offline::OfflineEventQueue;
use crate::shared::config::AppConfig;
use crate::shared::error::AppError;
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// The wired-up offline core: every component is constructed here and handed
/// its dependencies explicitly, with no global store handle or ambient state.
/// This is the surface the playback/UI layer talks to.
pub struct PlayerState {
    config: AppConfig,
    pool: ConnectionPool,
    monitor: Arc<ConnectivityMonitor>,
    queue: Arc<OfflineEventQueue>,
    content: Arc<ContentService>,
    sync: Arc<SyncService>,
    credentials: Arc<CredentialService>,
    delivery: Arc<dyn EventDeliveryApi>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl PlayerState {
    pub async fn new(
        config: AppConfig,
        remote: Arc<dyn RemoteContentApi>,
        delivery: Arc<dyn EventDeliveryApi>,
    ) -> Result<Self, AppError> {
        config.validate().map_err(AppError::Configuration)?;

        let pool = ConnectionPool::new(&config.database).await?;
        pool.migrate()
            .await
            .map_err(|err| AppError::Database(err.to_string()))?;

        let store: Arc<dyn LocalStore> = Arc::new(SqliteLocalStore::new(pool.get_pool().clone()));
        let eviction = Arc::new(EvictionManager::new(store.clone(), config.cache.clone()));
        let queue = Arc::new(OfflineEventQueue::new(store.clone()).await?);
        let monitor = Arc::new(ConnectivityMonitor::new(&config.network));
        let content = Arc::new(ContentService::new(
            store.clone(),
            remote,
            eviction,
            monitor.clone(),
            config.content.clone(),
            config.retry,
            config.device_id.clone(),
        ));
        let sync = Arc::new(SyncService::new(
            queue.clone(),
            delivery.clone(),
            monitor.clone(),
            store.clone(),
            config.network.clone(),
            config.retry,
        ));
        let credentials = Arc::new(CredentialService::new(store));

        Ok(Self {
            config,
            pool,
            monitor,
            queue,
            content,
            sync,
            credentials,
            delivery,
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Spawns the heartbeat loop, the content poll loop, the reconnect-drain
    /// listener, and the periodic drain. Idempotent; handles are kept so
    /// `shutdown` can tear the timers down.
    pub async fn start(&self) {
        let mut tasks = self.tasks.lock().await;
        if !tasks.is_empty() {
            return;
        }
        info!(device_id = %self.config.device_id, "starting offline core");
        tasks.push(self.sync.spawn_listener());
        tasks.push(self.spawn_heartbeat_loop());
        tasks.push(self.spawn_poll_loop());
        tasks.push(self.spawn_periodic_drain());
    }

    pub async fn shutdown(&self) {
        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }
        self.pool.close().await;
        info!("offline core stopped");
    }

    fn spawn_heartbeat_loop(&self) -> JoinHandle<()> {
        let monitor = self.monitor.clone();
        let delivery = self.delivery.clone();
        let queue = self.queue.clone();
        let device_id = self.config.device_id.clone();
        let interval = Duration::from_secs(self.config.network.heartbeat_interval_secs);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let payload = json!({
                    "device_id": device_id,
                    "at": Utc::now().timestamp_millis(),
                    "state": monitor.current().await,
                });
                match delivery.report_heartbeat(&payload).await {
                    Ok(()) => monitor.record_success().await,
                    Err(err) => {
                        warn!(error = %err, "heartbeat failed");
                        monitor.record_failure().await;
                        // The report could not be made live; it rides the
                        // queue instead.
                        if let Err(err) = queue.enqueue(QueueEventType::Heartbeat, payload).await {
                            warn!(error = %err, "failed to queue heartbeat event");
                        }
                    }
                }
            }
        })
    }

    fn spawn_poll_loop(&self) -> JoinHandle<()> {
        let content = self.content.clone();
        let interval = Duration::from_secs(self.config.content.poll_interval_secs);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; that is the initial load.
            loop {
                ticker.tick().await;
                content.poll_tick().await;
            }
        })
    }

    /// Events enqueued during a short reconnecting blip never see an
    /// offline-to-connected transition; the periodic drain picks them up.
    fn spawn_periodic_drain(&self) -> JoinHandle<()> {
        let sync = self.sync.clone();
        let queue = self.queue.clone();
        let monitor = self.monitor.clone();
        let interval = Duration::from_secs(self.config.network.sync_interval_secs);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // skip the immediate first tick
            loop {
                ticker.tick().await;
                if monitor.current().await != ConnectivityState::Connected {
                    continue;
                }
                match queue.pending(None).await {
                    Ok(pending) if !pending.is_empty() => sync.drain_with_retry().await,
                    Ok(_) => {}
                    Err(err) => warn!(error = %err, "periodic drain could not read queue"),
                }
            }
        })
    }

    // ---- facade ----

    pub async fn get_current_content(&self) -> Result<LoadedContent, AppError> {
        self.content.get_current_content().await
    }

    pub async fn force_reload(&self) -> Result<LoadedContent, AppError> {
        self.content.force_reload().await
    }

    pub async fn get_cache_status(&self, content_id: &ContentId) -> Result<CacheStatus, AppError> {
        self.content.cache_status(content_id).await
    }

    pub async fn queue_event(
        &self,
        event_type: QueueEventType,
        payload: Value,
    ) -> Result<QueueEvent, AppError> {
        self.queue.enqueue(event_type, payload).await
    }

    /// Dropping the receiver unsubscribes.
    pub fn on_connectivity_change(&self) -> broadcast::Receiver<ConnectivityEvent> {
        self.monitor.subscribe()
    }

    pub async fn connectivity(&self) -> ConnectivityState {
        self.monitor.current().await
    }

    /// Best-effort low-level network signal. Offline drops the monitor
    /// straight to offline; online is a hint the next heartbeat confirms.
    pub async fn network_changed(&self, online: bool) {
        if online {
            self.monitor.network_hint_online();
        } else {
            self.monitor.network_unreachable().await;
        }
    }

    pub async fn cache_credential_hash(&self, secret: &str) -> Result<(), AppError> {
        self.credentials.cache_credential_hash(secret).await
    }

    pub async fn verify_offline_credential(
        &self,
        candidate: &str,
        legacy_reference: Option<&str>,
    ) -> Result<bool, AppError> {
        self.credentials.verify_offline(candidate, legacy_reference).await
    }

    pub async fn drain_now(&self) -> Result<SyncReport, AppError> {
        self.sync.drain().await
    }

    pub async fn pending_event_counts(&self) -> Result<Vec<(QueueEventType, u64)>, AppError> {
        self.queue.pending_counts().await
    }
}
