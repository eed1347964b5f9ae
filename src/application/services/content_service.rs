use crate::application::ports::content_api::RemoteContentApi;
use crate::application::ports::local_store::{IndexValue, LocalStore};
use crate::application::services::keys;
use crate::application::services::connectivity_service::ConnectivityMonitor;
use crate::domain::entities::{
    CacheSizeInfo, CacheStatus, ContentStatus, MediaEntry, SceneEntry,
};
use crate::domain::value_objects::{ContentId, Partition};
use crate::infrastructure::cache::EvictionManager;
use crate::infrastructure::database::mappers::{
    device_state_record, device_state_value, media_to_record, scene_from_record, scene_to_record,
};
use crate::shared::config::{ContentConfig, RetryConfig};
use crate::shared::error::AppError;
use crate::shared::retry::backoff;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Poll failures tolerated before the connectivity monitor is told something
/// is wrong and a retrying reload is attempted.
const POLL_FAILURE_ESCALATION: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentSource {
    Remote,
    Cache,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedContent {
    pub scene: SceneEntry,
    pub source: ContentSource,
}

impl LoadedContent {
    /// Cache-served content is a degraded result: playable, but possibly
    /// behind the server.
    pub fn is_degraded(&self) -> bool {
        self.source == ContentSource::Cache
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    pub use_retry: bool,
}

/// Resolves the device's current content: remote-first, cache on failure.
/// Caching is best-effort; a storage failure is logged and playback carries
/// on from memory.
pub struct ContentService {
    store: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteContentApi>,
    eviction: Arc<EvictionManager>,
    monitor: Arc<ConnectivityMonitor>,
    config: ContentConfig,
    retry: RetryConfig,
    device_id: String,
    current: RwLock<Option<LoadedContent>>,
    poll_failures: AtomicU32,
}

impl ContentService {
    pub fn new(
        store: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteContentApi>,
        eviction: Arc<EvictionManager>,
        monitor: Arc<ConnectivityMonitor>,
        config: ContentConfig,
        retry: RetryConfig,
        device_id: String,
    ) -> Self {
        Self {
            store,
            remote,
            eviction,
            monitor,
            config,
            retry,
            device_id,
            current: RwLock::new(None),
            poll_failures: AtomicU32::new(0),
        }
    }

    pub async fn current_content(&self) -> Option<LoadedContent> {
        self.current.read().await.clone()
    }

    /// The playback layer's entry point: hand back what we have, loading on
    /// first use.
    pub async fn get_current_content(&self) -> Result<LoadedContent, AppError> {
        if let Some(content) = self.current_content().await {
            return Ok(content);
        }
        self.load(LoadOptions::default()).await
    }

    pub async fn force_reload(&self) -> Result<LoadedContent, AppError> {
        self.load(LoadOptions { use_retry: true }).await
    }

    /// Remote-first load. With `use_retry`, failed fetches are retried up to
    /// the configured ceiling with full-jitter delays; when attempts exhaust
    /// (or retry is off), the cached entry is served as a degraded result; with
    /// no cached entry the last error propagates.
    pub async fn load(&self, options: LoadOptions) -> Result<LoadedContent, AppError> {
        let attempts = if options.use_retry {
            self.config.max_retry_attempts.max(1)
        } else {
            1
        };

        let mut last_error: Option<AppError> = None;
        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = backoff(attempt - 1, self.retry.base_delay_ms, self.retry.max_delay_ms);
                debug!(attempt, delay_ms = delay.as_millis() as u64, "retrying content fetch");
                tokio::time::sleep(delay).await;
            }
            match self.fetch_and_cache().await {
                Ok(scene) => {
                    let content = LoadedContent {
                        scene,
                        source: ContentSource::Remote,
                    };
                    *self.current.write().await = Some(content.clone());
                    return Ok(content);
                }
                Err(err) => {
                    warn!(attempt, error = %err, "content fetch failed");
                    last_error = Some(err);
                }
            }
        }

        match self.cached_fallback().await? {
            Some(content) => {
                info!(content_id = %content.scene.id, "serving cached content after fetch failure");
                *self.current.write().await = Some(content.clone());
                Ok(content)
            }
            None => Err(last_error
                .unwrap_or_else(|| AppError::Internal("content load failed without error".into()))),
        }
    }

    /// Lightweight staleness probe against the server. A changed hash marks
    /// the cached entry stale, then refetches; the flag stays set until the
    /// refresh lands.
    pub async fn check_for_update(&self) -> Result<LoadedContent, AppError> {
        let Some(cached) = self.cached_scene().await? else {
            return self.load(LoadOptions::default()).await;
        };

        let changed = self
            .remote
            .has_content_changed(&cached.id, &cached.content_hash)
            .await?;
        if !changed {
            return self.get_current_content().await;
        }

        info!(content_id = %cached.id, "cached content is stale; refreshing");
        self.mark_stale(&cached).await;
        self.load(LoadOptions::default()).await
    }

    /// One poll-loop tick. Three consecutive failures feed the connectivity
    /// monitor and trigger one retrying reload.
    pub async fn poll_tick(&self) {
        match self.check_for_update().await {
            Ok(_) => {
                self.poll_failures.store(0, Ordering::SeqCst);
            }
            Err(err) => {
                let failures = self.poll_failures.fetch_add(1, Ordering::SeqCst) + 1;
                warn!(failures, error = %err, "content poll failed");
                if failures >= POLL_FAILURE_ESCALATION {
                    self.poll_failures.store(0, Ordering::SeqCst);
                    self.monitor.record_failure().await;
                    if let Err(err) = self.load(LoadOptions { use_retry: true }).await {
                        warn!(error = %err, "retrying reload after poll failures also failed");
                    }
                }
            }
        }
    }

    pub async fn cache_status(&self, content_id: &ContentId) -> Result<CacheStatus, AppError> {
        let Some(record) = self.store.get(Partition::Scenes, content_id.as_str()).await? else {
            return Ok(CacheStatus::missing());
        };
        let scene = match scene_from_record(&record) {
            Ok(scene) => scene,
            Err(_) => return Ok(CacheStatus::missing()),
        };

        let media = self
            .store
            .get_all_by_index(
                Partition::Media,
                "associated_content_id",
                IndexValue::from(content_id.as_str()),
            )
            .await?;
        let media_bytes: u64 = media.iter().map(|r| r.size_bytes()).sum();

        Ok(CacheStatus {
            status: if scene.is_stale {
                ContentStatus::Stale
            } else {
                ContentStatus::Ok
            },
            last_sync: self.last_sync().await?,
            size_info: CacheSizeInfo {
                scene_bytes: record.size_bytes(),
                media_bytes,
                media_entries: media.len() as u64,
            },
        })
    }

    async fn last_sync(&self) -> Result<Option<DateTime<Utc>>, AppError> {
        let Some(record) = self.store.get(Partition::DeviceState, keys::LAST_SYNC).await? else {
            return Ok(None);
        };
        Ok(device_state_value(&record)
            .and_then(Value::as_i64)
            .and_then(DateTime::from_timestamp_millis))
    }

    async fn fetch_and_cache(&self) -> Result<SceneEntry, AppError> {
        let resolved = self.remote.resolve_content(&self.device_id).await?;
        let now = Utc::now();

        let previous = self.cached_scene_by_id(&resolved.content_id).await?;
        let scene = SceneEntry::new(
            resolved.content_id.clone(),
            resolved.payload,
            resolved.content_hash,
            resolved.media_hash,
            resolved.media_urls.clone(),
            now,
        );

        self.persist_scene(&scene).await;

        let media_set_changed = previous
            .as_ref()
            .map(|prev| prev.media_hash != scene.media_hash)
            .unwrap_or(true);
        self.cache_media(&scene, media_set_changed).await;
        self.drop_unreferenced_media(&scene).await;

        if let Err(err) = self
            .store
            .put(
                Partition::DeviceState,
                device_state_record(keys::CURRENT_CONTENT, Value::String(scene.id.to_string())),
            )
            .await
        {
            warn!(error = %err, "failed to persist current content id");
        }

        Ok(scene)
    }

    /// Cache writes never fail the load: the fetched scene is playable from
    /// memory regardless.
    async fn persist_scene(&self, scene: &SceneEntry) {
        match self.eviction.enforce(Partition::Scenes).await {
            Ok(report) if report.evicted_count > 0 => {
                debug!(evicted = report.evicted_count, "scene eviction before write");
            }
            Ok(_) => {}
            Err(err) => warn!(error = %err, "scene eviction pass failed"),
        }

        match scene_to_record(scene) {
            Ok(record) => {
                let approx_size = record.size_bytes();
                if let Err(err) = self.store.put(Partition::Scenes, record).await {
                    warn!(
                        key = %scene.id,
                        approx_size,
                        error = %err,
                        "failed to cache scene"
                    );
                }
            }
            Err(err) => warn!(key = %scene.id, error = %err, "failed to encode scene"),
        }
    }

    async fn cache_media(&self, scene: &SceneEntry, media_set_changed: bool) {
        for url in &scene.referenced_media_urls {
            if !media_set_changed {
                match self.store.get(Partition::Media, url.as_str()).await {
                    Ok(Some(_)) => continue,
                    Ok(None) => {}
                    Err(err) => {
                        warn!(url = %url, error = %err, "media cache lookup failed");
                    }
                }
            }

            let fetch = match self.remote.fetch_media(url).await {
                Ok(fetch) => fetch,
                Err(err) => {
                    warn!(url = %url, error = %err, "media fetch failed; continuing without it");
                    continue;
                }
            };

            if let Err(err) = self.eviction.enforce(Partition::Media).await {
                warn!(error = %err, "media eviction pass failed");
            }

            let entry = MediaEntry::new(
                url.clone(),
                fetch.bytes,
                fetch.mime_type,
                Some(scene.id.clone()),
                Utc::now(),
            );
            let approx_size = entry.size_bytes;
            match media_to_record(&entry) {
                Ok(record) => {
                    if let Err(err) = self.store.put(Partition::Media, record).await {
                        warn!(url = %url, approx_size, error = %err, "failed to cache media");
                    }
                }
                Err(err) => warn!(url = %url, error = %err, "failed to encode media entry"),
            }
        }
    }

    /// Media rows from an older revision of this scene that the new one no
    /// longer references are dead weight; drop them with the refresh.
    async fn drop_unreferenced_media(&self, scene: &SceneEntry) {
        let referenced: HashSet<&str> = scene
            .referenced_media_urls
            .iter()
            .map(|url| url.as_str())
            .collect();

        let associated = match self
            .store
            .get_all_by_index(
                Partition::Media,
                "associated_content_id",
                IndexValue::from(scene.id.as_str()),
            )
            .await
        {
            Ok(records) => records,
            Err(err) => {
                warn!(error = %err, "could not list associated media for cleanup");
                return;
            }
        };

        for record in associated {
            if !referenced.contains(record.key.as_str()) {
                if let Err(err) = self.store.delete(Partition::Media, &record.key).await {
                    warn!(key = %record.key, error = %err, "failed to drop unreferenced media");
                }
            }
        }
    }

    async fn mark_stale(&self, scene: &SceneEntry) {
        let mut stale = scene.clone();
        stale.is_stale = true;
        match scene_to_record(&stale) {
            Ok(record) => {
                if let Err(err) = self.store.put(Partition::Scenes, record).await {
                    warn!(key = %scene.id, error = %err, "failed to flag scene stale");
                }
            }
            Err(err) => warn!(key = %scene.id, error = %err, "failed to encode stale scene"),
        }
    }

    async fn cached_scene(&self) -> Result<Option<SceneEntry>, AppError> {
        let Some(record) = self.store.get(Partition::DeviceState, keys::CURRENT_CONTENT).await?
        else {
            return Ok(None);
        };
        let Some(content_id) = device_state_value(&record).and_then(Value::as_str) else {
            return Ok(None);
        };
        self.cached_scene_by_id_str(content_id).await
    }

    async fn cached_scene_by_id(&self, id: &ContentId) -> Result<Option<SceneEntry>, AppError> {
        self.cached_scene_by_id_str(id.as_str()).await
    }

    /// Corrupt cached records are a cache miss: deleted here, refetched by the
    /// caller.
    async fn cached_scene_by_id_str(&self, id: &str) -> Result<Option<SceneEntry>, AppError> {
        let Some(record) = self.store.get(Partition::Scenes, id).await? else {
            return Ok(None);
        };
        match scene_from_record(&record) {
            Ok(scene) => Ok(Some(scene)),
            Err(err) => {
                warn!(key = %id, error = %err, "corrupt scene record; treating as cache miss");
                let _ = self.store.delete(Partition::Scenes, id).await;
                Ok(None)
            }
        }
    }

    async fn cached_fallback(&self) -> Result<Option<LoadedContent>, AppError> {
        let Some(scene) = self.cached_scene().await? else {
            return Ok(None);
        };
        if let Err(err) = self
            .store
            .touch(Partition::Scenes, scene.id.as_str(), Utc::now())
            .await
        {
            warn!(key = %scene.id, error = %err, "failed to touch cached scene");
        }
        Ok(Some(LoadedContent {
            scene,
            source: ContentSource::Cache,
        }))
    }
}
