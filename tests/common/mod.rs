use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use marquee_core::{
    AppConfig, AppError, ContentHash, ContentId, EventDeliveryApi, MediaFetch, MediaUrl,
    PlayerState, RemoteContentApi, ResolvedContent, ScenePayload,
};
use serde_json::{json, Value};

/// Remote content stub: one scene whose hash can be swapped to simulate a
/// server-side edit, and a failure switch to simulate an outage.
pub struct StubRemote {
    pub fail: Arc<AtomicBool>,
    pub content_hash: Arc<Mutex<String>>,
}

impl StubRemote {
    pub fn new() -> Self {
        Self {
            fail: Arc::new(AtomicBool::new(false)),
            content_hash: Arc::new(Mutex::new("hash-1".to_string())),
        }
    }
}

#[async_trait]
impl RemoteContentApi for StubRemote {
    async fn resolve_content(&self, _device_id: &str) -> Result<ResolvedContent, AppError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Network("content endpoint unreachable".into()));
        }
        let hash = self.content_hash.lock().unwrap().clone();
        Ok(ResolvedContent {
            content_id: ContentId::new("scene-1".into()).unwrap(),
            content_hash: ContentHash::new(hash.clone()).unwrap(),
            media_hash: ContentHash::new(format!("media-{hash}")).unwrap(),
            media_urls: vec![MediaUrl::new("https://cdn/logo.png".into()).unwrap()],
            payload: ScenePayload::Playlist {
                items: vec![json!({"media": "https://cdn/logo.png", "duration_secs": 10})],
            },
        })
    }

    async fn has_content_changed(
        &self,
        _content_id: &ContentId,
        known_hash: &ContentHash,
    ) -> Result<bool, AppError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Network("content endpoint unreachable".into()));
        }
        Ok(known_hash.as_str() != *self.content_hash.lock().unwrap())
    }

    async fn fetch_media(&self, _url: &MediaUrl) -> Result<MediaFetch, AppError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Network("media endpoint unreachable".into()));
        }
        Ok(MediaFetch {
            bytes: Bytes::from_static(b"stub-media"),
            mime_type: "image/png".into(),
        })
    }
}

/// Delivery stub recording what was sent; heartbeats and uploads fail on
/// their respective switches, and `fail_on_n` rejects a payload whose `n`
/// field matches (for order-preservation scenarios).
pub struct StubDelivery {
    pub fail_heartbeat: Arc<AtomicBool>,
    pub fail_uploads: Arc<AtomicBool>,
    pub fail_on_n: Arc<Mutex<Option<i64>>>,
    pub delivered: Arc<Mutex<Vec<(String, Value)>>>,
}

impl StubDelivery {
    pub fn new() -> Self {
        Self {
            fail_heartbeat: Arc::new(AtomicBool::new(false)),
            fail_uploads: Arc::new(AtomicBool::new(false)),
            fail_on_n: Arc::new(Mutex::new(None)),
            delivered: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn check(&self, payload: &Value) -> Result<(), AppError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(AppError::Network("delivery endpoint unreachable".into()));
        }
        if let Some(n) = *self.fail_on_n.lock().unwrap() {
            if payload.get("n").and_then(Value::as_i64) == Some(n) {
                return Err(AppError::Network(format!("rejected payload n={n}")));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl EventDeliveryApi for StubDelivery {
    async fn report_heartbeat(&self, _payload: &Value) -> Result<(), AppError> {
        if self.fail_heartbeat.load(Ordering::SeqCst) {
            return Err(AppError::Network("heartbeat endpoint unreachable".into()));
        }
        Ok(())
    }

    async fn upload_screenshot(&self, payload: &Value) -> Result<(), AppError> {
        self.check(payload)?;
        self.delivered
            .lock()
            .unwrap()
            .push(("screenshot".into(), payload.clone()));
        Ok(())
    }

    async fn submit_playback_batch(&self, payload: &Value) -> Result<(), AppError> {
        self.check(payload)?;
        self.delivered
            .lock()
            .unwrap()
            .push(("playback".into(), payload.clone()));
        Ok(())
    }
}

/// In-memory database, one connection (each connection to `:memory:` is its
/// own database), timings tightened so outage cycles fit in a test run.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.device_id = "device-under-test".to_string();
    config.database.url = "sqlite::memory:".to_string();
    config.database.max_connections = 1;
    config.network.heartbeat_interval_secs = 1;
    config.network.offline_threshold_secs = 1;
    config.network.sync_interval_secs = 2;
    config.content.poll_interval_secs = 1;
    config.retry.base_delay_ms = 1;
    config.retry.max_delay_ms = 10;
    config
}

pub async fn setup_player(
    remote: Arc<StubRemote>,
    delivery: Arc<StubDelivery>,
) -> PlayerState {
    PlayerState::new(test_config(), remote, delivery)
        .await
        .expect("player state")
}
