use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use marquee_core::{
    AppConfig, AppError, ContentHash, ContentId, EventDeliveryApi, MediaFetch, MediaUrl,
    PlayerState, QueueEventType, RemoteContentApi, ResolvedContent, ScenePayload,
};
use serde_json::{json, Value};
use tracing::info;

/// Manual end-to-end harness: runs the offline core against stub remote
/// endpoints whose failure behavior is steered from the command line, so
/// outage/recovery cycles can be watched in the logs.
///
///   cargo run --bin player_harness -- --run-seconds 120 --fail-after 3
#[derive(Debug, Clone)]
struct HarnessOptions {
    run_seconds: u64,
    /// After this many successful heartbeats the stub starts failing,
    /// simulating an outage; it recovers after `outage_calls` failed calls.
    fail_after: Option<u64>,
    outage_calls: u64,
}

impl HarnessOptions {
    fn parse() -> Self {
        let mut options = HarnessOptions {
            run_seconds: 60,
            fail_after: None,
            outage_calls: 5,
        };
        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--run-seconds" => {
                    if let Some(value) = args.next().and_then(|v| v.parse().ok()) {
                        options.run_seconds = value;
                    }
                }
                "--fail-after" => {
                    options.fail_after = args.next().and_then(|v| v.parse().ok());
                }
                "--outage-calls" => {
                    if let Some(value) = args.next().and_then(|v| v.parse().ok()) {
                        options.outage_calls = value;
                    }
                }
                other => {
                    eprintln!("unknown option: {other}");
                }
            }
        }
        options
    }
}

/// Shared failure switch for the stub endpoints.
struct OutagePlan {
    calls: AtomicU64,
    fail_after: Option<u64>,
    outage_calls: u64,
}

impl OutagePlan {
    fn should_fail(&self) -> bool {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        match self.fail_after {
            Some(fail_after) => call >= fail_after && call < fail_after + self.outage_calls,
            None => false,
        }
    }
}

struct StubContentApi {
    plan: Arc<OutagePlan>,
}

#[async_trait]
impl RemoteContentApi for StubContentApi {
    async fn resolve_content(&self, device_id: &str) -> Result<ResolvedContent, AppError> {
        if self.plan.should_fail() {
            return Err(AppError::Network("stub content endpoint down".into()));
        }
        Ok(ResolvedContent {
            content_id: ContentId::new("demo-scene".into()).expect("static id"),
            content_hash: ContentHash::new("hash-1".into()).expect("static hash"),
            media_hash: ContentHash::new("media-1".into()).expect("static hash"),
            media_urls: vec![MediaUrl::new("stub://logo.png".into()).expect("static url")],
            payload: ScenePayload::Playlist {
                items: vec![json!({"media": "stub://logo.png", "duration_secs": 10, "device": device_id})],
            },
        })
    }

    async fn has_content_changed(
        &self,
        _content_id: &ContentId,
        _known_hash: &ContentHash,
    ) -> Result<bool, AppError> {
        if self.plan.should_fail() {
            return Err(AppError::Network("stub content endpoint down".into()));
        }
        Ok(false)
    }

    async fn fetch_media(&self, _url: &MediaUrl) -> Result<MediaFetch, AppError> {
        Ok(MediaFetch {
            bytes: bytes::Bytes::from_static(b"stub-media-bytes"),
            mime_type: "image/png".into(),
        })
    }
}

struct StubDeliveryApi {
    plan: Arc<OutagePlan>,
}

#[async_trait]
impl EventDeliveryApi for StubDeliveryApi {
    async fn report_heartbeat(&self, _payload: &Value) -> Result<(), AppError> {
        if self.plan.should_fail() {
            return Err(AppError::Network("stub heartbeat endpoint down".into()));
        }
        Ok(())
    }

    async fn upload_screenshot(&self, payload: &Value) -> Result<(), AppError> {
        info!(payload = %payload, "stub screenshot upload");
        Ok(())
    }

    async fn submit_playback_batch(&self, payload: &Value) -> Result<(), AppError> {
        info!(payload = %payload, "stub playback batch");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    marquee_core::init_logging();
    let options = HarnessOptions::parse();
    info!(?options, "starting player harness");

    let plan = Arc::new(OutagePlan {
        calls: AtomicU64::new(0),
        fail_after: options.fail_after,
        outage_calls: options.outage_calls,
    });

    let mut config = AppConfig::from_env();
    if config.device_id.is_empty() {
        config.device_id = "harness-device".to_string();
    }
    config.database.url = "sqlite:data/harness.db".to_string();
    // Tight timings so an outage cycle fits in a short run.
    config.network.heartbeat_interval_secs = 2;
    config.network.offline_threshold_secs = 5;
    config.network.sync_interval_secs = 10;
    config.content.poll_interval_secs = 3;
    config.retry.base_delay_ms = 200;
    config.retry.max_delay_ms = 2_000;

    let player = PlayerState::new(
        config,
        Arc::new(StubContentApi { plan: plan.clone() }),
        Arc::new(StubDeliveryApi { plan }),
    )
    .await?;
    player.start().await;

    let mut events = player.on_connectivity_change();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            info!(from = %event.from, to = %event.to, "observed connectivity change");
        }
    });

    // Produce some telemetry while the loops run.
    player
        .queue_event(QueueEventType::Playback, json!({"event": "started"}))
        .await?;
    player
        .queue_event(QueueEventType::Screenshot, json!({"frame": 1}))
        .await?;

    tokio::time::sleep(Duration::from_secs(options.run_seconds)).await;

    let content = player.get_current_content().await?;
    let status = player.get_cache_status(&content.scene.id).await?;
    info!(
        content_id = %content.scene.id,
        degraded = content.is_degraded(),
        status = ?status.status,
        pending = ?player.pending_event_counts().await?,
        "harness run finished"
    );

    player.shutdown().await;
    Ok(())
}
