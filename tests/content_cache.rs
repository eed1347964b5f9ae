mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::{setup_player, StubDelivery, StubRemote};
use marquee_core::{ContentId, ContentStatus};

#[tokio::test]
async fn cached_content_serves_through_an_outage() {
    let remote = Arc::new(StubRemote::new());
    let delivery = Arc::new(StubDelivery::new());
    let player = setup_player(remote.clone(), delivery).await;

    let content = player.get_current_content().await.unwrap();
    assert!(!content.is_degraded());
    assert_eq!(content.scene.content_hash.as_str(), "hash-1");

    // Endpoint goes dark: the reload degrades to the cached scene instead of
    // failing playback.
    remote.fail.store(true, Ordering::SeqCst);
    let content = player.force_reload().await.unwrap();
    assert!(content.is_degraded());
    assert_eq!(content.scene.content_hash.as_str(), "hash-1");

    let status = player
        .get_cache_status(&ContentId::new("scene-1".into()).unwrap())
        .await
        .unwrap();
    assert_eq!(status.status, ContentStatus::Ok);
    assert!(status.size_info.scene_bytes > 0);
    assert_eq!(status.size_info.media_entries, 1);

    player.shutdown().await;
}

#[tokio::test]
async fn server_side_edit_is_picked_up_on_reload() {
    let remote = Arc::new(StubRemote::new());
    let delivery = Arc::new(StubDelivery::new());
    let player = setup_player(remote.clone(), delivery).await;

    let content = player.get_current_content().await.unwrap();
    assert_eq!(content.scene.content_hash.as_str(), "hash-1");

    *remote.content_hash.lock().unwrap() = "hash-2".to_string();
    let content = player.force_reload().await.unwrap();
    assert!(!content.is_degraded());
    assert_eq!(content.scene.content_hash.as_str(), "hash-2");

    player.shutdown().await;
}

#[tokio::test]
async fn missing_content_reports_empty_status() {
    let remote = Arc::new(StubRemote::new());
    let delivery = Arc::new(StubDelivery::new());
    let player = setup_player(remote, delivery).await;

    let status = player
        .get_cache_status(&ContentId::new("never-cached".into()).unwrap())
        .await
        .unwrap();
    assert_eq!(status.status, ContentStatus::None);
    assert_eq!(status.size_info.media_entries, 0);

    player.shutdown().await;
}

#[tokio::test]
async fn credential_verifies_offline_after_caching() {
    let remote = Arc::new(StubRemote::new());
    let delivery = Arc::new(StubDelivery::new());
    let player = setup_player(remote, delivery).await;

    // Fresh device with no cached hash: only the legacy plaintext reference
    // can vouch for a candidate.
    assert!(!player
        .verify_offline_credential("admin123", None)
        .await
        .unwrap());
    assert!(player
        .verify_offline_credential("legacy-pin", Some("legacy-pin"))
        .await
        .unwrap());

    player.cache_credential_hash("admin123").await.unwrap();
    assert!(player
        .verify_offline_credential("admin123", None)
        .await
        .unwrap());
    assert!(!player
        .verify_offline_credential("wrong", None)
        .await
        .unwrap());

    player.shutdown().await;
}
