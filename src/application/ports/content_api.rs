use crate::domain::entities::ScenePayload;
use crate::domain::value_objects::{ContentHash, ContentId, MediaUrl};
use crate::shared::error::AppError;
use async_trait::async_trait;
use bytes::Bytes;

/// What the remote content endpoint resolves for a device: the scene it should
/// currently play plus the integrity hashes used for staleness checks.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedContent {
    pub content_id: ContentId,
    pub content_hash: ContentHash,
    pub media_hash: ContentHash,
    pub media_urls: Vec<MediaUrl>,
    pub payload: ScenePayload,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaFetch {
    pub bytes: Bytes,
    pub mime_type: String,
}

/// Remote content resolution. The wire format is the host's concern; failures
/// are reported as `AppError::Network` so the loader can retry or degrade.
#[async_trait]
pub trait RemoteContentApi: Send + Sync {
    async fn resolve_content(&self, device_id: &str) -> Result<ResolvedContent, AppError>;
    /// Lightweight staleness probe comparing a cached hash to the server's
    /// current one.
    async fn has_content_changed(
        &self,
        content_id: &ContentId,
        known_hash: &ContentHash,
    ) -> Result<bool, AppError>;
    async fn fetch_media(&self, url: &MediaUrl) -> Result<MediaFetch, AppError>;
}
