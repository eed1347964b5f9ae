use crate::shared::error::AppError;
use async_trait::async_trait;
use serde_json::Value;

/// Remote delivery endpoints for device telemetry. Each call is a simple
/// request/response that may fail transiently; ordering guarantees live in the
/// sync orchestrator, not here.
#[async_trait]
pub trait EventDeliveryApi: Send + Sync {
    async fn report_heartbeat(&self, payload: &Value) -> Result<(), AppError>;
    async fn upload_screenshot(&self, payload: &Value) -> Result<(), AppError>;
    /// Playback and error events share the batch endpoint.
    async fn submit_playback_batch(&self, payload: &Value) -> Result<(), AppError>;
}
