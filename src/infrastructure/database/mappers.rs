use crate::application::ports::local_store::StoredRecord;
use crate::domain::entities::{MediaEntry, QueueEvent, SceneEntry};
use crate::domain::value_objects::{ContentId, MediaUrl};
use crate::shared::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub fn scene_to_record(scene: &SceneEntry) -> Result<StoredRecord, AppError> {
    Ok(StoredRecord::new(
        scene.id.to_string(),
        serde_json::to_value(scene)?,
    ))
}

pub fn scene_from_record(record: &StoredRecord) -> Result<SceneEntry, AppError> {
    Ok(serde_json::from_value(record.fields.clone())?)
}

/// Media metadata document. The blob itself rides the record's `blob` column,
/// never the JSON.
#[derive(Debug, Serialize, Deserialize)]
struct MediaFields {
    url: MediaUrl,
    mime_type: String,
    size_bytes: u64,
    associated_content_id: Option<ContentId>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    cached_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    last_accessed_at: DateTime<Utc>,
}

pub fn media_to_record(media: &MediaEntry) -> Result<StoredRecord, AppError> {
    let fields = serde_json::to_value(MediaFields {
        url: media.url.clone(),
        mime_type: media.mime_type.clone(),
        size_bytes: media.size_bytes,
        associated_content_id: media.associated_content_id.clone(),
        cached_at: media.cached_at,
        last_accessed_at: media.last_accessed_at,
    })?;

    Ok(StoredRecord::with_blob(
        media.url.to_string(),
        fields,
        media.bytes.clone(),
    ))
}

pub fn media_from_record(record: &StoredRecord) -> Result<MediaEntry, AppError> {
    let fields: MediaFields = serde_json::from_value(record.fields.clone())?;
    let bytes = record
        .blob
        .clone()
        .ok_or_else(|| AppError::Serialization(format!("media record '{}' has no blob", record.key)))?;

    Ok(MediaEntry {
        url: fields.url,
        bytes,
        mime_type: fields.mime_type,
        size_bytes: fields.size_bytes,
        associated_content_id: fields.associated_content_id,
        cached_at: fields.cached_at,
        last_accessed_at: fields.last_accessed_at,
    })
}

pub fn queue_event_to_record(event: &QueueEvent) -> Result<StoredRecord, AppError> {
    Ok(StoredRecord::new(
        event.id.to_string(),
        serde_json::to_value(event)?,
    ))
}

pub fn queue_event_from_record(record: &StoredRecord) -> Result<QueueEvent, AppError> {
    Ok(serde_json::from_value(record.fields.clone())?)
}

/// Device-state records are tiny `{value, updated_at}` documents keyed by
/// name; they live outside the evictable partitions.
pub fn device_state_record(key: &str, value: Value) -> StoredRecord {
    StoredRecord::new(
        key.to_string(),
        serde_json::json!({
            "value": value,
            "updated_at": Utc::now().timestamp_millis(),
        }),
    )
}

pub fn device_state_value(record: &StoredRecord) -> Option<&Value> {
    record.fields.get("value")
}
