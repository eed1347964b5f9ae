use crate::domain::value_objects::QueueEventType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A telemetry event awaiting delivery. Ids are monotonic per device; within
/// one type, delivery never reorders events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueEvent {
    pub id: i64,
    pub event_type: QueueEventType,
    pub payload: Value,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    pub synced: bool,
    #[serde(with = "chrono::serde::ts_milliseconds_option", default)]
    pub synced_at: Option<DateTime<Utc>>,
}

impl QueueEvent {
    pub fn new(id: i64, event_type: QueueEventType, payload: Value, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            event_type,
            payload,
            created_at,
            synced: false,
            synced_at: None,
        }
    }
}
