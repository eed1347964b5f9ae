use crate::domain::value_objects::Partition;
use crate::shared::error::AppError;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// A record as the store sees it: a canonical JSON document plus an optional
/// out-of-band blob (media payloads are not base64'd into the JSON).
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub key: String,
    pub fields: Value,
    pub blob: Option<Bytes>,
}

impl StoredRecord {
    pub fn new(key: String, fields: Value) -> Self {
        Self {
            key,
            fields,
            blob: None,
        }
    }

    pub fn with_blob(key: String, fields: Value, blob: Bytes) -> Self {
        Self {
            key,
            fields,
            blob: Some(blob),
        }
    }

    /// Entry size for eviction accounting: the explicit `size_bytes` field
    /// when the record carries one, otherwise the serialized record length
    /// plus the blob length.
    pub fn size_bytes(&self) -> u64 {
        if let Some(size) = self.fields.get("size_bytes").and_then(Value::as_u64) {
            return size;
        }
        let fields_len = self.fields.to_string().len() as u64;
        let blob_len = self.blob.as_ref().map(|b| b.len() as u64).unwrap_or(0);
        fields_len + blob_len
    }
}

/// Values a secondary index can be queried with.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexValue {
    Text(String),
    Integer(i64),
    Boolean(bool),
}

impl From<&str> for IndexValue {
    fn from(value: &str) -> Self {
        IndexValue::Text(value.to_string())
    }
}

impl From<i64> for IndexValue {
    fn from(value: i64) -> Self {
        IndexValue::Integer(value)
    }
}

impl From<bool> for IndexValue {
    fn from(value: bool) -> Self {
        IndexValue::Boolean(value)
    }
}

/// Durable key-indexed storage with named partitions. The single shared
/// mutable resource of the crate; one writer process per device is assumed.
/// Failures surface to the caller, who decides whether to log-and-continue
/// or escalate.
#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn put(&self, partition: Partition, record: StoredRecord) -> Result<(), AppError>;
    async fn get(&self, partition: Partition, key: &str) -> Result<Option<StoredRecord>, AppError>;
    /// Returns whether a row was actually removed.
    async fn delete(&self, partition: Partition, key: &str) -> Result<bool, AppError>;
    async fn get_all(&self, partition: Partition) -> Result<Vec<StoredRecord>, AppError>;
    /// `index` must name one of the partition's declared secondary indices.
    async fn get_all_by_index(
        &self,
        partition: Partition,
        index: &str,
        value: IndexValue,
    ) -> Result<Vec<StoredRecord>, AppError>;
    /// Updates the record's `last_accessed_at` field in place.
    async fn touch(&self, partition: Partition, key: &str, at: DateTime<Utc>)
        -> Result<(), AppError>;
    async fn count(&self, partition: Partition) -> Result<u64, AppError>;
}
