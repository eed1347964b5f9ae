use crate::application::ports::local_store::{IndexValue, LocalStore, StoredRecord};
use crate::domain::value_objects::Partition;
use crate::infrastructure::database::rows::RecordRow;
use crate::shared::error::AppError;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Unknown index '{index}' for partition '{partition}'")]
    UnknownIndex {
        partition: &'static str,
        index: String,
    },

    #[error("Failed to decode record '{key}': {source}")]
    Decode {
        key: String,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UnknownIndex { .. } => AppError::InvalidInput(err.to_string()),
            StoreError::Decode { .. } => AppError::Serialization(err.to_string()),
            StoreError::Sqlx(e) => AppError::Database(e.to_string()),
        }
    }
}

/// SQLite-backed implementation of the partitioned local store. One table per
/// partition; secondary indices are generated columns over the JSON document
/// (see `migrations/`), so writes stay a single upsert.
pub struct SqliteLocalStore {
    pool: Pool<Sqlite>,
}

impl SqliteLocalStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    fn row_to_record(row: RecordRow) -> Result<StoredRecord, StoreError> {
        let fields = serde_json::from_str(&row.fields).map_err(|source| StoreError::Decode {
            key: row.key.clone(),
            source,
        })?;
        Ok(StoredRecord {
            key: row.key,
            fields,
            blob: row.blob.map(Bytes::from),
        })
    }

    fn index_column(partition: Partition, index: &str) -> Result<&'static str, StoreError> {
        partition
            .indexes()
            .iter()
            .find(|&&name| name == index)
            .copied()
            .ok_or_else(|| StoreError::UnknownIndex {
                partition: partition.table(),
                index: index.to_string(),
            })
    }
}

#[async_trait]
impl LocalStore for SqliteLocalStore {
    async fn put(&self, partition: Partition, record: StoredRecord) -> Result<(), AppError> {
        let sql = format!(
            r#"
            INSERT INTO {} (key, fields, blob) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                fields = excluded.fields,
                blob = excluded.blob
            "#,
            partition.table()
        );

        sqlx::query(&sql)
            .bind(&record.key)
            .bind(record.fields.to_string())
            .bind(record.blob.as_ref().map(|b| b.as_ref().to_vec()))
            .execute(&self.pool)
            .await
            .map_err(StoreError::from)?;

        Ok(())
    }

    async fn get(&self, partition: Partition, key: &str) -> Result<Option<StoredRecord>, AppError> {
        let sql = format!(
            "SELECT key, fields, blob FROM {} WHERE key = ?1",
            partition.table()
        );

        let row = sqlx::query_as::<_, RecordRow>(&sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from)?;

        match row {
            Some(row) => Ok(Some(Self::row_to_record(row)?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, partition: Partition, key: &str) -> Result<bool, AppError> {
        let sql = format!("DELETE FROM {} WHERE key = ?1", partition.table());

        let result = sqlx::query(&sql)
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(StoreError::from)?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_all(&self, partition: Partition) -> Result<Vec<StoredRecord>, AppError> {
        let sql = format!(
            "SELECT key, fields, blob FROM {} ORDER BY key",
            partition.table()
        );

        let rows = sqlx::query_as::<_, RecordRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::from)?;

        rows.into_iter()
            .map(|row| Self::row_to_record(row).map_err(AppError::from))
            .collect()
    }

    async fn get_all_by_index(
        &self,
        partition: Partition,
        index: &str,
        value: IndexValue,
    ) -> Result<Vec<StoredRecord>, AppError> {
        let column = Self::index_column(partition, index)?;
        let sql = format!(
            "SELECT key, fields, blob FROM {} WHERE {} = ?1 ORDER BY key",
            partition.table(),
            column
        );

        let query = sqlx::query_as::<_, RecordRow>(&sql);
        let query = match value {
            IndexValue::Text(text) => query.bind(text),
            IndexValue::Integer(number) => query.bind(number),
            // JSON booleans extract to 0/1 in the generated column.
            IndexValue::Boolean(flag) => query.bind(flag as i64),
        };

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::from)?;

        rows.into_iter()
            .map(|row| Self::row_to_record(row).map_err(AppError::from))
            .collect()
    }

    async fn touch(
        &self,
        partition: Partition,
        key: &str,
        at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let sql = format!(
            "UPDATE {} SET fields = json_set(fields, '$.last_accessed_at', ?1) WHERE key = ?2",
            partition.table()
        );

        sqlx::query(&sql)
            .bind(at.timestamp_millis())
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(StoreError::from)?;

        Ok(())
    }

    async fn count(&self, partition: Partition) -> Result<u64, AppError> {
        let sql = format!("SELECT COUNT(*) as count FROM {}", partition.table());

        let row = sqlx::query(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::from)?;

        let count: i64 = row.try_get("count").unwrap_or(0);
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::connection_pool::ConnectionPool;
    use serde_json::json;

    async fn setup_store() -> SqliteLocalStore {
        let pool = ConnectionPool::from_memory().await.unwrap();
        pool.migrate().await.unwrap();
        SqliteLocalStore::new(pool.get_pool().clone())
    }

    #[tokio::test]
    async fn put_get_delete_round_trip() {
        let store = setup_store().await;
        let record = StoredRecord::new(
            "scene-1".to_string(),
            json!({"content_hash": "h1", "cached_at": 1000, "last_accessed_at": 1000}),
        );

        store.put(Partition::Scenes, record.clone()).await.unwrap();
        let loaded = store.get(Partition::Scenes, "scene-1").await.unwrap().unwrap();
        assert_eq!(loaded.fields["content_hash"], "h1");

        assert!(store.delete(Partition::Scenes, "scene-1").await.unwrap());
        assert!(!store.delete(Partition::Scenes, "scene-1").await.unwrap());
        assert!(store.get(Partition::Scenes, "scene-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_overwrites_existing_key() {
        let store = setup_store().await;
        let first = StoredRecord::new("scene-1".to_string(), json!({"content_hash": "h1"}));
        let second = StoredRecord::new("scene-1".to_string(), json!({"content_hash": "h2"}));

        store.put(Partition::Scenes, first).await.unwrap();
        store.put(Partition::Scenes, second).await.unwrap();

        let loaded = store.get(Partition::Scenes, "scene-1").await.unwrap().unwrap();
        assert_eq!(loaded.fields["content_hash"], "h2");
        assert_eq!(store.count(Partition::Scenes).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn secondary_index_lookup_filters_rows() {
        let store = setup_store().await;
        for (key, content_id) in [("a.png", "scene-1"), ("b.png", "scene-1"), ("c.png", "scene-2")] {
            let record = StoredRecord::with_blob(
                key.to_string(),
                json!({
                    "associated_content_id": content_id,
                    "cached_at": 1000,
                    "size_bytes": 3
                }),
                Bytes::from_static(b"abc"),
            );
            store.put(Partition::Media, record).await.unwrap();
        }

        let matches = store
            .get_all_by_index(
                Partition::Media,
                "associated_content_id",
                IndexValue::from("scene-1"),
            )
            .await
            .unwrap();
        assert_eq!(matches.len(), 2);
        assert!(matches.iter().all(|r| r.blob.as_deref() == Some(b"abc".as_ref())));
    }

    #[tokio::test]
    async fn unknown_index_is_rejected() {
        let store = setup_store().await;
        let err = store
            .get_all_by_index(Partition::Scenes, "synced", IndexValue::from(true))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn boolean_index_matches_json_booleans() {
        let store = setup_store().await;
        for (id, synced) in [(1, false), (2, true), (3, false)] {
            let record = StoredRecord::new(
                id.to_string(),
                json!({
                    "id": id,
                    "event_type": "playback",
                    "created_at": id * 100,
                    "synced": synced
                }),
            );
            store.put(Partition::OfflineQueue, record).await.unwrap();
        }

        let pending = store
            .get_all_by_index(Partition::OfflineQueue, "synced", IndexValue::from(false))
            .await
            .unwrap();
        assert_eq!(pending.len(), 2);
    }

    #[tokio::test]
    async fn touch_updates_last_accessed_at() {
        let store = setup_store().await;
        let record = StoredRecord::new(
            "scene-1".to_string(),
            json!({"cached_at": 1000, "last_accessed_at": 1000}),
        );
        store.put(Partition::Scenes, record).await.unwrap();

        let at = DateTime::from_timestamp_millis(5_000).unwrap();
        store.touch(Partition::Scenes, "scene-1", at).await.unwrap();

        let loaded = store.get(Partition::Scenes, "scene-1").await.unwrap().unwrap();
        assert_eq!(loaded.fields["last_accessed_at"], 5_000);
    }
}
