use sqlx::FromRow;

/// Shared row shape of every partition table: the key, the canonical JSON
/// document, and the optional out-of-band blob.
#[derive(Debug, Clone, FromRow)]
pub struct RecordRow {
    pub key: String,
    pub fields: String,
    pub blob: Option<Vec<u8>>,
}
