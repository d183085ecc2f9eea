/// Database row types for the internal tables. Content tables map straight
/// onto the ybf-types models through `Entity`.
use chrono::{DateTime, Utc};

pub struct AdminPasswordRow {
    pub id: String,
    pub action: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StorageObjectRow {
    pub bucket: String,
    pub key: String,
    pub content_type: String,
    pub size: i64,
    pub sha256: String,
    pub created_at: DateTime<Utc>,
}
