use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::query::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A committed row change, published on the realtime feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: Table,
    pub kind: ChangeKind,
    /// New row for inserts and updates, removed row for deletes.
    pub record: Value,
    /// Previous row, updates only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_record: Option<Value>,
    pub commit_timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn inserted<T: Serialize>(table: Table, row: &T) -> Self {
        Self::new(table, ChangeKind::Insert, to_value(row), None)
    }

    pub fn updated<T: Serialize>(table: Table, old: &T, new: &T) -> Self {
        Self::new(table, ChangeKind::Update, to_value(new), Some(to_value(old)))
    }

    pub fn deleted<T: Serialize>(table: Table, row: &T) -> Self {
        Self::new(table, ChangeKind::Delete, to_value(row), None)
    }

    fn new(table: Table, kind: ChangeKind, record: Value, old_record: Option<Value>) -> Self {
        Self {
            table,
            kind,
            record,
            old_record,
            commit_timestamp: Utc::now(),
        }
    }
}

fn to_value<T: Serialize>(row: &T) -> Value {
    serde_json::to_value(row).unwrap_or(Value::Null)
}

/// Commands sent FROM client TO server over the realtime WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum FeedCommand {
    /// Open a live list. `id` is chosen by the client and echoed back on
    /// every snapshot.
    Subscribe {
        id: String,
        table: String,
        #[serde(default)]
        filter: Option<String>,
        /// `column.asc` or `column.desc`; defaults per table.
        #[serde(default)]
        order: Option<String>,
        /// Admin session, required for private tables.
        #[serde(default)]
        token: Option<String>,
    },

    /// Close a live list.
    Unsubscribe { id: String },
}

/// Events sent FROM server TO client over the realtime WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum FeedEvent {
    /// Full contents of a subscribed list, sent on subscribe and after every
    /// refetch.
    Snapshot { id: String, rows: Vec<Value> },

    /// A command was rejected.
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        message: String,
    },
}
