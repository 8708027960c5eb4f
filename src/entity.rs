//! Entity rows, payloads and history records.
//!
//! An [`EntityRow`] is one fleet asset as stored: a stable id, the
//! bookkeeping timestamps the ledger stamps, and every other column as a JSON
//! value keyed by storage column name. Keeping the columns in a map lets one
//! generic orchestrator serve equipment, mixers, trailers and pickup trucks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Columns the ledger owns. Payloads may not set them.
pub const META_COLUMNS: [&str; 5] = ["id", "created_at", "updated_at", "updated_by", "updated_last"];

/// Actor recorded when the resolved actor is blank.
pub const SENTINEL_ACTOR: &str = "00000000-0000-0000-0000-000000000000";

/// Field values supplied by a caller, keyed by logical or storage name.
pub type Payload = Map<String, Value>;

static NULL: Value = Value::Null;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRow {
    pub id: Uuid,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_by: Option<String>,
    /// Last weekly verification stamp.
    #[serde(default)]
    pub updated_last: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl EntityRow {
    pub fn new(id: Uuid) -> Self {
        EntityRow {
            id,
            created_at: None,
            updated_at: None,
            updated_by: None,
            updated_last: None,
            fields: Map::new(),
        }
    }

    /// Value of a storage column; missing columns read as `null`.
    pub fn get(&self, column: &str) -> &Value {
        self.fields.get(column).unwrap_or(&NULL)
    }

    pub fn set(&mut self, column: &str, value: Value) {
        self.fields.insert(column.to_string(), value);
    }

    /// Stamp the bookkeeping columns every ledger write updates.
    pub fn stamp(&mut self, now: DateTime<Utc>, actor: &str) {
        self.updated_at = Some(now);
        self.updated_by = Some(actor.to_string());
    }

    /// Flat JSON object, the shape the REST API and `jsonb_populate_record` use.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

/// One field change, ready to append to a history table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub entity_id: Uuid,
    pub field_name: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub changed_at: DateTime<Utc>,
    pub changed_by: String,
}

/// A persisted history row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct HistoryRow {
    pub id: Uuid,
    pub entity_id: Uuid,
    pub field_name: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub changed_at: DateTime<Utc>,
    pub changed_by: String,
}

impl HistoryRow {
    pub fn from_record(id: Uuid, record: HistoryRecord) -> Self {
        HistoryRow {
            id,
            entity_id: record.entity_id,
            field_name: record.field_name,
            old_value: record.old_value,
            new_value: record.new_value,
            changed_at: record.changed_at,
            changed_by: record.changed_by,
        }
    }
}
