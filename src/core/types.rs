use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Stored document body. Always a JSON object at the root.
pub type Document = serde_json::Value;

/// Descriptive metadata of an index, as reported by `Database::index_info`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexInfo {
    pub name: String,
    pub uuid: Uuid,
    pub created_at: DateTime<Utc>,
    pub doc_count: usize,
}
