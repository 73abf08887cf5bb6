use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Append-only audit event attached to a deal. `kind` is a free-form tag
/// (deal_created, status_changed, stage_changed, deal_deleted, comment,
/// task_created, ...); consumers must tolerate unknown tags.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Activity {
    pub id: i64,
    pub deal_id: i64,
    /// None for system-generated entries.
    pub author_id: Option<i64>,
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
