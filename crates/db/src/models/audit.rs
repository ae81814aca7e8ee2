//! Audit log entity model.

use serde::Serialize;
use sqlx::FromRow;

use codecall_core::types::{DbId, Timestamp};

/// A row from the `audit_log` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuditRecord {
    pub id: DbId,
    /// Dot-separated action name, e.g. `"alert.acknowledged"`.
    pub action: String,
    pub entity_type: String,
    pub entity_id: DbId,
    pub metadata: serde_json::Value,
    pub created_at: Timestamp,
}
