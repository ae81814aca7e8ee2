//! Journaled alert event rows.
//!
//! The `alert_events` table is the replay backlog for reconnecting
//! WebSocket clients; the BIGSERIAL `id` doubles as the client cursor.

use serde::Serialize;
use sqlx::FromRow;

use codecall_core::types::{DbId, Timestamp};

/// A row from the `alert_events` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AlertEventRow {
    pub id: DbId,
    pub alert_id: DbId,
    pub hospital_id: DbId,
    /// Event kind: `created`, `acknowledged`, `escalated`, `resolved`.
    pub kind: String,
    pub from_tier: Option<i16>,
    pub to_tier: Option<i16>,
    pub actor_id: Option<DbId>,
    pub payload: serde_json::Value,
    pub created_at: Timestamp,
}
