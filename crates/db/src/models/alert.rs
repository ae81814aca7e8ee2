//! Alert entity models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use codecall_core::types::{DbId, Timestamp};

use crate::models::status::AlertStatus;

/// A row from the `alerts` table.
///
/// Alerts are append-only: they are never deleted, only moved through
/// the active → acknowledged/resolved lifecycle.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Alert {
    pub id: DbId,
    pub hospital_id: DbId,
    /// Room or location label, e.g. `"ICU-3"`.
    pub room: String,
    /// Free-form alert category, e.g. `"code_blue"`.
    pub alert_type: String,
    /// Urgency ordinal 1-5; lower is more urgent.
    pub urgency: i16,
    pub description: Option<String>,
    pub status_id: i16,
    /// Current escalation tier; starts at 1 and only increases while
    /// the alert is active.
    pub escalation_tier: i16,
    /// Absolute deadline for the next automatic escalation. Null once
    /// acknowledged/resolved, and null while active only when the
    /// tier ladder is exhausted.
    pub next_escalation_at: Option<Timestamp>,
    pub created_by: Option<DbId>,
    pub acknowledged_by: Option<DbId>,
    pub acknowledged_at: Option<Timestamp>,
    pub resolved_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Alert {
    /// Decode the status lookup ID.
    pub fn status(&self) -> Option<AlertStatus> {
        AlertStatus::from_id(self.status_id)
    }

    pub fn is_active(&self) -> bool {
        self.status_id == AlertStatus::Active.id()
    }
}

/// Input for creating a new alert.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAlert {
    pub hospital_id: DbId,
    pub room: String,
    pub alert_type: String,
    /// Urgency ordinal 1-5; validated by the handler before insert.
    pub urgency: i16,
    pub description: Option<String>,
    pub created_by: Option<DbId>,
}
