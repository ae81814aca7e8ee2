//! Staff directory entity model.

use serde::Serialize;
use sqlx::FromRow;

use codecall_core::types::{DbId, Timestamp};

/// A row from the `staff` table.
///
/// Staff members are the notification recipients: the directory
/// queries filter on `hospital_id`, `role`, and `on_duty`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StaffMember {
    pub id: DbId,
    pub hospital_id: DbId,
    pub name: String,
    /// Role name; see `codecall_core::roles`.
    pub role: String,
    pub on_duty: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
