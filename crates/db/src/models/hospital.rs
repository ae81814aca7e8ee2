//! Hospital entity model.

use serde::Serialize;
use sqlx::FromRow;

use codecall_core::types::{DbId, Timestamp};

/// A row from the `hospitals` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Hospital {
    pub id: DbId,
    pub name: String,
    pub created_at: Timestamp,
}
