//! Repository for the `alert_events` journal table.
//!
//! Rows are append-only and ordered by the BIGSERIAL `id`, which is
//! what WebSocket clients hand back as their reconnect cursor.

use sqlx::{PgExecutor, PgPool};

use codecall_core::types::DbId;

use crate::models::alert_event::AlertEventRow;

/// Column list for `alert_events` queries.
const COLUMNS: &str = "\
    id, alert_id, hospital_id, kind, from_tier, to_tier, \
    actor_id, payload, created_at";

/// Provides append and replay reads for the alert event journal.
pub struct AlertEventRepo;

impl AlertEventRepo {
    /// Append an event row, returning the generated cursor ID.
    ///
    /// Takes any executor so the append can share the transaction of
    /// the state transition that produced the event.
    #[allow(clippy::too_many_arguments)]
    pub async fn insert<'e>(
        db: impl PgExecutor<'e>,
        alert_id: DbId,
        hospital_id: DbId,
        kind: &str,
        from_tier: Option<i16>,
        to_tier: Option<i16>,
        actor_id: Option<DbId>,
        payload: &serde_json::Value,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO alert_events \
                (alert_id, hospital_id, kind, from_tier, to_tier, actor_id, payload) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id",
        )
        .bind(alert_id)
        .bind(hospital_id)
        .bind(kind)
        .bind(from_tier)
        .bind(to_tier)
        .bind(actor_id)
        .bind(payload)
        .fetch_one(db)
        .await
    }

    /// List events for a hospital with `id > after_id`, oldest first.
    ///
    /// The caller passes `limit + 1` to detect whether the cursor is
    /// too old to replay within its backlog window.
    pub async fn list_since(
        pool: &PgPool,
        hospital_id: DbId,
        after_id: DbId,
        limit: i64,
    ) -> Result<Vec<AlertEventRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM alert_events \
             WHERE hospital_id = $1 AND id > $2 \
             ORDER BY id ASC \
             LIMIT $3"
        );
        sqlx::query_as::<_, AlertEventRow>(&query)
            .bind(hospital_id)
            .bind(after_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
