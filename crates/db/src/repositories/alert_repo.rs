//! Repository for the `alerts` table.
//!
//! The alert row is the single source of truth for the escalation
//! state machine. Every state transition here is a conditional update:
//! the `WHERE` clause re-checks the expected prior state so that a
//! concurrent acknowledge and a concurrent escalation fire cannot both
//! win. A transition that matches zero rows simply lost the race.

use sqlx::{PgExecutor, PgPool};

use codecall_core::types::{DbId, Timestamp};

use crate::models::alert::{Alert, CreateAlert};
use crate::models::status::AlertStatus;

/// Column list for `alerts` queries.
const COLUMNS: &str = "\
    id, hospital_id, room, alert_type, urgency, description, \
    status_id, escalation_tier, next_escalation_at, \
    created_by, acknowledged_by, acknowledged_at, resolved_at, \
    created_at, updated_at";

/// Provides CRUD and conditional state-transition operations for alerts.
pub struct AlertRepo;

impl AlertRepo {
    /// Insert a new active alert at tier 1 with its first escalation
    /// deadline.
    ///
    /// Takes any executor so the caller can journal the creation event
    /// in the same transaction.
    pub async fn insert<'e>(
        db: impl PgExecutor<'e>,
        input: &CreateAlert,
        deadline: Timestamp,
    ) -> Result<Alert, sqlx::Error> {
        let query = format!(
            "INSERT INTO alerts \
                (hospital_id, room, alert_type, urgency, description, \
                 status_id, escalation_tier, next_escalation_at, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, 1, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Alert>(&query)
            .bind(input.hospital_id)
            .bind(&input.room)
            .bind(&input.alert_type)
            .bind(input.urgency)
            .bind(&input.description)
            .bind(AlertStatus::Active.id())
            .bind(deadline)
            .bind(input.created_by)
            .fetch_one(db)
            .await
    }

    /// Fetch a single alert by ID.
    pub async fn get(pool: &PgPool, alert_id: DbId) -> Result<Option<Alert>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM alerts WHERE id = $1");
        sqlx::query_as::<_, Alert>(&query)
            .bind(alert_id)
            .fetch_optional(pool)
            .await
    }

    /// List active alerts for a hospital, most urgent first.
    pub async fn list_active(pool: &PgPool, hospital_id: DbId) -> Result<Vec<Alert>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM alerts \
             WHERE hospital_id = $1 AND status_id = $2 \
             ORDER BY urgency ASC, created_at ASC"
        );
        sqlx::query_as::<_, Alert>(&query)
            .bind(hospital_id)
            .bind(AlertStatus::Active.id())
            .fetch_all(pool)
            .await
    }

    /// List every active alert with a pending escalation deadline,
    /// across all hospitals. Used to re-prime the timer service after
    /// a restart.
    pub async fn list_active_with_deadline(pool: &PgPool) -> Result<Vec<Alert>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM alerts \
             WHERE status_id = $1 AND next_escalation_at IS NOT NULL \
             ORDER BY next_escalation_at ASC"
        );
        sqlx::query_as::<_, Alert>(&query)
            .bind(AlertStatus::Active.id())
            .fetch_all(pool)
            .await
    }

    /// Acknowledge an alert only if it is still active.
    ///
    /// Clears the escalation deadline in the same statement. Returns
    /// `None` when the alert was not active anymore (already
    /// acknowledged or resolved) — the caller lost the race.
    pub async fn acknowledge_if_active<'e>(
        db: impl PgExecutor<'e>,
        alert_id: DbId,
        acknowledged_by: Option<DbId>,
    ) -> Result<Option<Alert>, sqlx::Error> {
        let query = format!(
            "UPDATE alerts \
             SET status_id = $2, acknowledged_by = $3, acknowledged_at = NOW(), \
                 next_escalation_at = NULL, updated_at = NOW() \
             WHERE id = $1 AND status_id = $4 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Alert>(&query)
            .bind(alert_id)
            .bind(AlertStatus::Acknowledged.id())
            .bind(acknowledged_by)
            .bind(AlertStatus::Active.id())
            .fetch_optional(db)
            .await
    }

    /// Resolve an alert from either the active or acknowledged state.
    ///
    /// Returns `None` when the alert was already resolved.
    pub async fn resolve_if_open<'e>(
        db: impl PgExecutor<'e>,
        alert_id: DbId,
    ) -> Result<Option<Alert>, sqlx::Error> {
        let query = format!(
            "UPDATE alerts \
             SET status_id = $2, resolved_at = NOW(), \
                 next_escalation_at = NULL, updated_at = NOW() \
             WHERE id = $1 AND status_id <> $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Alert>(&query)
            .bind(alert_id)
            .bind(AlertStatus::Resolved.id())
            .fetch_optional(db)
            .await
    }

    /// Advance the escalation tier, but only if the alert is still
    /// active and sitting at the expected pre-escalation tier.
    ///
    /// `new_deadline` is `None` when the ladder is exhausted: the alert
    /// stays active with no further automatic escalation. Returns
    /// `true` when a row actually changed; `false` means another actor
    /// (an acknowledgment or an earlier fire) already transitioned the
    /// alert and this fire is a no-op.
    pub async fn escalate_if_at_tier<'e>(
        db: impl PgExecutor<'e>,
        alert_id: DbId,
        expected_tier: i16,
        new_tier: i16,
        new_deadline: Option<Timestamp>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE alerts \
             SET escalation_tier = $3, next_escalation_at = $4, updated_at = NOW() \
             WHERE id = $1 AND status_id = $5 AND escalation_tier = $2",
        )
        .bind(alert_id)
        .bind(expected_tier)
        .bind(new_tier)
        .bind(new_deadline)
        .bind(AlertStatus::Active.id())
        .execute(db)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
