//! Alert store seam.
//!
//! The escalation timer only needs three things from the durable
//! store: a point read, the conditional tier advance, and the
//! ladder-exhaustion update. Putting those behind a trait keeps the
//! timer testable without a database and matches how the store is an
//! external collaborator of the escalation core.

use async_trait::async_trait;

use codecall_core::types::{DbId, Timestamp};
use codecall_db::models::alert::Alert;
use codecall_db::repositories::{AlertEventRepo, AlertRepo};
use codecall_db::DbPool;

use crate::bus::AlertEvent;

/// Error type for alert store and journal operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("alert store unavailable: {0}")]
    Unavailable(String),
}

/// Durable alert record store with atomic conditional updates.
#[async_trait]
pub trait AlertStore: Send + Sync + 'static {
    /// Fetch a single alert.
    async fn get(&self, alert_id: DbId) -> Result<Option<Alert>, StoreError>;

    /// Advance the escalation tier only if the alert is still active
    /// at `expected_tier`, journaling `event` atomically with the
    /// update. Returns the event's journal cursor, or `None` when
    /// another actor already transitioned the row (race lost) and
    /// nothing was journaled.
    async fn escalate_if_at_tier(
        &self,
        alert_id: DbId,
        expected_tier: i16,
        new_tier: i16,
        new_deadline: Timestamp,
        event: &AlertEvent,
    ) -> Result<Option<DbId>, StoreError>;

    /// Clear the escalation deadline of an alert still active at
    /// `tier` — the ladder's last rung timed out. No event is
    /// journaled. Returns `false` when the row already moved on.
    async fn clear_deadline_if_at_tier(
        &self,
        alert_id: DbId,
        tier: i16,
    ) -> Result<bool, StoreError>;
}

/// Postgres-backed [`AlertStore`] delegating to [`AlertRepo`].
pub struct PgAlertStore {
    pool: DbPool,
}

impl PgAlertStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlertStore for PgAlertStore {
    async fn get(&self, alert_id: DbId) -> Result<Option<Alert>, StoreError> {
        Ok(AlertRepo::get(&self.pool, alert_id).await?)
    }

    async fn escalate_if_at_tier(
        &self,
        alert_id: DbId,
        expected_tier: i16,
        new_tier: i16,
        new_deadline: Timestamp,
        event: &AlertEvent,
    ) -> Result<Option<DbId>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let advanced = AlertRepo::escalate_if_at_tier(
            &mut *tx,
            alert_id,
            expected_tier,
            new_tier,
            Some(new_deadline),
        )
        .await?;
        if !advanced {
            tx.rollback().await?;
            return Ok(None);
        }

        let cursor = AlertEventRepo::insert(
            &mut *tx,
            event.alert_id,
            event.hospital_id,
            event.kind.as_str(),
            event.from_tier,
            event.to_tier,
            event.actor_id,
            &event.payload,
        )
        .await?;
        tx.commit().await?;

        Ok(Some(cursor))
    }

    async fn clear_deadline_if_at_tier(
        &self,
        alert_id: DbId,
        tier: i16,
    ) -> Result<bool, StoreError> {
        Ok(AlertRepo::escalate_if_at_tier(&self.pool, alert_id, tier, tier, None).await?)
    }
}
