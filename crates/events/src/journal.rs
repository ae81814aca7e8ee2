//! Durable alert event journal.
//!
//! Every published [`AlertEvent`] is first appended to the
//! `alert_events` table; the generated row ID becomes the event's
//! replay cursor. The append runs inside the same transaction as the
//! state transition that produced the event, so the row lock on the
//! alert serializes journal order per alert: cursor order always
//! matches commit order. A reconnecting WebSocket client hands back
//! the last cursor it saw and the journal replays what it missed — or
//! reports an explicit gap when the cursor has fallen out of the
//! backlog window, so the client knows to refetch full state instead
//! of trusting a silently incomplete stream.

use sqlx::PgExecutor;

use codecall_core::types::DbId;
use codecall_db::models::alert_event::AlertEventRow;
use codecall_db::repositories::AlertEventRepo;
use codecall_db::DbPool;

use crate::bus::{AlertEvent, AlertEventKind};
use crate::store::StoreError;

/// Outcome of a replay request.
#[derive(Debug)]
pub enum Replay {
    /// The missed events, oldest first.
    Events(Vec<AlertEvent>),
    /// The cursor is too old to replay within the backlog window; the
    /// client must refetch full state.
    GapDetected,
}

/// Postgres-backed journal over the `alert_events` table.
pub struct PgEventJournal {
    pool: DbPool,
}

impl PgEventJournal {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Append an event on the given executor, returning its cursor ID.
    ///
    /// Pass the transaction of the state transition that produced the
    /// event: the append then commits (or rolls back) atomically with
    /// the transition, and concurrent transitions on the same alert
    /// get cursors in commit order because the second one blocks on
    /// the alert row lock until the first commits.
    pub async fn append_with<'e>(
        &self,
        db: impl PgExecutor<'e>,
        event: &AlertEvent,
    ) -> Result<DbId, StoreError> {
        let id = AlertEventRepo::insert(
            db,
            event.alert_id,
            event.hospital_id,
            event.kind.as_str(),
            event.from_tier,
            event.to_tier,
            event.actor_id,
            &event.payload,
        )
        .await?;
        Ok(id)
    }

    /// Replay events for `hospital_id` with cursor `after_id`.
    ///
    /// Fetches up to `backlog + 1` rows; seeing more than `backlog`
    /// means the cursor predates the replay window and the caller gets
    /// [`Replay::GapDetected`] instead of a truncated stream.
    pub async fn replay_since(
        &self,
        hospital_id: DbId,
        after_id: DbId,
        backlog: i64,
    ) -> Result<Replay, StoreError> {
        let rows =
            AlertEventRepo::list_since(&self.pool, hospital_id, after_id, backlog + 1).await?;

        if rows.len() as i64 > backlog {
            return Ok(Replay::GapDetected);
        }

        let events = rows.into_iter().filter_map(row_to_event).collect();
        Ok(Replay::Events(events))
    }
}

/// Convert a journal row back into a bus event.
///
/// Rows with an unknown kind (possible only after a schema drift) are
/// dropped with a warning rather than poisoning the replay stream.
fn row_to_event(row: AlertEventRow) -> Option<AlertEvent> {
    let Some(kind) = AlertEventKind::from_str(&row.kind) else {
        tracing::warn!(event_id = row.id, kind = %row.kind, "Unknown journaled event kind, skipping");
        return None;
    };
    Some(AlertEvent {
        id: Some(row.id),
        kind,
        alert_id: row.alert_id,
        hospital_id: row.hospital_id,
        from_tier: row.from_tier,
        to_tier: row.to_tier,
        actor_id: row.actor_id,
        payload: row.payload,
        timestamp: row.created_at,
    })
}
