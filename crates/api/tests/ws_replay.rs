//! Tests for the WebSocket reconnect-replay plan.
//!
//! A reconnecting client must see its missed events first, in cursor
//! order, and live events the replay already delivered must be
//! suppressed. When the journal cannot answer (cursor too old, or the
//! read fails outright) the client gets an explicit gap frame instead
//! of a silently incomplete stream.

mod common;

use axum::extract::ws::Message;
use sqlx::PgPool;

use codecall_api::ws::handler::{already_delivered, plan_replay};
use codecall_core::types::DbId;
use codecall_events::journal::PgEventJournal;
use codecall_events::AlertEvent;

/// Seed an alert row for the hospital and return its ID.
async fn seed_alert(pool: &PgPool, hospital_id: DbId) -> DbId {
    sqlx::query_scalar(
        "INSERT INTO alerts \
            (hospital_id, room, alert_type, urgency, status_id, escalation_tier) \
         VALUES ($1, 'ICU-1', 'code_blue', 1, 1, 1) \
         RETURNING id",
    )
    .bind(hospital_id)
    .fetch_one(pool)
    .await
    .expect("seed alert")
}

/// Parse a text frame as JSON.
fn frame_json(frame: &Message) -> serde_json::Value {
    let Message::Text(text) = frame else {
        panic!("expected a text frame, got {frame:?}");
    };
    serde_json::from_str(text).expect("frame is valid JSON")
}

#[sqlx::test(migrations = "../db/migrations")]
async fn fresh_connection_plans_no_replay(pool: PgPool) {
    let journal = PgEventJournal::new(pool);

    let plan = plan_replay(&journal, 1, None, 100).await;

    assert!(plan.frames.is_empty());
    assert_eq!(plan.cutoff, None);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn replay_plan_carries_missed_events_and_the_high_water_mark(pool: PgPool) {
    let hospital_id = common::seed_hospital(&pool, "General").await;
    let alert_id = seed_alert(&pool, hospital_id).await;
    let journal = PgEventJournal::new(pool.clone());

    let mut cursors = Vec::new();
    for to_tier in 2..=4 {
        let event = AlertEvent::escalated(alert_id, hospital_id, to_tier - 1, to_tier, None);
        cursors.push(journal.append_with(&pool, &event).await.expect("append"));
    }

    // Client disconnected after the first event.
    let plan = plan_replay(&journal, hospital_id, Some(cursors[0]), 100).await;

    assert_eq!(plan.frames.len(), 2);
    assert_eq!(frame_json(&plan.frames[0])["to_tier"], 3);
    assert_eq!(frame_json(&plan.frames[1])["to_tier"], 4);
    assert_eq!(
        plan.cutoff,
        Some(cursors[2]),
        "cutoff is the highest replayed cursor"
    );

    // Live copies of the replayed events are suppressed; anything
    // newer passes through.
    assert!(already_delivered(plan.cutoff, Some(cursors[1])));
    assert!(already_delivered(plan.cutoff, Some(cursors[2])));
    assert!(!already_delivered(plan.cutoff, Some(cursors[2] + 1)));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn too_old_cursor_plans_an_explicit_gap_frame(pool: PgPool) {
    let hospital_id = common::seed_hospital(&pool, "General").await;
    let alert_id = seed_alert(&pool, hospital_id).await;
    let journal = PgEventJournal::new(pool.clone());

    for to_tier in 2..=6 {
        let event = AlertEvent::escalated(alert_id, hospital_id, to_tier - 1, to_tier, None);
        journal.append_with(&pool, &event).await.expect("append");
    }

    // Five missed events against a backlog window of three.
    let plan = plan_replay(&journal, hospital_id, Some(0), 3).await;

    assert_eq!(plan.frames.len(), 1);
    assert_eq!(frame_json(&plan.frames[0])["type"], "gap");
    assert_eq!(plan.cutoff, None, "after a gap nothing is suppressed");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn journal_failure_plans_an_explicit_gap_frame(pool: PgPool) {
    let journal = PgEventJournal::new(pool.clone());

    // Take the journal's store away so the replay read fails.
    pool.close().await;

    let plan = plan_replay(&journal, 1, Some(10), 100).await;

    assert_eq!(
        plan.frames.len(),
        1,
        "a failed replay must still tell the client something"
    );
    assert_eq!(frame_json(&plan.frames[0])["type"], "gap");
    assert_eq!(plan.cutoff, None);
}

#[test]
fn control_frames_are_never_suppressed() {
    assert!(!already_delivered(Some(10), None));
    assert!(!already_delivered(None, Some(5)));
    assert!(!already_delivered(None, None));
}
