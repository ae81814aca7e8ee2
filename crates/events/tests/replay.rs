//! Integration tests for the event journal's replay contract.
//!
//! A reconnecting client hands back the last cursor it saw; the
//! journal either replays every missed event in order or reports an
//! explicit gap when the cursor fell out of the backlog window. The
//! append side is exercised through the same transactional path the
//! state transitions use.

use std::time::Duration;

use sqlx::PgPool;

use codecall_db::repositories::AlertRepo;
use codecall_events::journal::{PgEventJournal, Replay};
use codecall_events::{AlertEvent, AlertEventKind};

/// Seed a hospital and an alert row, returning (hospital_id, alert_id).
async fn seed_alert(pool: &PgPool) -> (i64, i64) {
    let hospital_id: i64 = sqlx::query_scalar("INSERT INTO hospitals (name) VALUES ('General') RETURNING id")
        .fetch_one(pool)
        .await
        .expect("seed hospital");

    let alert_id: i64 = sqlx::query_scalar(
        "INSERT INTO alerts \
            (hospital_id, room, alert_type, urgency, status_id, escalation_tier) \
         VALUES ($1, 'ICU-1', 'code_blue', 1, 1, 1) \
         RETURNING id",
    )
    .bind(hospital_id)
    .fetch_one(pool)
    .await
    .expect("seed alert");

    (hospital_id, alert_id)
}

#[sqlx::test(migrations = "../db/migrations")]
async fn replay_returns_missed_events_in_cursor_order(pool: PgPool) {
    let (hospital_id, alert_id) = seed_alert(&pool).await;
    let journal = PgEventJournal::new(pool.clone());

    let mut cursors = Vec::new();
    for to_tier in 2..=4 {
        let event = AlertEvent::escalated(alert_id, hospital_id, to_tier - 1, to_tier, None);
        cursors.push(journal.append_with(&pool, &event).await.expect("append"));
    }

    // Client saw the first event only.
    let replay = journal
        .replay_since(hospital_id, cursors[0], 100)
        .await
        .expect("replay");

    let Replay::Events(events) = replay else {
        panic!("expected events, got a gap");
    };
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].id, Some(cursors[1]));
    assert_eq!(events[1].id, Some(cursors[2]));
    assert_eq!(events[0].to_tier, Some(3));
    assert_eq!(events[1].to_tier, Some(4));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn replay_is_scoped_to_the_hospital(pool: PgPool) {
    let (hospital_a, alert_a) = seed_alert(&pool).await;
    let (hospital_b, alert_b) = seed_alert(&pool).await;
    let journal = PgEventJournal::new(pool.clone());

    journal
        .append_with(&pool, &AlertEvent::escalated(alert_a, hospital_a, 1, 2, None))
        .await
        .expect("append");
    journal
        .append_with(&pool, &AlertEvent::escalated(alert_b, hospital_b, 1, 2, None))
        .await
        .expect("append");

    let replay = journal.replay_since(hospital_a, 0, 100).await.expect("replay");
    let Replay::Events(events) = replay else {
        panic!("expected events, got a gap");
    };
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].alert_id, alert_a);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn cursor_beyond_backlog_window_reports_a_gap(pool: PgPool) {
    let (hospital_id, alert_id) = seed_alert(&pool).await;
    let journal = PgEventJournal::new(pool.clone());

    for to_tier in 2..=6 {
        journal
            .append_with(
                &pool,
                &AlertEvent::escalated(alert_id, hospital_id, to_tier - 1, to_tier, None),
            )
            .await
            .expect("append");
    }

    // Five missed events against a backlog window of three.
    let replay = journal.replay_since(hospital_id, 0, 3).await.expect("replay");

    assert!(
        matches!(replay, Replay::GapDetected),
        "expected a gap, got {replay:?}"
    );
}

#[sqlx::test(migrations = "../db/migrations")]
async fn backlog_boundary_still_replays(pool: PgPool) {
    let (hospital_id, alert_id) = seed_alert(&pool).await;
    let journal = PgEventJournal::new(pool.clone());

    for to_tier in 2..=4 {
        journal
            .append_with(
                &pool,
                &AlertEvent::escalated(alert_id, hospital_id, to_tier - 1, to_tier, None),
            )
            .await
            .expect("append");
    }

    // Exactly as many missed events as the window allows.
    let replay = journal.replay_since(hospital_id, 0, 3).await.expect("replay");
    let Replay::Events(events) = replay else {
        panic!("expected events at the boundary, got a gap");
    };
    assert_eq!(events.len(), 3);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn rolled_back_transition_journals_nothing(pool: PgPool) {
    let (hospital_id, alert_id) = seed_alert(&pool).await;
    let journal = PgEventJournal::new(pool.clone());

    let mut tx = pool.begin().await.expect("begin");
    assert!(
        AlertRepo::escalate_if_at_tier(&mut *tx, alert_id, 1, 2, None)
            .await
            .expect("escalate")
    );
    let event = AlertEvent::escalated(alert_id, hospital_id, 1, 2, None);
    journal.append_with(&mut *tx, &event).await.expect("append");
    tx.rollback().await.expect("rollback");

    // Neither the tier change nor the event row survived.
    let alert = AlertRepo::get(&pool, alert_id)
        .await
        .expect("get")
        .expect("alert exists");
    assert_eq!(alert.escalation_tier, 1);

    let replay = journal.replay_since(hospital_id, 0, 100).await.expect("replay");
    let Replay::Events(events) = replay else {
        panic!("expected events, got a gap");
    };
    assert!(events.is_empty(), "rollback must discard the journal row");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn journal_order_follows_commit_order_under_contention(pool: PgPool) {
    let (hospital_id, alert_id) = seed_alert(&pool).await;
    let journal = PgEventJournal::new(pool.clone());

    // Escalation transition held open in an explicit transaction.
    let mut tx = pool.begin().await.expect("begin");
    assert!(
        AlertRepo::escalate_if_at_tier(&mut *tx, alert_id, 1, 2, None)
            .await
            .expect("escalate")
    );
    let escalated = AlertEvent::escalated(alert_id, hospital_id, 1, 2, None);
    let escalated_cursor = journal.append_with(&mut *tx, &escalated).await.expect("append");

    // A racing acknowledgment blocks on the alert row lock until the
    // escalation commits.
    let ack_pool = pool.clone();
    let ack = tokio::spawn(async move {
        let journal = PgEventJournal::new(ack_pool.clone());
        let mut tx = ack_pool.begin().await.expect("begin");
        let alert = AlertRepo::acknowledge_if_active(&mut *tx, alert_id, None)
            .await
            .expect("acknowledge")
            .expect("alert still active");
        let event = AlertEvent::acknowledged(&alert);
        let cursor = journal.append_with(&mut *tx, &event).await.expect("append");
        tx.commit().await.expect("commit");
        cursor
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    tx.commit().await.expect("commit");

    let ack_cursor = ack.await.expect("ack task");
    assert!(
        escalated_cursor < ack_cursor,
        "the transition that committed first must get the lower cursor"
    );

    // And a replaying client sees the two events in that order.
    let replay = journal.replay_since(hospital_id, 0, 100).await.expect("replay");
    let Replay::Events(events) = replay else {
        panic!("expected events, got a gap");
    };
    let kinds: Vec<AlertEventKind> = events.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![AlertEventKind::Escalated, AlertEventKind::Acknowledged]
    );
}
