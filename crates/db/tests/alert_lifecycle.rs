//! Integration tests for the alert repository's conditional state
//! transitions — the race-resolution core of the escalation pipeline.

use chrono::{Duration, Utc};
use sqlx::PgPool;

use codecall_db::models::alert::CreateAlert;
use codecall_db::models::status::AlertStatus;
use codecall_db::repositories::{AlertEventRepo, AlertRepo};

async fn seed_hospital(pool: &PgPool) -> i64 {
    sqlx::query_scalar("INSERT INTO hospitals (name) VALUES ('General') RETURNING id")
        .fetch_one(pool)
        .await
        .expect("seed hospital")
}

async fn seed_alert(pool: &PgPool, hospital_id: i64) -> codecall_db::models::alert::Alert {
    let input = CreateAlert {
        hospital_id,
        room: "ICU-3".to_string(),
        alert_type: "code_blue".to_string(),
        urgency: 1,
        description: Some("cardiac arrest".to_string()),
        created_by: None,
    };
    AlertRepo::insert(pool, &input, Utc::now() + Duration::seconds(60))
        .await
        .expect("insert alert")
}

// ---------------------------------------------------------------------------
// Test: insert creates an active tier-1 alert with a deadline
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn insert_creates_active_tier_one_alert(pool: PgPool) {
    let hospital_id = seed_hospital(&pool).await;
    let alert = seed_alert(&pool, hospital_id).await;

    assert_eq!(alert.status(), Some(AlertStatus::Active));
    assert_eq!(alert.escalation_tier, 1);
    assert!(alert.next_escalation_at.is_some());
    assert!(alert.acknowledged_at.is_none());
}

// ---------------------------------------------------------------------------
// Test: conditional escalation advances exactly once per tier
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn escalation_is_idempotent_per_tier(pool: PgPool) {
    let hospital_id = seed_hospital(&pool).await;
    let alert = seed_alert(&pool, hospital_id).await;
    let deadline = Utc::now() + Duration::seconds(120);

    let first = AlertRepo::escalate_if_at_tier(&pool, alert.id, 1, 2, Some(deadline))
        .await
        .unwrap();
    assert!(first, "first fire should advance the tier");

    // A duplicate fire for the same pre-escalation tier must be a no-op.
    let second = AlertRepo::escalate_if_at_tier(&pool, alert.id, 1, 2, Some(deadline))
        .await
        .unwrap();
    assert!(!second, "second fire for the same tier must lose");

    let current = AlertRepo::get(&pool, alert.id).await.unwrap().unwrap();
    assert_eq!(current.escalation_tier, 2);
}

// ---------------------------------------------------------------------------
// Test: acknowledgment beats a stale escalation fire
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn acknowledged_alert_cannot_escalate(pool: PgPool) {
    let hospital_id = seed_hospital(&pool).await;
    let alert = seed_alert(&pool, hospital_id).await;

    let acked = AlertRepo::acknowledge_if_active(&pool, alert.id, None)
        .await
        .unwrap()
        .expect("active alert should acknowledge");
    assert_eq!(acked.status(), Some(AlertStatus::Acknowledged));
    assert!(acked.next_escalation_at.is_none());

    // The stale timer fire loses the race and changes nothing.
    let fired = AlertRepo::escalate_if_at_tier(&pool, alert.id, 1, 2, None)
        .await
        .unwrap();
    assert!(!fired);

    let current = AlertRepo::get(&pool, alert.id).await.unwrap().unwrap();
    assert_eq!(current.escalation_tier, 1);
    assert_eq!(current.status(), Some(AlertStatus::Acknowledged));
}

// ---------------------------------------------------------------------------
// Test: double acknowledgment is a conflict, not a second transition
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn second_acknowledge_returns_none(pool: PgPool) {
    let hospital_id = seed_hospital(&pool).await;
    let alert = seed_alert(&pool, hospital_id).await;

    assert!(AlertRepo::acknowledge_if_active(&pool, alert.id, None)
        .await
        .unwrap()
        .is_some());
    assert!(AlertRepo::acknowledge_if_active(&pool, alert.id, None)
        .await
        .unwrap()
        .is_none());
}

// ---------------------------------------------------------------------------
// Test: resolve works from active and acknowledged, but only once
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn resolve_is_terminal(pool: PgPool) {
    let hospital_id = seed_hospital(&pool).await;
    let alert = seed_alert(&pool, hospital_id).await;

    let resolved = AlertRepo::resolve_if_open(&pool, alert.id)
        .await
        .unwrap()
        .expect("open alert should resolve");
    assert_eq!(resolved.status(), Some(AlertStatus::Resolved));
    assert!(resolved.resolved_at.is_some());
    assert!(resolved.next_escalation_at.is_none());

    assert!(AlertRepo::resolve_if_open(&pool, alert.id)
        .await
        .unwrap()
        .is_none());
}

// ---------------------------------------------------------------------------
// Test: tier exhaustion clears the deadline but keeps the alert active
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn exhausted_ladder_keeps_alert_active_without_deadline(pool: PgPool) {
    let hospital_id = seed_hospital(&pool).await;
    let alert = seed_alert(&pool, hospital_id).await;

    let fired = AlertRepo::escalate_if_at_tier(&pool, alert.id, 1, 1, None)
        .await
        .unwrap();
    assert!(fired);

    let current = AlertRepo::get(&pool, alert.id).await.unwrap().unwrap();
    assert_eq!(current.status(), Some(AlertStatus::Active));
    assert!(current.next_escalation_at.is_none());
}

// ---------------------------------------------------------------------------
// Test: journal ids are monotonically increasing and replayable
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn event_journal_replays_in_cursor_order(pool: PgPool) {
    let hospital_id = seed_hospital(&pool).await;
    let alert = seed_alert(&pool, hospital_id).await;
    let payload = serde_json::json!({});

    let mut ids = Vec::new();
    for kind in ["created", "escalated", "acknowledged"] {
        let id = AlertEventRepo::insert(
            &pool, alert.id, hospital_id, kind, None, None, None, &payload,
        )
        .await
        .unwrap();
        ids.push(id);
    }
    assert!(ids.windows(2).all(|w| w[0] < w[1]));

    // Replay everything after the first event.
    let replay = AlertEventRepo::list_since(&pool, hospital_id, ids[0], 10)
        .await
        .unwrap();
    assert_eq!(replay.len(), 2);
    assert_eq!(replay[0].kind, "escalated");
    assert_eq!(replay[1].kind, "acknowledged");
}
