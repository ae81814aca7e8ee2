//! Handlers for the `/alerts` resource.
//!
//! Every state transition follows the same shape: conditional update
//! and journal append in one transaction (the alert row lock makes
//! journal cursor order follow commit order per alert), then timer
//! bookkeeping, publish, and audit. A transition that loses the
//! conditional update returns 409 so the caller learns the alert moved
//! under them.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use codecall_core::error::CoreError;
use codecall_core::types::{DbId, Timestamp};
use codecall_core::urgency::UrgencyLevel;
use codecall_db::models::alert::{Alert, CreateAlert};
use codecall_db::models::status::AlertStatus;
use codecall_db::repositories::AlertRepo;
use codecall_events::AlertEvent;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Body for `POST /alerts/{id}/acknowledge`.
#[derive(Debug, Deserialize)]
pub struct AcknowledgeBody {
    /// Staff member acknowledging the alert.
    pub staff_id: Option<DbId>,
}

/// Body for `POST /alerts/{id}/resolve`.
#[derive(Debug, Deserialize, Default)]
pub struct ResolveBody {
    /// Staff member resolving the alert.
    pub staff_id: Option<DbId>,
}

/// Escalation state projection for `GET /alerts/{id}/escalation`.
#[derive(Debug, Serialize)]
pub struct EscalationStatus {
    pub alert_id: DbId,
    pub status: Option<&'static str>,
    pub escalation_tier: i16,
    pub next_escalation_at: Option<Timestamp>,
    /// Seconds until the next escalation, clamped to zero when the
    /// deadline has already passed but the timer has not fired yet.
    pub time_remaining_secs: Option<i64>,
    /// True when the alert is active with no deadline left: the ladder
    /// ran out and only a manual acknowledge/resolve will close it.
    pub ladder_exhausted: bool,
}

impl EscalationStatus {
    fn from_alert(alert: &Alert, now: Timestamp) -> Self {
        Self {
            alert_id: alert.id,
            status: alert.status().map(AlertStatus::as_str),
            escalation_tier: alert.escalation_tier,
            next_escalation_at: alert.next_escalation_at,
            time_remaining_secs: alert
                .next_escalation_at
                .map(|deadline| (deadline - now).num_seconds().max(0)),
            ladder_exhausted: alert.is_active() && alert.next_escalation_at.is_none(),
        }
    }
}

// ---------------------------------------------------------------------------
// Creation and reads
// ---------------------------------------------------------------------------

/// POST /api/v1/alerts
///
/// Create an alert at tier 1 with its urgency-modulated first
/// escalation deadline, arm the timer, and broadcast the creation.
pub async fn create_alert(
    State(state): State<AppState>,
    Json(input): Json<CreateAlert>,
) -> AppResult<impl IntoResponse> {
    let urgency = UrgencyLevel::try_from(input.urgency).map_err(AppError::Core)?;
    if input.room.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "room must not be empty".to_string(),
        )));
    }

    let deadline = state.policy.first_deadline(urgency, chrono::Utc::now());

    let mut tx = state.pool.begin().await?;
    let alert = AlertRepo::insert(&mut *tx, &input, deadline).await?;
    let mut event = AlertEvent::created(&alert);
    let cursor = state.journal.append_with(&mut *tx, &event).await?;
    tx.commit().await?;
    event.id = Some(cursor);

    state.timer.schedule(alert.id, deadline);
    state.event_bus.publish(event);

    state
        .audit
        .record(
            "alert_created",
            "alert",
            alert.id,
            serde_json::json!({
                "hospital_id": alert.hospital_id,
                "room": alert.room,
                "urgency": alert.urgency,
            }),
        )
        .await;

    tracing::info!(
        alert_id = alert.id,
        hospital_id = alert.hospital_id,
        urgency = alert.urgency,
        "Alert created"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: alert })))
}

/// GET /api/v1/alerts/{id}
pub async fn get_alert(
    State(state): State<AppState>,
    Path(alert_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Alert>>> {
    let alert = AlertRepo::get(&state.pool, alert_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Alert",
            id: alert_id,
        }))?;

    Ok(Json(DataResponse { data: alert }))
}

/// GET /api/v1/alerts/{id}/escalation
///
/// Escalation-state projection: tier, pending deadline, and whether
/// the ladder is exhausted.
pub async fn escalation_status(
    State(state): State<AppState>,
    Path(alert_id): Path<DbId>,
) -> AppResult<Json<DataResponse<EscalationStatus>>> {
    let alert = AlertRepo::get(&state.pool, alert_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Alert",
            id: alert_id,
        }))?;

    Ok(Json(DataResponse {
        data: EscalationStatus::from_alert(&alert, chrono::Utc::now()),
    }))
}

/// GET /api/v1/hospitals/{id}/alerts
///
/// Active alerts for a hospital, most urgent first.
pub async fn list_active_alerts(
    State(state): State<AppState>,
    Path(hospital_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Alert>>>> {
    let alerts = AlertRepo::list_active(&state.pool, hospital_id).await?;
    Ok(Json(DataResponse { data: alerts }))
}

// ---------------------------------------------------------------------------
// State transitions
// ---------------------------------------------------------------------------

/// POST /api/v1/alerts/{id}/acknowledge
///
/// Acknowledge an active alert. Returns 409 when the alert is no
/// longer active (someone else acknowledged or resolved it first).
pub async fn acknowledge_alert(
    State(state): State<AppState>,
    Path(alert_id): Path<DbId>,
    Json(body): Json<AcknowledgeBody>,
) -> AppResult<Json<DataResponse<Alert>>> {
    let mut tx = state.pool.begin().await?;
    let Some(alert) = AlertRepo::acknowledge_if_active(&mut *tx, alert_id, body.staff_id).await?
    else {
        tx.rollback().await?;
        // Distinguish "gone" from "already transitioned".
        return Err(match AlertRepo::get(&state.pool, alert_id).await? {
            None => AppError::Core(CoreError::NotFound {
                entity: "Alert",
                id: alert_id,
            }),
            Some(_) => AppError::Core(CoreError::Conflict(format!(
                "alert {alert_id} is not active (already acknowledged or resolved)"
            ))),
        });
    };
    let mut event = AlertEvent::acknowledged(&alert);
    let cursor = state.journal.append_with(&mut *tx, &event).await?;
    tx.commit().await?;
    event.id = Some(cursor);

    // The deadline is already cleared in the database; cancelling the
    // timer entry just avoids a pointless no-op fire.
    state.timer.cancel(alert_id);
    state.event_bus.publish(event);

    state
        .audit
        .record(
            "alert_acknowledged",
            "alert",
            alert.id,
            serde_json::json!({
                "staff_id": body.staff_id,
                "tier": alert.escalation_tier,
            }),
        )
        .await;

    tracing::info!(
        alert_id,
        staff_id = body.staff_id,
        tier = alert.escalation_tier,
        "Alert acknowledged"
    );

    Ok(Json(DataResponse { data: alert }))
}

/// POST /api/v1/alerts/{id}/resolve
///
/// Resolve an alert from either the active or acknowledged state.
/// Returns 409 when it was already resolved.
pub async fn resolve_alert(
    State(state): State<AppState>,
    Path(alert_id): Path<DbId>,
    body: Option<Json<ResolveBody>>,
) -> AppResult<Json<DataResponse<Alert>>> {
    let staff_id = body.and_then(|Json(b)| b.staff_id);

    let mut tx = state.pool.begin().await?;
    let Some(alert) = AlertRepo::resolve_if_open(&mut *tx, alert_id).await? else {
        tx.rollback().await?;
        return Err(match AlertRepo::get(&state.pool, alert_id).await? {
            None => AppError::Core(CoreError::NotFound {
                entity: "Alert",
                id: alert_id,
            }),
            Some(_) => AppError::Core(CoreError::Conflict(format!(
                "alert {alert_id} is already resolved"
            ))),
        });
    };
    let mut event = AlertEvent::resolved(&alert);
    if let Some(staff_id) = staff_id {
        event = event.with_actor(staff_id);
    }
    let cursor = state.journal.append_with(&mut *tx, &event).await?;
    tx.commit().await?;
    event.id = Some(cursor);

    state.timer.cancel(alert_id);
    state.event_bus.publish(event);

    state
        .audit
        .record(
            "alert_resolved",
            "alert",
            alert.id,
            serde_json::json!({ "staff_id": staff_id }),
        )
        .await;

    tracing::info!(alert_id, staff_id, "Alert resolved");

    Ok(Json(DataResponse { data: alert }))
}

/// POST /api/v1/alerts/{id}/escalate
///
/// Force an immediate escalation attempt instead of waiting for the
/// deadline. The transition itself still goes through the timer
/// service's conditional update, so this returns 202 rather than the
/// updated alert.
pub async fn escalate_alert(
    State(state): State<AppState>,
    Path(alert_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let alert = AlertRepo::get(&state.pool, alert_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Alert",
            id: alert_id,
        }))?;

    if !alert.is_active() {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "alert {alert_id} is not active"
        ))));
    }

    state.timer.trigger(alert_id);

    state
        .audit
        .record(
            "alert_escalation_requested",
            "alert",
            alert_id,
            serde_json::json!({ "from_tier": alert.escalation_tier }),
        )
        .await;

    Ok(StatusCode::ACCEPTED)
}
