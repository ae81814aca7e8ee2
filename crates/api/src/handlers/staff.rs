//! Handlers for hospitals and the staff duty roster.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use codecall_core::error::CoreError;
use codecall_core::types::DbId;
use codecall_db::models::hospital::Hospital;
use codecall_db::models::staff::StaffMember;
use codecall_db::repositories::{HospitalRepo, StaffRepo};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Body for `PUT /staff/{id}/duty`.
#[derive(Debug, Deserialize)]
pub struct DutyBody {
    pub on_duty: bool,
}

/// GET /api/v1/hospitals
pub async fn list_hospitals(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<Hospital>>>> {
    let hospitals = HospitalRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: hospitals }))
}

/// GET /api/v1/hospitals/{id}/staff
pub async fn list_staff(
    State(state): State<AppState>,
    Path(hospital_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<StaffMember>>>> {
    // 404 for an unknown hospital rather than an empty roster.
    HospitalRepo::get(&state.pool, hospital_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Hospital",
            id: hospital_id,
        }))?;

    let staff = StaffRepo::list_for_hospital(&state.pool, hospital_id).await?;
    Ok(Json(DataResponse { data: staff }))
}

/// PUT /api/v1/staff/{id}/duty
///
/// Flip a staff member's on-duty flag. Off-duty staff stop receiving
/// escalation notifications immediately.
pub async fn set_duty(
    State(state): State<AppState>,
    Path(staff_id): Path<DbId>,
    Json(body): Json<DutyBody>,
) -> AppResult<Json<DataResponse<StaffMember>>> {
    let member = StaffRepo::set_on_duty(&state.pool, staff_id, body.on_duty)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Staff member",
            id: staff_id,
        }))?;

    state
        .audit
        .record(
            "staff_duty_changed",
            "staff",
            staff_id,
            serde_json::json!({ "on_duty": body.on_duty }),
        )
        .await;

    Ok(Json(DataResponse { data: member }))
}
