use axum::routing::{get, put};
use axum::Router;

use crate::handlers::{alerts, staff};
use crate::state::AppState;

/// Mount `/hospitals` and `/staff` routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/hospitals", get(staff::list_hospitals))
        .route("/hospitals/{id}/alerts", get(alerts::list_active_alerts))
        .route("/hospitals/{id}/staff", get(staff::list_staff))
        .route("/staff/{id}/duty", put(staff::set_duty))
}
