use axum::routing::{get, post};
use axum::Router;

use crate::handlers::alerts;
use crate::state::AppState;

/// Mount `/alerts` routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/alerts", post(alerts::create_alert))
        .route("/alerts/{id}", get(alerts::get_alert))
        .route("/alerts/{id}/escalation", get(alerts::escalation_status))
        .route("/alerts/{id}/acknowledge", post(alerts::acknowledge_alert))
        .route("/alerts/{id}/resolve", post(alerts::resolve_alert))
        .route("/alerts/{id}/escalate", post(alerts::escalate_alert))
}
