pub mod alerts;
pub mod health;
pub mod hospitals;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws                                WebSocket subscription
///
/// /alerts                            create (POST)
/// /alerts/{id}                       get
/// /alerts/{id}/escalation            escalation status (GET)
/// /alerts/{id}/acknowledge           acknowledge (POST)
/// /alerts/{id}/resolve               resolve (POST)
/// /alerts/{id}/escalate              force escalation (POST)
///
/// /hospitals                         list
/// /hospitals/{id}/alerts             active alerts
/// /hospitals/{id}/staff              staff roster
///
/// /staff/{id}/duty                   set on-duty flag (PUT)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .merge(alerts::router())
        .merge(hospitals::router())
}
