use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use codecall_api::config::ServerConfig;
use codecall_api::router::build_app_router;
use codecall_api::state::AppState;
use codecall_api::ws::WsManager;
use codecall_core::types::DbId;
use codecall_events::audit::PgAuditSink;
use codecall_events::journal::PgEventJournal;
use codecall_events::store::PgAlertStore;
use codecall_events::timer::EscalationTimerService;
use codecall_events::EventBus;

/// Build a test `ServerConfig` with safe defaults.
///
/// Escalation timeouts are long enough that no deadline fires during a
/// test unless the test forces one.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        escalation_tier_secs: vec![3600, 3600, 3600],
        tier_one_by_urgency_secs: [3600; 5],
        ..ServerConfig::default()
    }
}

/// Build the full application router with all middleware layers, using the
/// given database pool.
///
/// This mirrors the wiring in `main.rs`: a real timer service, event
/// bus, and journal run behind the router, so transitions exercise the
/// same paths production uses. The timer service exits on its own when
/// the state (and with it the command channel) is dropped.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let policy = Arc::new(config.escalation_policy());
    let ws_manager = Arc::new(WsManager::new());
    let event_bus = Arc::new(EventBus::default());
    let journal = Arc::new(PgEventJournal::new(pool.clone()));
    let audit = Arc::new(PgAuditSink::new(pool.clone()));

    let store = Arc::new(PgAlertStore::new(pool.clone()));
    let (timer, timer_service) =
        EscalationTimerService::new(store, Arc::clone(&event_bus), Arc::clone(&policy));
    tokio::spawn(timer_service.run(tokio_util::sync::CancellationToken::new()));

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        ws_manager,
        event_bus,
        journal,
        timer,
        policy,
        audit,
    };

    build_app_router(state, &config)
}

/// Insert a hospital row and return its ID.
pub async fn seed_hospital(pool: &PgPool, name: &str) -> DbId {
    sqlx::query_scalar("INSERT INTO hospitals (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await
        .expect("failed to seed hospital")
}

/// Insert a staff member and return their ID.
#[allow(dead_code)]
pub async fn seed_staff(
    pool: &PgPool,
    hospital_id: DbId,
    name: &str,
    role: &str,
    on_duty: bool,
) -> DbId {
    sqlx::query_scalar(
        "INSERT INTO staff (hospital_id, name, role, on_duty) \
         VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(hospital_id)
    .bind(name)
    .bind(role)
    .bind(on_duty)
    .fetch_one(pool)
    .await
    .expect("failed to seed staff member")
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

/// Send a GET request to the app.
pub async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request builds"),
    )
    .await
    .expect("request succeeds")
}

/// Send a POST request with a JSON body.
pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request builds"),
    )
    .await
    .expect("request succeeds")
}

/// Send a PUT request with a JSON body.
#[allow(dead_code)]
pub async fn put_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    app.oneshot(
        Request::builder()
            .method("PUT")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request builds"),
    )
    .await
    .expect("request succeeds")
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body collects")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body is valid JSON")
}

/// Assert a status and return the parsed body.
#[allow(dead_code)]
pub async fn expect_status(response: Response, status: StatusCode) -> serde_json::Value {
    assert_eq!(response.status(), status);
    body_json(response).await
}

/// Let spawned background tasks (timer commands, bus consumers) run.
#[allow(dead_code)]
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
