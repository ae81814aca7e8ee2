use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use codecall_api::config::ServerConfig;
use codecall_api::notifications::NotificationRouter;
use codecall_api::router::build_app_router;
use codecall_api::state::AppState;
use codecall_api::ws;
use codecall_db::repositories::AlertRepo;
use codecall_events::audit::PgAuditSink;
use codecall_events::dispatcher::{LogSink, NotificationSink, WebhookSink};
use codecall_events::journal::PgEventJournal;
use codecall_events::store::PgAlertStore;
use codecall_events::timer::EscalationTimerService;
use codecall_events::{EventBus, PgDirectory};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "codecall_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    let policy = Arc::new(config.escalation_policy());
    tracing::info!(
        host = %config.host,
        port = %config.port,
        tiers = policy.tier_count(),
        "Loaded server configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = codecall_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    codecall_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    codecall_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- WebSocket manager ---
    let ws_manager = Arc::new(ws::WsManager::new());

    // --- Heartbeat ---
    let heartbeat_handle =
        ws::start_heartbeat(Arc::clone(&ws_manager), config.heartbeat_interval_secs);

    // --- Event bus and journal ---
    let event_bus = Arc::new(EventBus::default());
    let journal = Arc::new(PgEventJournal::new(pool.clone()));
    tracing::info!("Event bus and journal created");

    // --- Escalation timer service ---
    let store = Arc::new(PgAlertStore::new(pool.clone()));
    let (timer, mut timer_service) =
        EscalationTimerService::new(store, Arc::clone(&event_bus), Arc::clone(&policy));

    // Re-arm deadlines that were pending when the previous process
    // stopped; overdue ones fire immediately.
    let pending = AlertRepo::list_active_with_deadline(&pool)
        .await
        .expect("Failed to load pending escalation deadlines");
    let recovered = pending.len();
    timer_service.prime(
        pending
            .into_iter()
            .filter_map(|alert| alert.next_escalation_at.map(|at| (alert.id, at))),
    );
    tracing::info!(recovered, "Recovered pending escalation deadlines");

    let timer_cancel = tokio_util::sync::CancellationToken::new();
    let timer_handle = tokio::spawn(timer_service.run(timer_cancel.clone()));

    // --- WebSocket event broadcaster ---
    let broadcast_handle = ws::start_event_broadcast(&event_bus, Arc::clone(&ws_manager));

    // --- Notification router ---
    let audit = Arc::new(PgAuditSink::new(pool.clone()));
    let sink: Arc<dyn NotificationSink> = match &config.notify_webhook_url {
        Some(url) => {
            tracing::info!(url = %url, "Notifications delivered via webhook");
            Arc::new(WebhookSink::new(url.clone()))
        }
        None => {
            tracing::info!("NOTIFY_WEBHOOK_URL unset, notifications go to the log sink");
            Arc::new(LogSink)
        }
    };
    let directory = Arc::new(PgDirectory::new(pool.clone(), Arc::clone(&policy)));
    let notification_router = NotificationRouter::new(
        directory,
        sink,
        audit.clone() as Arc<dyn codecall_events::AuditSink>,
        Duration::from_secs(config.dispatch_timeout_secs),
    );
    let router_handle = tokio::spawn(notification_router.run(event_bus.subscribe()));

    tracing::info!("Event services started (timer, broadcaster, notification router)");

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        ws_manager: Arc::clone(&ws_manager),
        event_bus: Arc::clone(&event_bus),
        journal,
        timer,
        policy,
        audit,
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Stop the escalation timer first so no new events are produced.
    timer_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), timer_handle).await;
    tracing::info!("Escalation timer stopped");

    // Drop the event bus sender to close the broadcast channel.
    // This signals the broadcaster and notification router to shut down.
    drop(event_bus);
    let _ = tokio::time::timeout(Duration::from_secs(5), broadcast_handle).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), router_handle).await;
    tracing::info!("Event services shut down");

    let ws_count = ws_manager.connection_count().await;
    tracing::info!(ws_count, "Closing remaining WebSocket connections");
    ws_manager.shutdown_all().await;

    heartbeat_handle.abort();
    tracing::info!("Heartbeat task stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
