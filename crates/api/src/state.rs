use std::sync::Arc;

use codecall_core::escalation::EscalationPolicy;
use codecall_events::audit::AuditSink;
use codecall_events::journal::PgEventJournal;
use codecall_events::timer::EscalationTimer;
use codecall_events::EventBus;

use crate::config::ServerConfig;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: codecall_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// WebSocket connection manager (dashboard clients).
    pub ws_manager: Arc<WsManager>,
    /// In-process event bus for alert state transitions.
    pub event_bus: Arc<EventBus>,
    /// Durable event journal; source of replay cursors.
    pub journal: Arc<PgEventJournal>,
    /// Handle to the escalation timer service.
    pub timer: EscalationTimer,
    /// The configured escalation ladder.
    pub policy: Arc<EscalationPolicy>,
    /// Compliance audit trail.
    pub audit: Arc<dyn AuditSink>,
}
