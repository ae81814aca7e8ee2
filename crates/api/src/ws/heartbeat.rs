use std::sync::Arc;
use std::time::Duration;

use crate::ws::manager::WsManager;

/// A connection is considered stale after missing this many heartbeat
/// intervals' worth of Pongs.
const STALE_AFTER_INTERVALS: u32 = 3;

/// Spawn a background task that sends periodic Ping frames to all
/// connected WebSocket clients and drops connections that have stopped
/// answering.
///
/// The task runs until aborted via the returned `JoinHandle` during
/// shutdown.
pub fn start_heartbeat(
    ws_manager: Arc<WsManager>,
    interval_secs: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        let max_age = Duration::from_secs(interval_secs * u64::from(STALE_AFTER_INTERVALS));

        loop {
            interval.tick().await;
            let count = ws_manager.connection_count().await;
            tracing::debug!(count, "WebSocket heartbeat ping");
            ws_manager.ping_all().await;

            let dropped = ws_manager.sweep_stale(max_age).await;
            if dropped > 0 {
                tracing::warn!(dropped, "Swept stale WebSocket connections");
            }
        }
    })
}
