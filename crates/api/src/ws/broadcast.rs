//! Bus-to-WebSocket event broadcaster.
//!
//! Consumes the event bus and pushes every alert event to the
//! WebSocket subscribers of the event's hospital. Each frame carries
//! the event's journal cursor so per-connection forward loops can
//! deduplicate against reconnect replay.

use std::sync::Arc;

use axum::extract::ws::Message;
use tokio::sync::broadcast;

use codecall_events::{AlertEvent, EventBus};

use crate::ws::manager::WsManager;

/// Spawn the broadcaster task.
///
/// The task exits when the bus is dropped (channel closed).
pub fn start_event_broadcast(
    bus: &EventBus,
    ws_manager: Arc<WsManager>,
) -> tokio::task::JoinHandle<()> {
    let mut receiver = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    broadcast_event(&ws_manager, &event).await;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    // Clients that missed these frames recover through
                    // journal replay on reconnect.
                    tracing::warn!(skipped = n, "WebSocket broadcaster lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, WebSocket broadcaster shutting down");
                    break;
                }
            }
        }
    })
}

async fn broadcast_event(ws_manager: &WsManager, event: &AlertEvent) {
    let text = match serde_json::to_string(event) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(alert_id = event.alert_id, error = %e, "Failed to serialize event");
            return;
        }
    };

    let sent = ws_manager
        .send_to_hospital(event.hospital_id, event.id, Message::Text(text.into()))
        .await;
    tracing::trace!(
        alert_id = event.alert_id,
        hospital_id = event.hospital_id,
        sent,
        "Broadcast alert event"
    );
}
