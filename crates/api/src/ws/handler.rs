use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;

use codecall_core::types::DbId;
use codecall_events::journal::{PgEventJournal, Replay};
use codecall_events::AlertEvent;

use crate::state::AppState;

/// Query parameters for the WebSocket subscription.
#[derive(Debug, Deserialize)]
pub struct WsParams {
    /// Hospital whose alert stream to subscribe to.
    pub hospital_id: DbId,
    /// Staff member identity, for targeted pushes.
    pub user_id: Option<DbId>,
    /// Role label attached to the connection.
    pub role: Option<String>,
    /// Journal cursor of the last event the client saw before
    /// disconnecting. Triggers replay of everything missed.
    pub last_event_id: Option<DbId>,
}

/// Frames to write before live forwarding starts, plus the replay
/// high-water mark used to suppress already-delivered live events.
pub struct ReplayPlan {
    pub frames: Vec<Message>,
    pub cutoff: Option<DbId>,
}

/// HTTP handler that upgrades the connection to WebSocket.
///
/// After the upgrade the connection is registered with `WsManager`,
/// missed events are replayed from the journal, and the connection is
/// managed by two tasks (sender + receiver).
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, params))
}

/// Manage a single WebSocket connection after upgrade.
///
/// The ordering here is load-bearing for lossless reconnects:
///
///   1. Register the connection so live events start queueing on its
///      channel.
///   2. Replay missed events from the journal directly to the sink.
///   3. Start the forward loop with the replay high-water mark; queued
///      live events at or below the mark were already replayed and are
///      dropped.
///   4. Process inbound frames on the current task, leaving when the
///      send task ends (channel closed by a stale sweep or shutdown).
///   5. Clean up on disconnect.
async fn handle_socket(socket: WebSocket, state: AppState, params: WsParams) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(
        conn_id = %conn_id,
        hospital_id = params.hospital_id,
        last_event_id = params.last_event_id,
        "WebSocket connected"
    );

    // Register first: anything published from here on lands in rx.
    let mut rx = state
        .ws_manager
        .add(
            conn_id.clone(),
            params.hospital_id,
            params.user_id,
            params.role.clone(),
        )
        .await;

    let (mut sink, mut stream) = socket.split();

    // Replay missed events before forwarding live traffic.
    let plan = plan_replay(
        &state.journal,
        params.hospital_id,
        params.last_event_id,
        state.config.replay_backlog,
    )
    .await;
    let cutoff = plan.cutoff;
    for frame in plan.frames {
        if sink.send(frame).await.is_err() {
            state.ws_manager.remove(&conn_id).await;
            return;
        }
    }

    // Sender task: forward channel messages to the WebSocket sink,
    // dropping journaled events the replay already delivered.
    let sender_conn_id = conn_id.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(out) = rx.recv().await {
            if already_delivered(cutoff, out.event_id) {
                continue;
            }
            if sink.send(out.message).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    // Receiver loop: process inbound messages. Also exits when the
    // send task ends — a stale sweep or server shutdown closed the
    // channel, and the socket must be torn down even if the client
    // never closes its side.
    loop {
        tokio::select! {
            _ = &mut send_task => break,
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(Message::Pong(_))) => {
                    state.ws_manager.record_pong(&conn_id).await;
                }
                Some(Ok(_msg)) => {
                    // Clients only listen on this stream; state changes
                    // go through the HTTP API.
                }
                Some(Err(e)) => {
                    tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                    break;
                }
            },
        }
    }

    // Clean up: remove connection and abort sender task.
    state.ws_manager.remove(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, "WebSocket disconnected");
}

/// Compute the frames a (re)connecting client must receive before live
/// forwarding starts.
///
/// With no cursor there is nothing to replay. With a cursor, the
/// journal either yields the missed events — serialized in cursor
/// order, with the highest cursor becoming the live-suppression
/// high-water mark — or the client gets an explicit gap frame telling
/// it to refetch full state. A journal read failure is treated exactly
/// like a gap: the client must never mistake a partial stream for a
/// complete one.
pub async fn plan_replay(
    journal: &PgEventJournal,
    hospital_id: DbId,
    last_event_id: Option<DbId>,
    backlog: i64,
) -> ReplayPlan {
    let Some(after_id) = last_event_id else {
        return ReplayPlan {
            frames: Vec::new(),
            cutoff: None,
        };
    };

    match journal.replay_since(hospital_id, after_id, backlog).await {
        Ok(Replay::Events(events)) => {
            let mut cutoff = after_id;
            let mut frames = Vec::with_capacity(events.len());
            for event in &events {
                if let Some(id) = event.id {
                    cutoff = cutoff.max(id);
                }
                if let Some(frame) = event_frame(event) {
                    frames.push(frame);
                }
            }
            tracing::debug!(hospital_id, count = frames.len(), "Replaying missed events");
            ReplayPlan {
                frames,
                cutoff: Some(cutoff),
            }
        }
        Ok(Replay::GapDetected) => {
            tracing::info!(hospital_id, after_id, "Replay cursor out of backlog window");
            ReplayPlan {
                frames: vec![gap_frame()],
                cutoff: None,
            }
        }
        Err(e) => {
            tracing::error!(hospital_id, after_id, error = %e, "Event replay failed");
            ReplayPlan {
                frames: vec![gap_frame()],
                cutoff: None,
            }
        }
    }
}

/// Whether a live event was already delivered by replay.
pub fn already_delivered(cutoff: Option<DbId>, event_id: Option<DbId>) -> bool {
    matches!((cutoff, event_id), (Some(cut), Some(id)) if id <= cut)
}

/// Serialize one journaled event into a text frame.
fn event_frame(event: &AlertEvent) -> Option<Message> {
    match serde_json::to_string(event) {
        Ok(text) => Some(Message::Text(text.into())),
        Err(e) => {
            tracing::error!(alert_id = event.alert_id, error = %e, "Failed to serialize event");
            None
        }
    }
}

/// The frame that tells a client its cursor cannot be replayed.
fn gap_frame() -> Message {
    let gap = serde_json::json!({ "type": "gap" });
    Message::Text(gap.to_string().into())
}
