use std::collections::HashMap;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::Message;
use tokio::sync::{mpsc, RwLock};

use codecall_core::types::{DbId, Timestamp};

/// An outbound frame with its journal cursor, when it has one.
///
/// The cursor lets a connection's forward loop drop live events the
/// client already received during reconnect replay.
#[derive(Debug, Clone)]
pub struct Outbound {
    /// Journal cursor of the event carried in `message`; `None` for
    /// control frames (pings, close) and unjournaled messages.
    pub event_id: Option<DbId>,
    pub message: Message,
}

impl Outbound {
    /// A control frame with no cursor.
    pub fn control(message: Message) -> Self {
        Self {
            event_id: None,
            message,
        }
    }
}

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Outbound>;

/// Metadata for a single WebSocket connection.
pub struct WsConnection {
    /// Hospital whose alert stream this connection subscribed to.
    pub hospital_id: DbId,
    /// Staff member on the other end, when identified.
    pub user_id: Option<DbId>,
    /// Role filter, e.g. only send doctor-tier traffic.
    pub role: Option<String>,
    /// Channel sender for outbound messages to this connection.
    pub sender: WsSender,
    /// When this connection was established.
    pub connected_at: Timestamp,
    /// Last time a Pong frame arrived; drives stale-connection sweeps.
    pub last_pong: Timestamp,
}

/// Manages all active WebSocket connections.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared across the application.
pub struct WsManager {
    connections: RwLock<HashMap<String, WsConnection>>,
}

impl WsManager {
    /// Create a new, empty connection manager.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new connection subscribed to one hospital's stream.
    ///
    /// Returns the receiver half of the message channel so the caller can
    /// forward messages to the WebSocket sink.
    pub async fn add(
        &self,
        conn_id: String,
        hospital_id: DbId,
        user_id: Option<DbId>,
        role: Option<String>,
    ) -> mpsc::UnboundedReceiver<Outbound> {
        let (tx, rx) = mpsc::unbounded_channel();
        let now = chrono::Utc::now();
        let conn = WsConnection {
            hospital_id,
            user_id,
            role,
            sender: tx,
            connected_at: now,
            last_pong: now,
        };
        self.connections.write().await.insert(conn_id, conn);
        rx
    }

    /// Remove a connection by its ID.
    pub async fn remove(&self, conn_id: &str) {
        self.connections.write().await.remove(conn_id);
    }

    /// Record a Pong arrival for a connection.
    pub async fn record_pong(&self, conn_id: &str) {
        if let Some(conn) = self.connections.write().await.get_mut(conn_id) {
            conn.last_pong = chrono::Utc::now();
        }
    }

    /// Send a journaled event to every subscriber of a hospital.
    ///
    /// Connections whose send channels are closed are silently skipped
    /// (they will be cleaned up on their next receive loop iteration).
    /// Returns the number of connections the message was sent to.
    pub async fn send_to_hospital(
        &self,
        hospital_id: DbId,
        event_id: Option<DbId>,
        message: Message,
    ) -> usize {
        let conns = self.connections.read().await;
        let mut count = 0;
        for conn in conns.values() {
            if conn.hospital_id == hospital_id {
                let _ = conn.sender.send(Outbound {
                    event_id,
                    message: message.clone(),
                });
                count += 1;
            }
        }
        count
    }

    /// Send a message to a hospital's connections carrying a specific
    /// role, e.g. every on-shift doctor's dashboard.
    ///
    /// Returns the number of connections the message was sent to.
    pub async fn send_to_role(&self, hospital_id: DbId, role: &str, message: Message) -> usize {
        let conns = self.connections.read().await;
        let mut count = 0;
        for conn in conns.values() {
            if conn.hospital_id == hospital_id && conn.role.as_deref() == Some(role) {
                let _ = conn.sender.send(Outbound::control(message.clone()));
                count += 1;
            }
        }
        count
    }

    /// Send a message to all connections belonging to a specific user.
    ///
    /// Returns the number of connections the message was sent to.
    pub async fn send_to_user(&self, user_id: DbId, message: Message) -> usize {
        let conns = self.connections.read().await;
        let mut count = 0;
        for conn in conns.values() {
            if conn.user_id == Some(user_id) {
                let _ = conn.sender.send(Outbound::control(message.clone()));
                count += 1;
            }
        }
        count
    }

    /// Return the current number of active connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Send a Ping frame to every connected client.
    ///
    /// Used by the heartbeat task to keep connections alive and detect
    /// stale ones.
    pub async fn ping_all(&self) {
        let conns = self.connections.read().await;
        for conn in conns.values() {
            let _ = conn
                .sender
                .send(Outbound::control(Message::Ping(Bytes::new())));
        }
    }

    /// Terminate connections whose last Pong is older than `max_age`.
    ///
    /// A Close frame goes out first; dropping the sender then ends the
    /// connection's send task, and the connection task observes that
    /// and tears the socket down even if the client keeps the TCP side
    /// open. Returns the number of terminated connections.
    pub async fn sweep_stale(&self, max_age: Duration) -> usize {
        let cutoff = chrono::Utc::now()
            - chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX);
        let mut conns = self.connections.write().await;
        let before = conns.len();
        conns.retain(|conn_id, conn| {
            let live = conn.last_pong >= cutoff;
            if !live {
                tracing::info!(conn_id = %conn_id, "Terminating stale WebSocket connection");
                let _ = conn.sender.send(Outbound::control(Message::Close(None)));
            }
            live
        });
        before - conns.len()
    }

    /// Send a Close frame to every connection, then clear the map.
    ///
    /// Used during graceful shutdown to notify all clients before the
    /// server stops accepting new connections.
    pub async fn shutdown_all(&self) {
        let mut conns = self.connections.write().await;
        let count = conns.len();
        for conn in conns.values() {
            let _ = conn.sender.send(Outbound::control(Message::Close(None)));
        }
        conns.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }
}

impl Default for WsManager {
    fn default() -> Self {
        Self::new()
    }
}
