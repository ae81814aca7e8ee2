//! WebSocket infrastructure: connection manager, upgrade handler,
//! event broadcaster, and heartbeat task.

pub mod broadcast;
pub mod handler;
pub mod heartbeat;
pub mod manager;

pub use broadcast::start_event_broadcast;
pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use manager::{Outbound, WsManager};
