//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the fan-out hub between the producers of alert
//! state transitions (handlers, escalation timer) and their consumers
//! (WebSocket broadcaster, notification router). It is designed to be
//! shared via `Arc<EventBus>` across the application.
//!
//! The bus itself is at-most-once: no persistence, no replay. Replay
//! for reconnecting clients is the journal's job
//! (see [`crate::journal`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use codecall_core::types::DbId;
use codecall_db::models::alert::Alert;

// ---------------------------------------------------------------------------
// AlertEvent
// ---------------------------------------------------------------------------

/// Alert lifecycle transition kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertEventKind {
    Created,
    Acknowledged,
    Escalated,
    Resolved,
}

impl AlertEventKind {
    /// Wire/journal name for the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Acknowledged => "acknowledged",
            Self::Escalated => "escalated",
            Self::Resolved => "resolved",
        }
    }

    /// Parse a journal `kind` column value.
    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "created" => Some(Self::Created),
            "acknowledged" => Some(Self::Acknowledged),
            "escalated" => Some(Self::Escalated),
            "resolved" => Some(Self::Resolved),
            _ => None,
        }
    }
}

/// A single alert state transition, as published on the bus and pushed
/// to WebSocket clients.
///
/// Constructed via the per-kind constructors ([`AlertEvent::created`],
/// [`AlertEvent::escalated`], ...) and enriched with
/// [`with_actor`](AlertEvent::with_actor).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEvent {
    /// Journal cursor ID; `None` until the event has been journaled.
    pub id: Option<DbId>,

    /// Transition kind. Serialized as `"type"` on the wire.
    #[serde(rename = "type")]
    pub kind: AlertEventKind,

    pub alert_id: DbId,

    /// Hospital the alert belongs to; consumers filter on this.
    pub hospital_id: DbId,

    /// Tier before an escalation transition.
    pub from_tier: Option<i16>,

    /// Tier after an escalation transition.
    pub to_tier: Option<i16>,

    /// Staff member that triggered the transition, when there is one.
    pub actor_id: Option<DbId>,

    /// Event-specific data (room, urgency, next deadline, ...).
    pub payload: serde_json::Value,

    /// When the transition occurred (UTC).
    pub timestamp: DateTime<Utc>,
}

impl AlertEvent {
    fn new(kind: AlertEventKind, alert_id: DbId, hospital_id: DbId) -> Self {
        Self {
            id: None,
            kind,
            alert_id,
            hospital_id,
            from_tier: None,
            to_tier: None,
            actor_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    /// Event for a freshly created alert.
    pub fn created(alert: &Alert) -> Self {
        let mut event = Self::new(AlertEventKind::Created, alert.id, alert.hospital_id);
        event.to_tier = Some(alert.escalation_tier);
        event.payload = serde_json::json!({
            "room": alert.room,
            "alert_type": alert.alert_type,
            "urgency": alert.urgency,
            "description": alert.description,
            "next_escalation_at": alert.next_escalation_at,
        });
        event
    }

    /// Event for an acknowledged alert.
    pub fn acknowledged(alert: &Alert) -> Self {
        let mut event = Self::new(AlertEventKind::Acknowledged, alert.id, alert.hospital_id);
        event.from_tier = Some(alert.escalation_tier);
        event.actor_id = alert.acknowledged_by;
        event.payload = serde_json::json!({
            "acknowledged_at": alert.acknowledged_at,
        });
        event
    }

    /// Event for a tier escalation.
    pub fn escalated(
        alert_id: DbId,
        hospital_id: DbId,
        from_tier: i16,
        to_tier: i16,
        next_deadline: Option<DateTime<Utc>>,
    ) -> Self {
        let mut event = Self::new(AlertEventKind::Escalated, alert_id, hospital_id);
        event.from_tier = Some(from_tier);
        event.to_tier = Some(to_tier);
        event.payload = serde_json::json!({
            "next_escalation_at": next_deadline,
        });
        event
    }

    /// Event for a resolved alert.
    pub fn resolved(alert: &Alert) -> Self {
        let mut event = Self::new(AlertEventKind::Resolved, alert.id, alert.hospital_id);
        event.from_tier = Some(alert.escalation_tier);
        event.payload = serde_json::json!({
            "resolved_at": alert.resolved_at,
        });
        event
    }

    /// Attach the acting staff member to the event.
    pub fn with_actor(mut self, actor_id: DbId) -> Self {
        self.actor_id = Some(actor_id);
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`AlertEvent`]. Publishing
/// never blocks on slow consumers; a lagging receiver observes
/// `RecvError::Lagged` and reconciles via the journal.
pub struct EventBus {
    sender: broadcast::Sender<AlertEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently
    /// dropped; durable capture already happened in the journal.
    pub fn publish(&self, event: AlertEvent) {
        // Ignore the SendError — it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<AlertEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn escalation_event() -> AlertEvent {
        AlertEvent::escalated(42, 7, 1, 2, None).with_actor(3)
    }

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(escalation_event());

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.kind, AlertEventKind::Escalated);
        assert_eq!(received.alert_id, 42);
        assert_eq!(received.hospital_id, 7);
        assert_eq!(received.from_tier, Some(1));
        assert_eq!(received.to_tier, Some(2));
        assert_eq!(received.actor_id, Some(3));
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(escalation_event());

        let e1 = rx1.recv().await.expect("subscriber 1 should receive");
        let e2 = rx2.recv().await.expect("subscriber 2 should receive");

        assert_eq!(e1.alert_id, 42);
        assert_eq!(e2.alert_id, 42);
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        // No subscribers — this must not panic.
        bus.publish(escalation_event());
    }

    #[test]
    fn kind_serializes_as_type_field() {
        let json = serde_json::to_value(escalation_event()).expect("serializes");
        assert_eq!(json["type"], "escalated");
        assert!(json.get("kind").is_none());
    }

    #[test]
    fn kind_round_trips_through_journal_names() {
        for kind in [
            AlertEventKind::Created,
            AlertEventKind::Acknowledged,
            AlertEventKind::Escalated,
            AlertEventKind::Resolved,
        ] {
            assert_eq!(AlertEventKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(AlertEventKind::from_str("bogus"), None);
    }
}
