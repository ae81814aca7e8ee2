//! Event-to-notification routing engine.
//!
//! [`NotificationRouter`] subscribes to the event bus and, for each
//! transition that widens the alert's audience (creation and tier
//! escalation), resolves the on-duty recipients for the new tier and
//! hands delivery to the configured transport.
//!
//! Delivery failures never feed back into the state machine: the
//! transition already committed, so failures are logged and audited
//! and the escalation ladder keeps running.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use codecall_core::escalation::TierNumber;
use codecall_events::audit::AuditSink;
use codecall_events::directory::Directory;
use codecall_events::dispatcher::{NotificationPayload, NotificationSink, Recipient};
use codecall_events::{AlertEvent, AlertEventKind};

/// Routes alert events to staff notifications.
pub struct NotificationRouter {
    directory: Arc<dyn Directory>,
    sink: Arc<dyn NotificationSink>,
    audit: Arc<dyn AuditSink>,
    /// Upper bound on one dispatch, including transport retries.
    dispatch_timeout: Duration,
}

impl NotificationRouter {
    pub fn new(
        directory: Arc<dyn Directory>,
        sink: Arc<dyn NotificationSink>,
        audit: Arc<dyn AuditSink>,
        dispatch_timeout: Duration,
    ) -> Self {
        Self {
            directory,
            sink,
            audit,
            dispatch_timeout,
        }
    }

    /// Run the main routing loop.
    ///
    /// Subscribes to the event bus via `receiver` and processes each event.
    /// The loop exits when the channel is closed (i.e. the
    /// [`EventBus`](codecall_events::EventBus) is dropped).
    pub async fn run(self, mut receiver: broadcast::Receiver<AlertEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => self.route_event(&event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notification router lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notification router shutting down");
                    break;
                }
            }
        }
    }

    /// Route a single event, if it is one that notifies anyone.
    async fn route_event(&self, event: &AlertEvent) {
        // Only transitions into a tier notify staff; acknowledgments
        // and resolutions reach clients over the WebSocket stream.
        let tier: TierNumber = match (event.kind, event.to_tier) {
            (AlertEventKind::Created, Some(tier)) => tier,
            (AlertEventKind::Escalated, Some(tier)) => tier,
            _ => return,
        };

        let recipients = match self.directory.eligible_for_tier(event.hospital_id, tier).await {
            Ok(recipients) => recipients,
            Err(e) => {
                tracing::error!(
                    alert_id = event.alert_id,
                    tier,
                    error = %e,
                    "Failed to resolve notification recipients"
                );
                return;
            }
        };

        if recipients.is_empty() {
            tracing::warn!(
                alert_id = event.alert_id,
                hospital_id = event.hospital_id,
                tier,
                "No on-duty staff eligible for tier; nobody notified"
            );
        }

        let payload = NotificationPayload {
            alert_id: event.alert_id,
            hospital_id: event.hospital_id,
            kind: event.kind,
            tier,
            message: describe(event, tier),
        };

        self.dispatch(&recipients, &payload).await;
    }

    /// Deliver with a hard timeout, then audit the outcome.
    async fn dispatch(&self, recipients: &[Recipient], payload: &NotificationPayload) {
        let outcome =
            tokio::time::timeout(self.dispatch_timeout, self.sink.dispatch(recipients, payload))
                .await;

        let (action, detail) = match outcome {
            Ok(Ok(())) => ("notification_sent", serde_json::Value::Null),
            Ok(Err(e)) => {
                tracing::error!(
                    alert_id = payload.alert_id,
                    tier = payload.tier,
                    error = %e,
                    "Notification delivery failed"
                );
                ("notification_failed", serde_json::json!(e.to_string()))
            }
            Err(_) => {
                tracing::error!(
                    alert_id = payload.alert_id,
                    tier = payload.tier,
                    "Notification delivery timed out"
                );
                ("notification_failed", serde_json::json!("timed out"))
            }
        };

        self.audit
            .record(
                action,
                "alert",
                payload.alert_id,
                serde_json::json!({
                    "tier": payload.tier,
                    "recipient_count": recipients.len(),
                    "recipient_ids": recipients.iter().map(|r| r.user_id).collect::<Vec<_>>(),
                    "detail": detail,
                }),
            )
            .await;
    }
}

/// Human-readable notification line for an event.
fn describe(event: &AlertEvent, tier: TierNumber) -> String {
    match event.kind {
        AlertEventKind::Created => {
            let room = event
                .payload
                .get("room")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown room");
            format!("New alert in {room} (alert #{})", event.alert_id)
        }
        AlertEventKind::Escalated => format!(
            "Alert #{} escalated to tier {tier} without acknowledgment",
            event.alert_id
        ),
        _ => format!("Alert #{} updated", event.alert_id),
    }
}
