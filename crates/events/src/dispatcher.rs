//! Notification dispatch seam.
//!
//! The core decides who gets notified and hands the delivery off to a
//! [`NotificationSink`]. Delivery is fire-and-forget from the state
//! machine's point of view: the transition has already committed by
//! the time a sink runs, and sink failures are logged, never
//! propagated back.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use codecall_core::types::DbId;

use crate::bus::AlertEventKind;

/// Retry delays in seconds (exponential backoff: 1s, 2s, 4s).
const RETRY_DELAYS_SECS: [u64; 3] = [1, 2, 4];

/// HTTP request timeout for a single delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A staff member selected to receive a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipient {
    pub user_id: DbId,
    pub role: String,
}

/// What gets delivered to the recipients.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationPayload {
    pub alert_id: DbId,
    pub hospital_id: DbId,
    #[serde(rename = "type")]
    pub kind: AlertEventKind,
    /// Tier whose recipient set is being addressed.
    pub tier: i16,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for notification delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote server returned a non-2xx status code.
    #[error("Notification endpoint returned HTTP {0}")]
    HttpStatus(u16),
}

// ---------------------------------------------------------------------------
// Sink trait
// ---------------------------------------------------------------------------

/// Transport-owning notification dispatcher.
///
/// The transport owns its own retries; the caller bounds the whole
/// dispatch with a timeout and logs failures.
#[async_trait]
pub trait NotificationSink: Send + Sync + 'static {
    async fn dispatch(
        &self,
        recipients: &[Recipient],
        payload: &NotificationPayload,
    ) -> Result<(), DispatchError>;
}

// ---------------------------------------------------------------------------
// WebhookSink
// ---------------------------------------------------------------------------

/// Delivers notifications to an external HTTP endpoint (the hand-off
/// point to push/SMS/email infrastructure).
pub struct WebhookSink {
    client: reqwest::Client,
    url: String,
}

impl WebhookSink {
    /// Create a sink with a pre-configured HTTP client.
    pub fn new(url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self { client, url }
    }

    async fn try_send(&self, body: &serde_json::Value) -> Result<(), DispatchError> {
        let response = self.client.post(&self.url).json(body).send().await?;
        if !response.status().is_success() {
            return Err(DispatchError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    /// Deliver with up to 3 retries and exponential backoff.
    async fn dispatch(
        &self,
        recipients: &[Recipient],
        payload: &NotificationPayload,
    ) -> Result<(), DispatchError> {
        let body = serde_json::json!({
            "recipients": recipients,
            "notification": payload,
        });

        let mut last_err: Option<DispatchError> = None;

        for (attempt, delay_secs) in RETRY_DELAYS_SECS.iter().enumerate() {
            match self.try_send(&body).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        alert_id = payload.alert_id,
                        error = %e,
                        "Notification delivery attempt failed, retrying"
                    );
                    last_err = Some(e);
                    tokio::time::sleep(Duration::from_secs(*delay_secs)).await;
                }
            }
        }

        // Final attempt after the last backoff.
        match self.try_send(&body).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::error!(
                    alert_id = payload.alert_id,
                    error = %e,
                    "Notification delivery failed after all retries"
                );
                Err(last_err.unwrap_or(e))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// LogSink
// ---------------------------------------------------------------------------

/// Fallback sink used when no external endpoint is configured: logs
/// each dispatch so deliveries remain observable in development.
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn dispatch(
        &self,
        recipients: &[Recipient],
        payload: &NotificationPayload,
    ) -> Result<(), DispatchError> {
        tracing::info!(
            alert_id = payload.alert_id,
            hospital_id = payload.hospital_id,
            kind = payload.kind.as_str(),
            tier = payload.tier,
            recipient_count = recipients.len(),
            "Notification dispatched (log sink)"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_sink_accepts_empty_recipient_list() {
        let sink = LogSink;
        let payload = NotificationPayload {
            alert_id: 1,
            hospital_id: 1,
            kind: AlertEventKind::Created,
            tier: 1,
            message: "test".to_string(),
        };
        assert!(sink.dispatch(&[], &payload).await.is_ok());
    }

    #[test]
    fn payload_serializes_kind_as_type() {
        let payload = NotificationPayload {
            alert_id: 9,
            hospital_id: 2,
            kind: AlertEventKind::Escalated,
            tier: 2,
            message: "escalated".to_string(),
        };
        let json = serde_json::to_value(&payload).expect("serializes");
        assert_eq!(json["type"], "escalated");
        assert_eq!(json["tier"], 2);
    }
}
