//! Codecall event pipeline: bus, journal, escalation timer, and the
//! external collaborator seams.
//!
//! This crate provides the building blocks of the alerting core:
//!
//! - [`EventBus`] — in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`AlertEvent`] — the canonical alert event envelope.
//! - [`EscalationTimerService`] — single driver loop that fires
//!   tier escalations at their absolute deadlines.
//! - [`journal`] — durable event journal; its row IDs are the replay
//!   cursors used by reconnecting WebSocket clients.
//! - [`store`], [`directory`], [`dispatcher`], [`audit`] — trait
//!   interfaces to the alert store, staff directory, notification
//!   transport, and audit trail, with Postgres-backed implementations.

pub mod audit;
pub mod bus;
pub mod directory;
pub mod dispatcher;
pub mod journal;
pub mod store;
pub mod timer;

pub use audit::{AuditSink, PgAuditSink};
pub use bus::{AlertEvent, AlertEventKind, EventBus};
pub use directory::{Directory, PgDirectory};
pub use dispatcher::{LogSink, NotificationPayload, NotificationSink, Recipient, WebhookSink};
pub use journal::{PgEventJournal, Replay};
pub use store::{AlertStore, PgAlertStore, StoreError};
pub use timer::{EscalationTimer, EscalationTimerService};
