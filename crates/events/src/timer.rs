//! Escalation timer service.
//!
//! One driver loop owns a sorted-deadline queue for every active
//! alert instead of one OS timer per alert. Deadlines are absolute
//! wall-clock timestamps: the sleep is recomputed from the wall clock
//! on every loop iteration, so a paused or slow process catches up on
//! overdue alerts instead of drifting.
//!
//! A deadline fire never trusts its own view of the alert: the
//! conditional update against the alert store is the single
//! synchronization point. If an acknowledgment (or an earlier fire)
//! already transitioned the row, the update matches zero rows and the
//! fire is a no-op. Cancellation is therefore an optimization, not a
//! correctness requirement — a stale fire is always harmless.
//!
//! Store failures never block the loop: the failed alert is re-queued
//! with a backoff deadline and every other alert keeps firing on
//! schedule.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use codecall_core::escalation::{deadline_after, EscalationPolicy};
use codecall_core::types::{DbId, Timestamp};
use codecall_core::urgency::UrgencyLevel;

use crate::bus::{AlertEvent, EventBus};
use crate::store::{AlertStore, StoreError};

/// Store retry delays (exponential backoff: 1s, 2s, 4s). Further
/// attempts stay at the last delay and alarm at error level.
const RETRY_DELAYS_SECS: [u64; 3] = [1, 2, 4];

/// Commands accepted by the timer driver loop.
#[derive(Debug)]
enum TimerCommand {
    /// Register or replace the wake-up for an alert.
    Schedule { alert_id: DbId, deadline: Timestamp },
    /// Remove any pending wake-up. Safe when none exists.
    Cancel { alert_id: DbId },
    /// Force the escalation transition out of band (manual/admin).
    Trigger { alert_id: DbId },
}

/// Cloneable handle for talking to the timer service.
///
/// All methods are fire-and-forget; if the service has shut down the
/// command is dropped with a warning.
#[derive(Clone)]
pub struct EscalationTimer {
    tx: mpsc::UnboundedSender<TimerCommand>,
}

impl EscalationTimer {
    /// Register or replace the escalation deadline for an alert.
    pub fn schedule(&self, alert_id: DbId, deadline: Timestamp) {
        self.send(TimerCommand::Schedule { alert_id, deadline });
    }

    /// Cancel any pending escalation for an alert.
    pub fn cancel(&self, alert_id: DbId) {
        self.send(TimerCommand::Cancel { alert_id });
    }

    /// Force an immediate escalation attempt for an alert.
    pub fn trigger(&self, alert_id: DbId) {
        self.send(TimerCommand::Trigger { alert_id });
    }

    fn send(&self, command: TimerCommand) {
        if self.tx.send(command).is_err() {
            tracing::warn!("Escalation timer service is gone; command dropped");
        }
    }
}

/// The driver loop state.
///
/// `deadlines` holds the live deadline per alert; `queue` may contain
/// stale entries from superseded schedules or cancels, which are
/// skipped lazily when they surface at the top of the heap.
pub struct EscalationTimerService<S> {
    store: Arc<S>,
    bus: Arc<EventBus>,
    policy: Arc<EscalationPolicy>,
    rx: mpsc::UnboundedReceiver<TimerCommand>,
    deadlines: HashMap<DbId, Timestamp>,
    queue: BinaryHeap<Reverse<(Timestamp, DbId)>>,
    retries: HashMap<DbId, usize>,
}

impl<S> EscalationTimerService<S>
where
    S: AlertStore,
{
    /// Create the service and its command handle.
    pub fn new(
        store: Arc<S>,
        bus: Arc<EventBus>,
        policy: Arc<EscalationPolicy>,
    ) -> (EscalationTimer, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let service = Self {
            store,
            bus,
            policy,
            rx,
            deadlines: HashMap::new(),
            queue: BinaryHeap::new(),
            retries: HashMap::new(),
        };
        (EscalationTimer { tx }, service)
    }

    /// Pre-load deadlines before the loop starts (crash recovery).
    ///
    /// Overdue entries fire on the first loop iteration.
    pub fn prime(&mut self, entries: impl IntoIterator<Item = (DbId, Timestamp)>) {
        for (alert_id, deadline) in entries {
            self.insert_deadline(alert_id, deadline);
        }
    }

    /// Run the driver loop until cancelled or all handles are dropped.
    pub async fn run(mut self, cancel: CancellationToken) {
        tracing::info!(
            pending = self.deadlines.len(),
            "Escalation timer service started"
        );

        loop {
            let next = self.next_live_deadline();

            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Escalation timer service stopping");
                    break;
                }
                command = self.rx.recv() => {
                    match command {
                        Some(command) => self.handle_command(command).await,
                        None => {
                            tracing::info!("All timer handles dropped, timer service shutting down");
                            break;
                        }
                    }
                }
                _ = wait_until(next) => {
                    if let Some(due) = next {
                        self.fire_due(due).await;
                    }
                }
            }
        }
    }

    async fn handle_command(&mut self, command: TimerCommand) {
        match command {
            TimerCommand::Schedule { alert_id, deadline } => {
                self.retries.remove(&alert_id);
                self.insert_deadline(alert_id, deadline);
            }
            TimerCommand::Cancel { alert_id } => {
                // The stale heap entry is skipped lazily.
                self.deadlines.remove(&alert_id);
                self.retries.remove(&alert_id);
            }
            TimerCommand::Trigger { alert_id } => {
                self.deadlines.remove(&alert_id);
                self.fire(alert_id).await;
            }
        }
    }

    fn insert_deadline(&mut self, alert_id: DbId, deadline: Timestamp) {
        self.deadlines.insert(alert_id, deadline);
        self.queue.push(Reverse((deadline, alert_id)));
    }

    /// Earliest live deadline, discarding stale heap entries.
    fn next_live_deadline(&mut self) -> Option<Timestamp> {
        while let Some(Reverse((when, alert_id))) = self.queue.peek().copied() {
            if self.deadlines.get(&alert_id) == Some(&when) {
                return Some(when);
            }
            self.queue.pop();
        }
        None
    }

    /// Fire every live entry with a deadline at or before `due`.
    ///
    /// Entries that became overdue while firing are picked up by the
    /// next loop iteration (their sleep is zero-length).
    async fn fire_due(&mut self, due: Timestamp) {
        while let Some(Reverse((when, alert_id))) = self.queue.peek().copied() {
            if when > due {
                break;
            }
            self.queue.pop();
            if self.deadlines.get(&alert_id) != Some(&when) {
                continue; // superseded or cancelled
            }
            self.deadlines.remove(&alert_id);
            self.fire(alert_id).await;
        }
    }

    /// Attempt the escalation transition for one alert.
    async fn fire(&mut self, alert_id: DbId) {
        let alert = match self.store.get(alert_id).await {
            Ok(Some(alert)) => {
                self.retries.remove(&alert_id);
                alert
            }
            Ok(None) => {
                self.retries.remove(&alert_id);
                tracing::warn!(alert_id, "Escalation fired for unknown alert");
                return;
            }
            Err(e) => {
                self.retry_later(alert_id, &e);
                return;
            }
        };

        if !alert.is_active() {
            tracing::debug!(alert_id, "Escalation fire lost to an earlier transition");
            return;
        }

        let Ok(urgency) = UrgencyLevel::try_from(alert.urgency) else {
            tracing::error!(alert_id, urgency = alert.urgency, "Alert has invalid urgency");
            return;
        };

        let from_tier = alert.escalation_tier;
        let next_tier = from_tier + 1;

        match self.policy.plan_for(next_tier, urgency) {
            None => self.mark_ladder_exhausted(alert_id, from_tier).await,
            Some(plan) => {
                let new_deadline = deadline_after(Utc::now(), plan.timeout);
                let mut event = AlertEvent::escalated(
                    alert_id,
                    alert.hospital_id,
                    from_tier,
                    next_tier,
                    Some(new_deadline),
                );
                match self
                    .store
                    .escalate_if_at_tier(alert_id, from_tier, next_tier, new_deadline, &event)
                    .await
                {
                    Ok(Some(cursor)) => {
                        tracing::info!(
                            alert_id,
                            from_tier,
                            to_tier = next_tier,
                            "Alert escalated"
                        );
                        self.insert_deadline(alert_id, new_deadline);
                        event.id = Some(cursor);
                        self.bus.publish(event);
                    }
                    Ok(None) => {
                        tracing::debug!(
                            alert_id,
                            from_tier,
                            "Escalation fire lost the conditional update"
                        );
                    }
                    Err(e) => self.retry_later(alert_id, &e),
                }
            }
        }
    }

    /// No tier beyond the current one: clear the deadline but keep the
    /// alert active. Resolution stays a deliberate staff action.
    async fn mark_ladder_exhausted(&mut self, alert_id: DbId, tier: i16) {
        match self.store.clear_deadline_if_at_tier(alert_id, tier).await {
            Ok(true) => {
                tracing::info!(
                    alert_id,
                    tier,
                    "Escalation ladder exhausted; alert stays active without a deadline"
                );
            }
            Ok(false) => {
                tracing::debug!(alert_id, tier, "Ladder-exhaustion update lost the race");
            }
            Err(e) => self.retry_later(alert_id, &e),
        }
    }

    /// Re-queue a fire whose store call failed.
    ///
    /// The retry lives in the normal deadline queue, so a store outage
    /// on one alert never delays another alert's fire. Attempts walk
    /// the backoff ladder, then stay at its last rung with an
    /// error-level alarm on every further attempt.
    fn retry_later(&mut self, alert_id: DbId, error: &StoreError) {
        let attempt = self.retries.get(&alert_id).copied().unwrap_or(0);
        let delay = RETRY_DELAYS_SECS[attempt.min(RETRY_DELAYS_SECS.len() - 1)];
        if attempt >= RETRY_DELAYS_SECS.len() {
            tracing::error!(
                alert_id,
                error = %error,
                "Alert store unreachable after retries; escalation stalled"
            );
        } else {
            tracing::warn!(
                alert_id,
                error = %error,
                delay_secs = delay,
                "Alert store call failed, retrying"
            );
        }
        self.retries.insert(alert_id, attempt.saturating_add(1));
        self.insert_deadline(alert_id, deadline_after(Utc::now(), Duration::from_secs(delay)));
    }
}

/// Sleep until an absolute wall-clock deadline, or forever when there
/// is none. The duration is clamped at zero so overdue deadlines fire
/// immediately.
async fn wait_until(deadline: Option<Timestamp>) {
    match deadline {
        Some(deadline) => {
            let wait = (deadline - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            tokio::time::sleep(wait).await;
        }
        None => std::future::pending::<()>().await,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
