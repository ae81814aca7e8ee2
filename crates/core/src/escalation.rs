//! Escalation policy evaluation.
//!
//! Pure logic — no database access, no clocks. The timer service and
//! the alert handlers fetch state themselves and ask the policy what
//! the next tier looks like.
//!
//! Urgency only affects the tier-1 timeout. Tiers 2 and above always
//! use the static table, so an alert that has already escalated once
//! follows the same ladder regardless of how urgent it started out.

use std::time::Duration;

use crate::error::CoreError;
use crate::roles::{ROLE_ADMINISTRATOR, ROLE_DOCTOR, ROLE_NURSE};
use crate::types::Timestamp;
use crate::urgency::UrgencyLevel;

/// Tier ordinal type matching SMALLINT in the database.
pub type TierNumber = i16;

/// Default per-urgency tier-1 timeouts (seconds), indexed by
/// `UrgencyLevel::index()`: critical, urgent, high, moderate, routine.
const DEFAULT_TIER_ONE_SECS: [u64; 5] = [60, 120, 300, 600, 900];

/// One rung of the escalation ladder.
#[derive(Debug, Clone)]
pub struct EscalationTier {
    /// 1-based tier number; tiers are contiguous starting at 1.
    pub number: TierNumber,
    /// How long this tier waits for an acknowledgment before escalating.
    pub timeout: Duration,
    /// Roles notified when an alert enters this tier.
    pub recipient_roles: Vec<String>,
}

/// The evaluated plan for a single tier of a single alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierPlan {
    pub tier: TierNumber,
    pub timeout: Duration,
    pub recipient_roles: Vec<String>,
}

/// The fixed, ordered escalation ladder.
///
/// Construction validates the tier-number invariant once so evaluation
/// can be infallible lookups.
#[derive(Debug, Clone)]
pub struct EscalationPolicy {
    tiers: Vec<EscalationTier>,
    tier_one_by_urgency: [Duration; 5],
}

impl EscalationPolicy {
    /// Build a policy from an explicit tier table and per-urgency
    /// tier-1 timeouts.
    ///
    /// Fails if the table is empty or tier numbers are not contiguous
    /// starting at 1.
    pub fn new(
        tiers: Vec<EscalationTier>,
        tier_one_by_urgency: [Duration; 5],
    ) -> Result<Self, CoreError> {
        if tiers.is_empty() {
            return Err(CoreError::Validation(
                "escalation policy requires at least one tier".to_string(),
            ));
        }
        for (i, tier) in tiers.iter().enumerate() {
            let expected = (i + 1) as TierNumber;
            if tier.number != expected {
                return Err(CoreError::Validation(format!(
                    "escalation tiers must be contiguous starting at 1: \
                     position {i} has tier number {}",
                    tier.number
                )));
            }
        }
        Ok(Self {
            tiers,
            tier_one_by_urgency,
        })
    }

    /// Build a policy from plain timeout lists, assigning the default
    /// recipient role sets per tier position.
    ///
    /// Used by the config layer when timeouts are overridden via
    /// environment variables.
    pub fn from_timeouts(
        tier_timeouts: &[Duration],
        tier_one_by_urgency: [Duration; 5],
    ) -> Result<Self, CoreError> {
        let tiers = tier_timeouts
            .iter()
            .enumerate()
            .map(|(i, timeout)| EscalationTier {
                number: (i + 1) as TierNumber,
                timeout: *timeout,
                recipient_roles: default_roles_for_position(i),
            })
            .collect();
        Self::new(tiers, tier_one_by_urgency)
    }

    /// Evaluate `(tier, urgency) -> {timeout, recipient_roles}`.
    ///
    /// Returns `None` for tiers beyond the configured table — "no
    /// further escalation", never an error.
    pub fn plan_for(&self, tier: TierNumber, urgency: UrgencyLevel) -> Option<TierPlan> {
        if tier < 1 {
            return None;
        }
        let entry = self.tiers.get((tier - 1) as usize)?;
        let timeout = if tier == 1 {
            self.tier_one_by_urgency[urgency.index()]
        } else {
            entry.timeout
        };
        Some(TierPlan {
            tier,
            timeout,
            recipient_roles: entry.recipient_roles.clone(),
        })
    }

    /// Deadline for a freshly created alert: `now` plus the
    /// urgency-modulated tier-1 timeout.
    pub fn first_deadline(&self, urgency: UrgencyLevel, now: Timestamp) -> Timestamp {
        // Tier 1 always exists (validated in `new`).
        let timeout = self.tier_one_by_urgency[urgency.index()];
        deadline_after(now, timeout)
    }

    /// Recipient roles for a tier, independent of urgency.
    ///
    /// Returns `None` for tiers beyond the configured table.
    pub fn recipient_roles(&self, tier: TierNumber) -> Option<&[String]> {
        if tier < 1 {
            return None;
        }
        self.tiers
            .get((tier - 1) as usize)
            .map(|t| t.recipient_roles.as_slice())
    }

    /// The highest configured tier number.
    pub fn last_tier(&self) -> TierNumber {
        self.tiers.len() as TierNumber
    }

    /// Number of configured tiers.
    pub fn tier_count(&self) -> usize {
        self.tiers.len()
    }
}

impl Default for EscalationPolicy {
    /// Three-tier default ladder: nurses first, then doctors, then
    /// administration.
    fn default() -> Self {
        let tiers = vec![
            EscalationTier {
                number: 1,
                timeout: Duration::from_secs(300),
                recipient_roles: vec![ROLE_NURSE.to_string()],
            },
            EscalationTier {
                number: 2,
                timeout: Duration::from_secs(600),
                recipient_roles: vec![ROLE_NURSE.to_string(), ROLE_DOCTOR.to_string()],
            },
            EscalationTier {
                number: 3,
                timeout: Duration::from_secs(900),
                recipient_roles: vec![ROLE_DOCTOR.to_string(), ROLE_ADMINISTRATOR.to_string()],
            },
        ];
        Self::new(tiers, default_tier_one_timeouts()).expect("default policy is valid")
    }
}

/// The default per-urgency tier-1 timeout table.
pub fn default_tier_one_timeouts() -> [Duration; 5] {
    DEFAULT_TIER_ONE_SECS.map(Duration::from_secs)
}

/// Compute an absolute deadline from a wall-clock instant and a timeout.
pub fn deadline_after(now: Timestamp, timeout: Duration) -> Timestamp {
    now + chrono::Duration::from_std(timeout).unwrap_or(chrono::Duration::MAX)
}

/// Recipient roles for a tier position when none are configured
/// explicitly: widen the audience one step per tier.
fn default_roles_for_position(position: usize) -> Vec<String> {
    match position {
        0 => vec![ROLE_NURSE.to_string()],
        1 => vec![ROLE_NURSE.to_string(), ROLE_DOCTOR.to_string()],
        _ => vec![ROLE_DOCTOR.to_string(), ROLE_ADMINISTRATOR.to_string()],
    }
}
