//! Staff directory seam.
//!
//! Answers "who is on duty and eligible for tier N of hospital H".
//! The tier-to-roles mapping comes from the escalation policy; the
//! duty roster comes from the `staff` table.

use std::sync::Arc;

use async_trait::async_trait;

use codecall_core::escalation::{EscalationPolicy, TierNumber};
use codecall_core::types::DbId;
use codecall_db::repositories::StaffRepo;
use codecall_db::DbPool;

use crate::dispatcher::Recipient;
use crate::store::StoreError;

/// Directory of on-duty, tier-eligible notification recipients.
#[async_trait]
pub trait Directory: Send + Sync + 'static {
    /// On-duty staff in `hospital_id` whose role belongs to `tier`'s
    /// recipient set. A tier beyond the policy table yields an empty
    /// list.
    async fn eligible_for_tier(
        &self,
        hospital_id: DbId,
        tier: TierNumber,
    ) -> Result<Vec<Recipient>, StoreError>;
}

/// Postgres-backed [`Directory`] over the `staff` table.
pub struct PgDirectory {
    pool: DbPool,
    policy: Arc<EscalationPolicy>,
}

impl PgDirectory {
    pub fn new(pool: DbPool, policy: Arc<EscalationPolicy>) -> Self {
        Self { pool, policy }
    }
}

#[async_trait]
impl Directory for PgDirectory {
    async fn eligible_for_tier(
        &self,
        hospital_id: DbId,
        tier: TierNumber,
    ) -> Result<Vec<Recipient>, StoreError> {
        let Some(roles) = self.policy.recipient_roles(tier) else {
            return Ok(vec![]);
        };
        let roles: Vec<String> = roles.to_vec();

        let staff = StaffRepo::on_duty_with_roles(&self.pool, hospital_id, &roles).await?;

        Ok(staff
            .into_iter()
            .map(|member| Recipient {
                user_id: member.id,
                role: member.role,
            })
            .collect())
    }
}
