//! Audit sink seam.
//!
//! Compliance logging is best-effort downstream of a committed state
//! transition: a failed audit write is logged and never propagated.

use async_trait::async_trait;

use codecall_core::types::DbId;
use codecall_db::repositories::AuditRepo;
use codecall_db::DbPool;

/// Append-only compliance audit trail.
#[async_trait]
pub trait AuditSink: Send + Sync + 'static {
    /// Record an action against an entity. Infallible by contract:
    /// implementations swallow and log their own failures.
    async fn record(
        &self,
        action: &str,
        entity_type: &str,
        entity_id: DbId,
        metadata: serde_json::Value,
    );
}

/// Postgres-backed [`AuditSink`] over the `audit_log` table.
pub struct PgAuditSink {
    pool: DbPool,
}

impl PgAuditSink {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn record(
        &self,
        action: &str,
        entity_type: &str,
        entity_id: DbId,
        metadata: serde_json::Value,
    ) {
        if let Err(e) = AuditRepo::insert(&self.pool, action, entity_type, entity_id, &metadata).await
        {
            tracing::error!(
                action,
                entity_type,
                entity_id,
                error = %e,
                "Failed to write audit record"
            );
        }
    }
}
