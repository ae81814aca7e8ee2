//! Repository for the `audit_log` table.

use sqlx::PgPool;

use codecall_core::types::DbId;

/// Provides append-only writes to the audit trail.
pub struct AuditRepo;

impl AuditRepo {
    /// Insert an audit record, returning the generated ID.
    pub async fn insert(
        pool: &PgPool,
        action: &str,
        entity_type: &str,
        entity_id: DbId,
        metadata: &serde_json::Value,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO audit_log (action, entity_type, entity_id, metadata) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id",
        )
        .bind(action)
        .bind(entity_type)
        .bind(entity_id)
        .bind(metadata)
        .fetch_one(pool)
        .await
    }
}
