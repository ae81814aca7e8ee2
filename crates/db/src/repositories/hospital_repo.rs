//! Repository for the `hospitals` table.

use sqlx::PgPool;

use codecall_core::types::DbId;

use crate::models::hospital::Hospital;

/// Column list for `hospitals` queries.
const COLUMNS: &str = "id, name, created_at";

/// Provides reads for hospitals.
pub struct HospitalRepo;

impl HospitalRepo {
    /// List all hospitals ordered by name.
    pub async fn list(pool: &PgPool) -> Result<Vec<Hospital>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM hospitals ORDER BY name");
        sqlx::query_as::<_, Hospital>(&query).fetch_all(pool).await
    }

    /// Fetch a single hospital by ID.
    pub async fn get(pool: &PgPool, hospital_id: DbId) -> Result<Option<Hospital>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM hospitals WHERE id = $1");
        sqlx::query_as::<_, Hospital>(&query)
            .bind(hospital_id)
            .fetch_optional(pool)
            .await
    }
}
