//! Repository for the `staff` directory table.

use sqlx::PgPool;

use codecall_core::types::DbId;

use crate::models::staff::StaffMember;

/// Column list for `staff` queries.
const COLUMNS: &str = "id, hospital_id, name, role, on_duty, created_at, updated_at";

/// Provides directory reads and duty-roster updates for staff.
pub struct StaffRepo;

impl StaffRepo {
    /// List all staff for a hospital, ordered by role then name.
    pub async fn list_for_hospital(
        pool: &PgPool,
        hospital_id: DbId,
    ) -> Result<Vec<StaffMember>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM staff WHERE hospital_id = $1 ORDER BY role, name"
        );
        sqlx::query_as::<_, StaffMember>(&query)
            .bind(hospital_id)
            .fetch_all(pool)
            .await
    }

    /// List on-duty staff in a hospital whose role is in `roles`.
    ///
    /// This is the "who is eligible for tier N of hospital H" query.
    pub async fn on_duty_with_roles(
        pool: &PgPool,
        hospital_id: DbId,
        roles: &[String],
    ) -> Result<Vec<StaffMember>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM staff \
             WHERE hospital_id = $1 AND on_duty = true AND role = ANY($2) \
             ORDER BY role, name"
        );
        sqlx::query_as::<_, StaffMember>(&query)
            .bind(hospital_id)
            .bind(roles)
            .fetch_all(pool)
            .await
    }

    /// Set a staff member's on-duty flag. Returns the updated row, or
    /// `None` if the staff member does not exist.
    pub async fn set_on_duty(
        pool: &PgPool,
        staff_id: DbId,
        on_duty: bool,
    ) -> Result<Option<StaffMember>, sqlx::Error> {
        let query = format!(
            "UPDATE staff SET on_duty = $2, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, StaffMember>(&query)
            .bind(staff_id)
            .bind(on_duty)
            .fetch_optional(pool)
            .await
    }
}
