//! Repository for the `user_roles` table.

use arbor_core::roles::AccessLevel;
use arbor_core::types::DbId;
use sqlx::postgres::PgExecutor;

use crate::models::user_role::UserRoleRow;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, role, entity_id, created_at";

/// Provides grant, lookup, and revoke operations for role grants.
pub struct UserRoleRepo;

impl UserRoleRepo {
    /// Store a grant.
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: DbId,
        role: AccessLevel,
        entity_id: Option<DbId>,
    ) -> Result<UserRoleRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_roles (user_id, role, entity_id)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserRoleRow>(&query)
            .bind(user_id)
            .bind(role.name())
            .bind(entity_id)
            .fetch_one(executor)
            .await
    }

    /// Grants held by a user whose role is one of `levels`.
    pub async fn find_by_user_and_levels<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: DbId,
        levels: &[AccessLevel],
    ) -> Result<Vec<UserRoleRow>, sqlx::Error> {
        let names: Vec<&'static str> = levels.iter().map(|level| level.name()).collect();
        let query = format!(
            "SELECT {COLUMNS} FROM user_roles
             WHERE user_id = $1 AND role = ANY($2)
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, UserRoleRow>(&query)
            .bind(user_id)
            .bind(names)
            .fetch_all(executor)
            .await
    }

    /// All grants held by a user, oldest first.
    pub async fn list_by_user<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: DbId,
    ) -> Result<Vec<UserRoleRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM user_roles WHERE user_id = $1 ORDER BY id ASC");
        sqlx::query_as::<_, UserRoleRow>(&query)
            .bind(user_id)
            .fetch_all(executor)
            .await
    }

    /// Revoke a grant. Returns `true` if a row was removed.
    pub async fn delete<'e, E: PgExecutor<'e>>(executor: E, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM user_roles WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
