//! Role grant row and DTOs.

use arbor_core::error::CoreError;
use arbor_core::roles::{AccessLevel, UserRole};
use arbor_core::types::{DbId, Timestamp};
use serde::Deserialize;
use sqlx::FromRow;

/// A row from the `user_roles` table.
#[derive(Debug, Clone, FromRow)]
pub struct UserRoleRow {
    pub id: DbId,
    pub user_id: DbId,
    pub role: String,
    pub entity_id: Option<DbId>,
    pub created_at: Timestamp,
}

impl TryFrom<UserRoleRow> for UserRole {
    type Error = CoreError;

    fn try_from(row: UserRoleRow) -> Result<Self, Self::Error> {
        Ok(UserRole {
            id: row.id,
            user_id: row.user_id,
            role: AccessLevel::from_name(&row.role)?,
            entity_id: row.entity_id,
            created_at: row.created_at,
        })
    }
}

/// DTO for granting a role. `entity_id` absent means unrestricted.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRole {
    pub role: String,
    pub entity_id: Option<DbId>,
}
