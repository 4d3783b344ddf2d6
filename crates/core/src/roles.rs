//! Access levels and the role hierarchy.
//!
//! Names must match the `user_roles.role` CHECK constraint in
//! `20260301000003_create_user_roles_table.sql`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_WRITE: &str = "write";
pub const ROLE_READ: &str = "read";

/// All valid role names.
pub const VALID_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_WRITE, ROLE_READ];

/// A stored role, or the level an operation requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    Admin,
    Write,
    Read,
}

impl AccessLevel {
    /// Parse from the wire / database name.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            ROLE_ADMIN => Ok(Self::Admin),
            ROLE_WRITE => Ok(Self::Write),
            ROLE_READ => Ok(Self::Read),
            other => Err(CoreError::Validation(format!(
                "Invalid access level '{other}'. Must be one of: {}",
                VALID_ROLES.join(", ")
            ))),
        }
    }

    /// Database name value.
    pub fn name(self) -> &'static str {
        match self {
            Self::Admin => ROLE_ADMIN,
            Self::Write => ROLE_WRITE,
            Self::Read => ROLE_READ,
        }
    }

    /// Stored roles that satisfy a check for this level.
    pub fn satisfied_by(self) -> &'static [AccessLevel] {
        match self {
            Self::Read => &[Self::Admin, Self::Write, Self::Read],
            Self::Write => &[Self::Admin, Self::Write],
            Self::Admin => &[Self::Admin],
        }
    }

    /// Whether a stored role of this level satisfies `required`.
    pub fn satisfies(self, required: AccessLevel) -> bool {
        required.satisfied_by().contains(&self)
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A stored role grant.
///
/// `entity_id == None` is only valid for [`AccessLevel::Admin`] and denotes
/// the unrestricted grant; read and write grants are always scoped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRole {
    pub id: DbId,
    pub user_id: DbId,
    pub role: AccessLevel,
    pub entity_id: Option<DbId>,
    pub created_at: Timestamp,
}

impl UserRole {
    /// Whether this grant is the unrestricted admin grant.
    pub fn is_unrestricted(&self) -> bool {
        self.entity_id.is_none()
    }
}

/// Validate the shape of a grant before it is stored.
pub fn validate_grant(role: AccessLevel, entity_id: Option<DbId>) -> Result<(), CoreError> {
    if entity_id.is_none() && role != AccessLevel::Admin {
        return Err(CoreError::Validation(format!(
            "A '{role}' grant must be scoped to an entity"
        )));
    }
    Ok(())
}
