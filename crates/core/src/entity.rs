//! Entity types, publication state, and name/content validation.
//!
//! An entity is a node in the content hierarchy. Its kind decides which
//! parents it may attach under; its publication state decides whether it
//! carries a version history.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const TYPE_ARTICLE: &str = "article";
pub const TYPE_DEPARTMENT: &str = "department";

/// All valid entity type names.
pub const VALID_ENTITY_TYPES: &[&str] = &[TYPE_ARTICLE, TYPE_DEPARTMENT];

/// Maximum entity content length in characters.
pub const MAX_CONTENT_LENGTH: usize = 100_000;

// ---------------------------------------------------------------------------
// Entity type
// ---------------------------------------------------------------------------

/// The closed set of node kinds in the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Article,
    Department,
}

impl EntityType {
    /// Parse from the wire / database name.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            TYPE_ARTICLE => Ok(Self::Article),
            TYPE_DEPARTMENT => Ok(Self::Department),
            other => Err(CoreError::Validation(format!(
                "Invalid entity type '{other}'. Must be one of: {}",
                VALID_ENTITY_TYPES.join(", ")
            ))),
        }
    }

    /// Database name value.
    pub fn name(self) -> &'static str {
        match self {
            Self::Article => TYPE_ARTICLE,
            Self::Department => TYPE_DEPARTMENT,
        }
    }

    /// Parent types this kind may attach under.
    ///
    /// | child      | article | department |
    /// |------------|---------|------------|
    /// | article    | yes     | yes        |
    /// | department | no      | yes        |
    pub fn allowed_parent_types(self) -> &'static [EntityType] {
        match self {
            Self::Article => &[Self::Article, Self::Department],
            Self::Department => &[Self::Department],
        }
    }

    /// Whether an entity of this kind must have a parent.
    pub fn requires_parent(self) -> bool {
        matches!(self, Self::Article)
    }

    /// Check that this kind may attach under `parent`.
    pub fn validate_parent_type(self, parent: EntityType) -> Result<(), CoreError> {
        if self.allowed_parent_types().contains(&parent) {
            Ok(())
        } else {
            Err(CoreError::ParentTypeIncompatible {
                child: self,
                parent,
            })
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Publication state
// ---------------------------------------------------------------------------

/// Draft entities have no version history; published ones point at their
/// latest immutable snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EntityState {
    Draft,
    Published {
        #[serde(rename = "current_version")]
        version: i32,
    },
}

impl EntityState {
    /// Build from the nullable `current_version` column.
    pub fn from_current_version(current_version: Option<i32>) -> Self {
        match current_version {
            Some(version) => Self::Published { version },
            None => Self::Draft,
        }
    }

    /// The nullable `current_version` column value.
    pub fn current_version(self) -> Option<i32> {
        match self {
            Self::Draft => None,
            Self::Published { version } => Some(version),
        }
    }

    pub fn is_draft(self) -> bool {
        matches!(self, Self::Draft)
    }
}

// ---------------------------------------------------------------------------
// Entity, version, list item
// ---------------------------------------------------------------------------

/// A live node in the content hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    pub id: DbId,
    pub entity_type: EntityType,
    pub name: String,
    pub content: String,
    pub parent_id: Option<DbId>,
    pub created_by: DbId,
    pub updated_by: DbId,
    #[serde(flatten)]
    pub state: EntityState,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Immutable snapshot written each time a published entity changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityVersion {
    pub entity_id: DbId,
    pub version: i32,
    pub name: String,
    pub content: String,
    pub parent_id: Option<DbId>,
    pub created_by: DbId,
    pub created_at: Timestamp,
}

/// Projection returned by hierarchy traversals.
///
/// `depth` is the hop distance from the nearest traversal root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListItem {
    pub id: DbId,
    pub entity_type: EntityType,
    pub name: String,
    pub parent_id: Option<DbId>,
    pub depth: i32,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Trim and validate an entity name, returning the trimmed value.
///
/// Length is counted in characters, not bytes.
pub fn validate_name(name: &str, max_length: usize) -> Result<String, CoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("Name must not be empty".into()));
    }
    if trimmed.chars().count() > max_length {
        return Err(CoreError::Validation(format!(
            "Name must be at most {max_length} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Validate entity content (max 100 000 chars).
pub fn validate_content(content: &str) -> Result<(), CoreError> {
    if content.chars().count() > MAX_CONTENT_LENGTH {
        return Err(CoreError::Validation(format!(
            "Content must be at most {MAX_CONTENT_LENGTH} characters"
        )));
    }
    Ok(())
}
