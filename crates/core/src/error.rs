use crate::entity::EntityType;
use crate::types::DbId;

/// Boxed infrastructure error carried opaquely through the domain layer.
pub type StorageError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Parent entity {0} not found")]
    ParentNotFound(DbId),

    #[error("A parent is required for this entity type")]
    ParentRequired,

    #[error("Moving entity {id} under {parent_id} would create a cycle")]
    ParentCycle { id: DbId, parent_id: DbId },

    #[error("Entity of type {child} cannot be placed under a parent of type {parent}")]
    ParentTypeIncompatible {
        child: EntityType,
        parent: EntityType,
    },

    #[error("Maximum hierarchy depth of {max} exceeded")]
    MaxDepthExceeded { max: i32 },

    #[error("Draft entity {0} cannot have children")]
    CannotDraftEntityWithChildren(DbId),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Storage error: {0}")]
    Storage(#[source] StorageError),
}

impl CoreError {
    /// Wrap an infrastructure failure so it propagates without being
    /// interpreted by the domain layer.
    pub fn storage(err: impl Into<StorageError>) -> Self {
        Self::Storage(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_type_incompatible() {
        let err = CoreError::ParentTypeIncompatible {
            child: EntityType::Department,
            parent: EntityType::Article,
        };
        assert_eq!(
            err.to_string(),
            "Entity of type department cannot be placed under a parent of type article"
        );
    }
}
