//! Entity row and traversal projection.

use arbor_core::entity::{Entity, EntityState, EntityType, ListItem};
use arbor_core::error::CoreError;
use arbor_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A live row from the `entities` table.
#[derive(Debug, Clone, FromRow)]
pub struct EntityRow {
    pub id: DbId,
    pub entity_type: String,
    pub name: String,
    pub content: String,
    pub parent_id: Option<DbId>,
    pub created_by: DbId,
    pub updated_by: DbId,
    pub current_version: Option<i32>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<EntityRow> for Entity {
    type Error = CoreError;

    fn try_from(row: EntityRow) -> Result<Self, Self::Error> {
        Ok(Entity {
            id: row.id,
            entity_type: EntityType::from_name(&row.entity_type)?,
            name: row.name,
            content: row.content,
            parent_id: row.parent_id,
            created_by: row.created_by,
            updated_by: row.updated_by,
            state: EntityState::from_current_version(row.current_version),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// One node of a hierarchy traversal.
#[derive(Debug, Clone, FromRow)]
pub struct ListItemRow {
    pub id: DbId,
    pub entity_type: String,
    pub name: String,
    pub parent_id: Option<DbId>,
    pub depth: i32,
}

impl TryFrom<ListItemRow> for ListItem {
    type Error = CoreError;

    fn try_from(row: ListItemRow) -> Result<Self, Self::Error> {
        Ok(ListItem {
            id: row.id,
            entity_type: EntityType::from_name(&row.entity_type)?,
            name: row.name,
            parent_id: row.parent_id,
            depth: row.depth,
        })
    }
}
