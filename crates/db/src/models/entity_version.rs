//! Entity version snapshot row.

use arbor_core::entity::EntityVersion;
use arbor_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `entity_versions` table.
#[derive(Debug, Clone, FromRow)]
pub struct EntityVersionRow {
    pub id: DbId,
    pub entity_id: DbId,
    pub version: i32,
    pub name: String,
    pub content: String,
    pub parent_id: Option<DbId>,
    pub created_by: DbId,
    pub created_at: Timestamp,
}

impl From<EntityVersionRow> for EntityVersion {
    fn from(row: EntityVersionRow) -> Self {
        EntityVersion {
            entity_id: row.entity_id,
            version: row.version,
            name: row.name,
            content: row.content,
            parent_id: row.parent_id,
            created_by: row.created_by,
            created_at: row.created_at,
        }
    }
}
