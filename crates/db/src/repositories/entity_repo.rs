//! Repository for the `entities` table.
//!
//! Every read filters out soft-deleted rows. Structural validation lives in
//! `arbor_core::lifecycle`; these methods write what they are given.

use arbor_core::hierarchy::{EntityPatch, NewEntity};
use arbor_core::types::DbId;
use sqlx::postgres::PgExecutor;

use crate::models::entity::EntityRow;

/// Column list for entities queries.
const COLUMNS: &str = "id, entity_type, name, content, parent_id, created_by, updated_by, \
    current_version, created_at, updated_at";

/// Provides CRUD operations for hierarchy entities.
pub struct EntityRepo;

impl EntityRepo {
    /// Insert a new entity row.
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        input: &NewEntity,
    ) -> Result<EntityRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO entities
                (entity_type, name, content, parent_id, created_by, updated_by, current_version)
             VALUES ($1, $2, $3, $4, $5, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EntityRow>(&query)
            .bind(input.entity_type.name())
            .bind(&input.name)
            .bind(&input.content)
            .bind(input.parent_id)
            .bind(input.created_by)
            .bind(input.state.current_version())
            .fetch_one(executor)
            .await
    }

    /// Find a live entity by ID.
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
    ) -> Result<Option<EntityRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM entities WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, EntityRow>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Replace the mutable columns of a live entity.
    ///
    /// Returns `None` if no live row with the given `id` exists.
    pub async fn update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
        patch: &EntityPatch,
    ) -> Result<Option<EntityRow>, sqlx::Error> {
        let query = format!(
            "UPDATE entities SET
                name = $2,
                content = $3,
                parent_id = $4,
                updated_by = $5,
                current_version = $6
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EntityRow>(&query)
            .bind(id)
            .bind(&patch.name)
            .bind(&patch.content)
            .bind(patch.parent_id)
            .bind(patch.updated_by)
            .bind(patch.state.current_version())
            .fetch_optional(executor)
            .await
    }

    /// Soft-delete every listed entity in one statement.
    pub async fn soft_delete_many<'e, E: PgExecutor<'e>>(
        executor: E,
        ids: &[DbId],
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE entities SET deleted_at = NOW()
             WHERE id = ANY($1) AND deleted_at IS NULL",
        )
        .bind(ids)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// IDs of live entities without a parent.
    pub async fn list_root_ids<'e, E: PgExecutor<'e>>(
        executor: E,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT id FROM entities
             WHERE parent_id IS NULL AND deleted_at IS NULL
             ORDER BY id",
        )
        .fetch_all(executor)
        .await
    }

    /// Whether a live entity with this ID exists.
    pub async fn exists<'e, E: PgExecutor<'e>>(executor: E, id: DbId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM entities WHERE id = $1 AND deleted_at IS NULL)",
        )
        .bind(id)
        .fetch_one(executor)
        .await
    }
}
