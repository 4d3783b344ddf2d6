//! Repository for the `entity_versions` table.
//!
//! Versions are immutable snapshots appended whenever a published entity
//! changes.

use arbor_core::hierarchy::NewEntityVersion;
use arbor_core::types::DbId;
use sqlx::postgres::PgExecutor;

use crate::models::entity_version::EntityVersionRow;

/// Column list for entity_versions queries.
const COLUMNS: &str = "id, entity_id, version, name, content, parent_id, created_by, created_at";

/// Provides append and read operations for entity versions.
pub struct EntityVersionRepo;

impl EntityVersionRepo {
    /// Append a version snapshot.
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        input: &NewEntityVersion,
    ) -> Result<EntityVersionRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO entity_versions (entity_id, version, name, content, parent_id, created_by)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EntityVersionRow>(&query)
            .bind(input.entity_id)
            .bind(input.version)
            .bind(&input.name)
            .bind(&input.content)
            .bind(input.parent_id)
            .bind(input.created_by)
            .fetch_one(executor)
            .await
    }

    /// List all versions for an entity, oldest first.
    pub async fn list_by_entity<'e, E: PgExecutor<'e>>(
        executor: E,
        entity_id: DbId,
    ) -> Result<Vec<EntityVersionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM entity_versions
             WHERE entity_id = $1
             ORDER BY version ASC"
        );
        sqlx::query_as::<_, EntityVersionRow>(&query)
            .bind(entity_id)
            .fetch_all(executor)
            .await
    }

    /// Find a specific version of an entity.
    pub async fn find_by_entity_and_version<'e, E: PgExecutor<'e>>(
        executor: E,
        entity_id: DbId,
        version: i32,
    ) -> Result<Option<EntityVersionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM entity_versions
             WHERE entity_id = $1 AND version = $2"
        );
        sqlx::query_as::<_, EntityVersionRow>(&query)
            .bind(entity_id)
            .bind(version)
            .fetch_optional(executor)
            .await
    }

    /// Get the latest version number for an entity (0 if none exist).
    pub async fn get_latest_version_number<'e, E: PgExecutor<'e>>(
        executor: E,
        entity_id: DbId,
    ) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COALESCE(MAX(version), 0) FROM entity_versions WHERE entity_id = $1",
        )
        .bind(entity_id)
        .fetch_one(executor)
        .await
    }
}
