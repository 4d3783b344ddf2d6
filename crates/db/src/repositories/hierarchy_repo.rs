//! Recursive hierarchy traversal and the structural write lock.

use arbor_core::hierarchy::TraversalMode;
use arbor_core::types::DbId;
use sqlx::postgres::PgExecutor;

use crate::models::entity::ListItemRow;

/// Advisory lock key serializing structural writes (ASCII "arbortre").
pub const HIERARCHY_LOCK_KEY: i64 = 0x6172_626f_7274_7265;

/// Walks descendants and ancestors in separate recursive branches so a
/// mixed traversal never reaches siblings. `UNION` drops repeated
/// `(id, depth)` pairs and the depth bound stops walks through corrupted
/// cycles. Each node keeps its smallest depth.
const HIERARCHY_QUERY: &str = "
    WITH RECURSIVE
    roots AS (
        SELECT id, parent_id FROM entities
        WHERE id = ANY($1) AND deleted_at IS NULL
    ),
    down AS (
        SELECT id, 0 AS depth FROM roots
        UNION
        SELECT c.id, d.depth + 1
        FROM entities c
        INNER JOIN down d ON c.parent_id = d.id
        WHERE $3::BOOLEAN AND c.deleted_at IS NULL AND d.depth < $2::INTEGER
    ),
    up AS (
        SELECT id, parent_id, 0 AS depth FROM roots
        UNION
        SELECT p.id, p.parent_id, u.depth + 1
        FROM entities p
        INNER JOIN up u ON p.id = u.parent_id
        WHERE $4::BOOLEAN AND p.deleted_at IS NULL AND u.depth < $2::INTEGER
    ),
    reached AS (
        SELECT id, MIN(depth) AS depth
        FROM (SELECT id, depth FROM down UNION ALL SELECT id, depth FROM up) r
        GROUP BY id
    )
    SELECT e.id, e.entity_type, e.name, e.parent_id, r.depth
    FROM reached r
    INNER JOIN entities e ON e.id = r.id
    ORDER BY r.depth, e.id";

/// Provides traversal queries over the `entities` parent links.
pub struct HierarchyRepo;

impl HierarchyRepo {
    /// Every live node within `max_depth` hops of any root in the
    /// requested direction(s), roots at depth 0.
    pub async fn get_hierarchy<'e, E: PgExecutor<'e>>(
        executor: E,
        root_ids: &[DbId],
        max_depth: i32,
        mode: TraversalMode,
    ) -> Result<Vec<ListItemRow>, sqlx::Error> {
        sqlx::query_as::<_, ListItemRow>(HIERARCHY_QUERY)
            .bind(root_ids)
            .bind(max_depth)
            .bind(mode.includes_children())
            .bind(mode.includes_parents())
            .fetch_all(executor)
            .await
    }

    /// Take the transaction-scoped structural write lock. Released on commit
    /// or rollback.
    pub async fn lock_for_write<'e, E: PgExecutor<'e>>(executor: E) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(HIERARCHY_LOCK_KEY)
            .execute(executor)
            .await?;
        Ok(())
    }
}
