//! Postgres-backed implementations of the domain store contracts.
//!
//! [`PgHierarchyStore`] reads straight from the pool and is used for
//! permission checks, tree listing, and other reads. [`PgEntityTransaction`]
//! wraps one transaction holding the structural write lock; a lifecycle
//! operation runs its validation reads and its writes through it and then
//! commits, so concurrent moves cannot both pass validation against a stale
//! tree.

use arbor_core::entity::{Entity, EntityVersion, ListItem};
use arbor_core::error::CoreError;
use arbor_core::hierarchy::{
    EntityPatch, EntityStore, HierarchyStore, NewEntity, NewEntityVersion, RoleStore,
    TraversalMode,
};
use arbor_core::roles::{AccessLevel, UserRole};
use arbor_core::types::DbId;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::entity::ListItemRow;
use crate::repositories::{EntityRepo, EntityVersionRepo, HierarchyRepo, UserRoleRepo};

fn to_items(rows: Vec<ListItemRow>) -> Result<Vec<ListItem>, CoreError> {
    rows.into_iter().map(ListItem::try_from).collect()
}

// ---------------------------------------------------------------------------
// Pool-backed reader
// ---------------------------------------------------------------------------

/// Read-only store over the connection pool.
#[derive(Debug, Clone)]
pub struct PgHierarchyStore {
    pool: PgPool,
}

impl PgHierarchyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl HierarchyStore for PgHierarchyStore {
    async fn get_hierarchy(
        &mut self,
        root_ids: &[DbId],
        max_depth: i32,
        mode: TraversalMode,
    ) -> Result<Vec<ListItem>, CoreError> {
        let rows = HierarchyRepo::get_hierarchy(&self.pool, root_ids, max_depth, mode)
            .await
            .map_err(CoreError::storage)?;
        to_items(rows)
    }

    async fn list_root_ids(&mut self) -> Result<Vec<DbId>, CoreError> {
        EntityRepo::list_root_ids(&self.pool)
            .await
            .map_err(CoreError::storage)
    }
}

impl RoleStore for PgHierarchyStore {
    async fn find_roles(
        &mut self,
        user_id: DbId,
        levels: &[AccessLevel],
    ) -> Result<Vec<UserRole>, CoreError> {
        UserRoleRepo::find_by_user_and_levels(&self.pool, user_id, levels)
            .await
            .map_err(CoreError::storage)?
            .into_iter()
            .map(UserRole::try_from)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Transaction-backed writer
// ---------------------------------------------------------------------------

/// A write transaction holding the structural lock.
///
/// Dropping it without [`commit`](Self::commit) rolls back.
pub struct PgEntityTransaction {
    tx: Transaction<'static, Postgres>,
}

impl PgEntityTransaction {
    /// Open a transaction and take the structural write lock. Blocks while
    /// another structural write is in flight.
    pub async fn begin(pool: &PgPool) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;
        HierarchyRepo::lock_for_write(&mut *tx).await?;
        Ok(Self { tx })
    }

    pub async fn commit(self) -> Result<(), sqlx::Error> {
        self.tx.commit().await
    }
}

impl HierarchyStore for PgEntityTransaction {
    async fn get_hierarchy(
        &mut self,
        root_ids: &[DbId],
        max_depth: i32,
        mode: TraversalMode,
    ) -> Result<Vec<ListItem>, CoreError> {
        let rows = HierarchyRepo::get_hierarchy(&mut *self.tx, root_ids, max_depth, mode)
            .await
            .map_err(CoreError::storage)?;
        to_items(rows)
    }

    async fn list_root_ids(&mut self) -> Result<Vec<DbId>, CoreError> {
        EntityRepo::list_root_ids(&mut *self.tx)
            .await
            .map_err(CoreError::storage)
    }
}

impl RoleStore for PgEntityTransaction {
    async fn find_roles(
        &mut self,
        user_id: DbId,
        levels: &[AccessLevel],
    ) -> Result<Vec<UserRole>, CoreError> {
        UserRoleRepo::find_by_user_and_levels(&mut *self.tx, user_id, levels)
            .await
            .map_err(CoreError::storage)?
            .into_iter()
            .map(UserRole::try_from)
            .collect()
    }
}

impl EntityStore for PgEntityTransaction {
    async fn find_entity(&mut self, id: DbId) -> Result<Option<Entity>, CoreError> {
        EntityRepo::find_by_id(&mut *self.tx, id)
            .await
            .map_err(CoreError::storage)?
            .map(Entity::try_from)
            .transpose()
    }

    async fn insert_entity(&mut self, input: &NewEntity) -> Result<Entity, CoreError> {
        EntityRepo::create(&mut *self.tx, input)
            .await
            .map_err(CoreError::storage)?
            .try_into()
    }

    async fn update_entity(&mut self, id: DbId, patch: &EntityPatch) -> Result<Entity, CoreError> {
        EntityRepo::update(&mut *self.tx, id, patch)
            .await
            .map_err(CoreError::storage)?
            .ok_or(CoreError::NotFound {
                entity: "Entity",
                id,
            })?
            .try_into()
    }

    async fn insert_version(
        &mut self,
        input: &NewEntityVersion,
    ) -> Result<EntityVersion, CoreError> {
        EntityVersionRepo::create(&mut *self.tx, input)
            .await
            .map(EntityVersion::from)
            .map_err(CoreError::storage)
    }

    async fn latest_version_number(&mut self, id: DbId) -> Result<i32, CoreError> {
        EntityVersionRepo::get_latest_version_number(&mut *self.tx, id)
            .await
            .map_err(CoreError::storage)
    }

    async fn soft_delete(&mut self, ids: &[DbId]) -> Result<u64, CoreError> {
        EntityRepo::soft_delete_many(&mut *self.tx, ids)
            .await
            .map_err(CoreError::storage)
    }
}
