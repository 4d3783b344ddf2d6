//! Store contracts the domain layer depends on.
//!
//! [`HierarchyStore`] is the traversal every other component relies on. Its
//! result must be direction-complete: whenever a returned item's parent lies
//! within the requested depth and direction, that parent is returned too.
//! The cycle and depth checks in [`crate::lifecycle`] are only sound under
//! that guarantee.

use std::future::Future;
use std::time::Duration;

use crate::entity::{Entity, EntityState, EntityType, EntityVersion, ListItem};
use crate::error::CoreError;
use crate::roles::{AccessLevel, UserRole};
use crate::types::DbId;

/// Direction(s) a traversal follows from its roots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalMode {
    ChildrenAndParents,
    ChildrenOnly,
    ParentsOnly,
}

impl TraversalMode {
    pub fn includes_children(self) -> bool {
        matches!(self, Self::ChildrenAndParents | Self::ChildrenOnly)
    }

    pub fn includes_parents(self) -> bool {
        matches!(self, Self::ChildrenAndParents | Self::ParentsOnly)
    }
}

/// Depth-bounded ancestor/descendant traversal over live entities.
pub trait HierarchyStore: Send {
    /// Return every live node within `max_depth` hops of any root in the
    /// requested direction(s), roots included at depth 0. Each node appears
    /// once, tagged with its distance from the nearest root. Unknown or
    /// deleted roots contribute nothing.
    fn get_hierarchy(
        &mut self,
        root_ids: &[DbId],
        max_depth: i32,
        mode: TraversalMode,
    ) -> impl Future<Output = Result<Vec<ListItem>, CoreError>> + Send;

    /// IDs of every live entity without a parent.
    fn list_root_ids(&mut self) -> impl Future<Output = Result<Vec<DbId>, CoreError>> + Send;
}

/// Read access to stored role grants.
pub trait RoleStore: Send {
    /// Grants held by `user_id` whose role is one of `levels`.
    fn find_roles(
        &mut self,
        user_id: DbId,
        levels: &[AccessLevel],
    ) -> impl Future<Output = Result<Vec<UserRole>, CoreError>> + Send;
}

/// Row-level entity persistence used by the lifecycle engine.
///
/// Implementations backed by a database run every call of one lifecycle
/// operation inside a single transaction.
pub trait EntityStore: HierarchyStore {
    fn find_entity(
        &mut self,
        id: DbId,
    ) -> impl Future<Output = Result<Option<Entity>, CoreError>> + Send;

    fn insert_entity(
        &mut self,
        input: &NewEntity,
    ) -> impl Future<Output = Result<Entity, CoreError>> + Send;

    fn update_entity(
        &mut self,
        id: DbId,
        patch: &EntityPatch,
    ) -> impl Future<Output = Result<Entity, CoreError>> + Send;

    fn insert_version(
        &mut self,
        input: &NewEntityVersion,
    ) -> impl Future<Output = Result<EntityVersion, CoreError>> + Send;

    /// Highest stored version number for the entity (0 if none).
    fn latest_version_number(
        &mut self,
        id: DbId,
    ) -> impl Future<Output = Result<i32, CoreError>> + Send;

    /// Soft-delete every listed entity in one batch, returning the row count.
    fn soft_delete(
        &mut self,
        ids: &[DbId],
    ) -> impl Future<Output = Result<u64, CoreError>> + Send;
}

/// Row to insert. The store assigns the ID and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntity {
    pub entity_type: EntityType,
    pub name: String,
    pub content: String,
    pub parent_id: Option<DbId>,
    pub created_by: DbId,
    pub state: EntityState,
}

/// Full replacement of the mutable columns of an entity row.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityPatch {
    pub name: String,
    pub content: String,
    pub parent_id: Option<DbId>,
    pub updated_by: DbId,
    pub state: EntityState,
}

/// Version snapshot to append.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntityVersion {
    pub entity_id: DbId,
    pub version: i32,
    pub name: String,
    pub content: String,
    pub parent_id: Option<DbId>,
    pub created_by: DbId,
}

/// Run a traversal under the configured timeout.
///
/// Empty root sets short-circuit without touching the store.
pub async fn traverse<S: HierarchyStore>(
    store: &mut S,
    root_ids: &[DbId],
    max_depth: i32,
    mode: TraversalMode,
    timeout: Duration,
) -> Result<Vec<ListItem>, CoreError> {
    if root_ids.is_empty() {
        return Ok(Vec::new());
    }
    match tokio::time::timeout(timeout, store.get_hierarchy(root_ids, max_depth, mode)).await {
        Ok(result) => result,
        Err(_) => Err(CoreError::Internal(format!(
            "Hierarchy traversal timed out after {}ms",
            timeout.as_millis()
        ))),
    }
}

/// Deepest hop distance in a traversal result (`None` when empty).
pub fn deepest(items: &[ListItem]) -> Option<i32> {
    items.iter().map(|item| item.depth).max()
}
