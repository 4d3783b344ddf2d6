//! Permission resolution and hierarchy-aware expansion.
//!
//! Resolution turns an actor's stored grants into either "unrestricted" or
//! the set of directly granted entity IDs. Expansion widens that set through
//! the hierarchy: descendants always, ancestors only for read checks (a
//! write grant on a department says nothing about the departments above it).
//!
//! Nothing here is cached. Every check recomputes from current store
//! contents so role and hierarchy changes take effect immediately.

use std::collections::HashSet;

use serde::Serialize;

use crate::config::HierarchyConfig;
use crate::error::CoreError;
use crate::hierarchy::{traverse, HierarchyStore, RoleStore, TraversalMode};
use crate::roles::AccessLevel;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Direct permissions
// ---------------------------------------------------------------------------

/// Grants that directly satisfy a requested level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectPermissions {
    /// The actor holds the unrestricted admin grant. `entity_ids` is then
    /// always empty.
    pub is_admin: bool,
    pub entity_ids: Vec<DbId>,
}

impl DirectPermissions {
    pub fn unrestricted() -> Self {
        Self {
            is_admin: true,
            entity_ids: Vec::new(),
        }
    }
}

/// Resolve the actor's grants for `required`, honouring the role hierarchy.
///
/// An unscoped grant short-circuits to `is_admin`. Fails `Unauthorized` when
/// there is no actor.
pub async fn get_direct_permissions<S: RoleStore>(
    store: &mut S,
    actor: Option<DbId>,
    required: AccessLevel,
) -> Result<DirectPermissions, CoreError> {
    let user_id =
        actor.ok_or_else(|| CoreError::Unauthorized("No authenticated actor".into()))?;

    let roles = store.find_roles(user_id, required.satisfied_by()).await?;

    let mut entity_ids = Vec::with_capacity(roles.len());
    for role in &roles {
        match role.entity_id {
            None => return Ok(DirectPermissions::unrestricted()),
            Some(id) => entity_ids.push(id),
        }
    }
    entity_ids.sort_unstable();
    entity_ids.dedup();

    Ok(DirectPermissions {
        is_admin: false,
        entity_ids,
    })
}

/// Like [`get_direct_permissions`] but with the level given by name, as it
/// arrives from a query string. Unknown names fail `Validation`.
pub async fn get_direct_permissions_by_name<S: RoleStore>(
    store: &mut S,
    actor: Option<DbId>,
    required: &str,
) -> Result<DirectPermissions, CoreError> {
    let level = AccessLevel::from_name(required)?;
    get_direct_permissions(store, actor, level).await
}

// ---------------------------------------------------------------------------
// Effective permissions
// ---------------------------------------------------------------------------

/// The closure of entity IDs an actor may act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectivePermissions {
    Unrestricted,
    Scoped(HashSet<DbId>),
}

impl EffectivePermissions {
    /// Expand direct grants through the hierarchy.
    ///
    /// Descendants of every granted ID are always included; ancestors only
    /// when `expand_ancestors` is set.
    pub async fn expand<S: HierarchyStore>(
        store: &mut S,
        direct: &DirectPermissions,
        expand_ancestors: bool,
        config: &HierarchyConfig,
    ) -> Result<Self, CoreError> {
        if direct.is_admin {
            return Ok(Self::Unrestricted);
        }

        let mode = if expand_ancestors {
            TraversalMode::ChildrenAndParents
        } else {
            TraversalMode::ChildrenOnly
        };
        let items = traverse(
            store,
            &direct.entity_ids,
            config.max_hierarchy_depth(),
            mode,
            config.traversal_timeout(),
        )
        .await?;

        Ok(Self::Scoped(items.into_iter().map(|item| item.id).collect()))
    }

    pub fn is_unrestricted(&self) -> bool {
        matches!(self, Self::Unrestricted)
    }

    /// Whether `id` is inside the closure.
    pub fn check_id(&self, id: DbId) -> bool {
        match self {
            Self::Unrestricted => true,
            Self::Scoped(ids) => ids.contains(&id),
        }
    }

    /// Every non-nil ID must pass [`check_id`](Self::check_id). A nil ID
    /// (attaching at the root) is only acceptable when unrestricted.
    pub fn check_parent_ids(&self, ids: &[Option<DbId>]) -> bool {
        ids.iter().all(|id| match id {
            Some(id) => self.check_id(*id),
            None => self.is_unrestricted(),
        })
    }

    /// [`check_id`](Self::check_id), failing `Forbidden`.
    pub fn ensure_id(&self, id: DbId) -> Result<(), CoreError> {
        if self.check_id(id) {
            Ok(())
        } else {
            Err(CoreError::Forbidden(format!(
                "No permission on entity {id}"
            )))
        }
    }

    /// [`check_parent_ids`](Self::check_parent_ids), failing `Forbidden`.
    pub fn ensure_parent_ids(&self, ids: &[Option<DbId>]) -> Result<(), CoreError> {
        if self.check_parent_ids(ids) {
            Ok(())
        } else {
            Err(CoreError::Forbidden(
                "No permission on the requested parent".into(),
            ))
        }
    }

    /// Number of IDs in a scoped closure (`None` when unrestricted).
    pub fn scoped_len(&self) -> Option<usize> {
        match self {
            Self::Unrestricted => None,
            Self::Scoped(ids) => Some(ids.len()),
        }
    }
}

/// Resolve and expand in one step.
///
/// Read checks expand in both directions, write and admin checks only
/// downwards.
pub async fn effective_permissions<S: HierarchyStore + RoleStore>(
    store: &mut S,
    actor: Option<DbId>,
    required: AccessLevel,
    config: &HierarchyConfig,
) -> Result<EffectivePermissions, CoreError> {
    let direct = get_direct_permissions(store, actor, required).await?;
    let expand_ancestors = required == AccessLevel::Read;
    EffectivePermissions::expand(store, &direct, expand_ancestors, config).await
}
