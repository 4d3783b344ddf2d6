//! Entity lifecycle: create, update, and delete with structural validation.
//!
//! Every mutation keeps the persisted tree valid:
//! - no entity is its own ancestor
//! - no root-to-leaf path holds more than `max_hierarchy_depth` entities
//! - articles always have a parent; departments never sit under articles
//! - an entity with living children is never moved back to draft, and a
//!   draft never takes a child
//!
//! Depth is counted in levels: a root is level 1, its children level 2. A
//! parent whose ancestor chain (itself included) already has
//! `max_hierarchy_depth` entries cannot take another child.
//!
//! Checks run in a fixed order: existence, cycle, type compatibility, depth,
//! then publication state of the new parent.
//!
//! The engine is generic over [`EntityStore`]. Callers backed by a database
//! must hand in a store whose reads and writes share one transaction so the
//! validation and the write see the same snapshot.

use serde::{Deserialize, Deserializer};

use crate::config::HierarchyConfig;
use crate::entity::{
    validate_content, validate_name, Entity, EntityState, EntityType, ListItem,
};
use crate::error::CoreError;
use crate::hierarchy::{
    deepest, traverse, EntityPatch, EntityStore, NewEntity, NewEntityVersion, TraversalMode,
};
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Input for [`EntityLifecycle::create`].
#[derive(Debug, Clone, Deserialize)]
pub struct CreateEntity {
    /// `"article"` or `"department"`; anything else fails validation.
    pub entity_type: String,
    pub name: String,
    #[serde(default)]
    pub content: String,
    pub parent_id: Option<DbId>,
    #[serde(default)]
    pub is_draft: bool,
}

/// Input for [`EntityLifecycle::update`].
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateEntity {
    pub name: String,
    /// `None` keeps the current content.
    pub content: Option<String>,
    /// Absent: parent unchanged. `null`: move to the root. A value: move
    /// under that entity.
    #[serde(default, deserialize_with = "deserialize_present")]
    pub parent_id: Option<Option<DbId>>,
    /// `None` keeps the current publication state.
    pub is_draft: Option<bool>,
}

impl UpdateEntity {
    pub fn parent_changed(&self) -> bool {
        self.parent_id.is_some()
    }
}

/// Distinguish an explicit `null` from an absent field.
fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Result of [`EntityLifecycle::delete`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DeleteOutcome {
    /// The entity and every descendant removed with it.
    pub deleted_ids: Vec<DbId>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The mutation engine. Holds only configuration; all state lives in the
/// store handed to each call.
#[derive(Debug, Clone, Copy)]
pub struct EntityLifecycle {
    config: HierarchyConfig,
}

impl EntityLifecycle {
    pub fn new(config: HierarchyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HierarchyConfig {
        &self.config
    }

    /// Create a draft or published entity.
    pub async fn create<S: EntityStore>(
        &self,
        store: &mut S,
        actor: Option<DbId>,
        input: &CreateEntity,
    ) -> Result<Entity, CoreError> {
        let actor = require_actor(actor)?;
        let entity_type = EntityType::from_name(&input.entity_type)?;
        let name = validate_name(&input.name, self.config.max_name_length())?;
        validate_content(&input.content)?;

        match input.parent_id {
            Some(parent_id) => {
                let chain = self.ancestor_chain(store, parent_id).await?;
                entity_type.validate_parent_type(parent_of(&chain, parent_id)?.entity_type)?;
                self.ensure_fits(chain.len() as i32, 1)?;
                ensure_parent_published(store, parent_id).await?;
            }
            None if entity_type.requires_parent() => return Err(CoreError::ParentRequired),
            None => {}
        }

        let state = if input.is_draft {
            EntityState::Draft
        } else {
            EntityState::Published { version: 1 }
        };

        let entity = store
            .insert_entity(&NewEntity {
                entity_type,
                name,
                content: input.content.clone(),
                parent_id: input.parent_id,
                created_by: actor,
                state,
            })
            .await?;

        if let EntityState::Published { version } = state {
            store.insert_version(&snapshot(&entity, version, actor)).await?;
        }

        tracing::debug!(entity_id = entity.id, entity_type = %entity_type, "Entity created");
        Ok(entity)
    }

    /// Update name, content, parent, and publication state.
    ///
    /// Published results always append a new version; draft results are
    /// updated in place.
    pub async fn update<S: EntityStore>(
        &self,
        store: &mut S,
        actor: Option<DbId>,
        id: DbId,
        input: &UpdateEntity,
    ) -> Result<Entity, CoreError> {
        let actor = require_actor(actor)?;
        let name = validate_name(&input.name, self.config.max_name_length())?;
        if let Some(content) = &input.content {
            validate_content(content)?;
        }

        let current = store
            .find_entity(id)
            .await?
            .ok_or(CoreError::NotFound { entity: "Entity", id })?;

        let mut subtree = None;
        let parent_id = match input.parent_id {
            Some(new_parent) => {
                subtree = Some(self.validate_move(store, &current, new_parent).await?);
                new_parent
            }
            None => current.parent_id,
        };

        let to_draft = input.is_draft.unwrap_or(current.state.is_draft());
        if input.is_draft == Some(true) {
            let has_children = match &subtree {
                Some(items) => items.iter().any(|item| item.depth > 0),
                None => self.has_children(store, id).await?,
            };
            if has_children {
                tracing::debug!(entity_id = id, "Rejected draft transition: entity has children");
                return Err(CoreError::CannotDraftEntityWithChildren(id));
            }
        }

        let state = if to_draft {
            EntityState::Draft
        } else {
            let next = match current.state {
                EntityState::Published { version } => version + 1,
                EntityState::Draft => store.latest_version_number(id).await? + 1,
            };
            EntityState::Published { version: next }
        };

        let updated = store
            .update_entity(
                id,
                &EntityPatch {
                    name,
                    content: input.content.clone().unwrap_or(current.content),
                    parent_id,
                    updated_by: actor,
                    state,
                },
            )
            .await?;

        if let EntityState::Published { version } = state {
            store.insert_version(&snapshot(&updated, version, actor)).await?;
        }

        Ok(updated)
    }

    /// Soft-delete an entity together with its whole subtree.
    pub async fn delete<S: EntityStore>(
        &self,
        store: &mut S,
        id: DbId,
    ) -> Result<DeleteOutcome, CoreError> {
        let subtree = self.descendants(store, id).await?;
        if subtree.is_empty() {
            return Err(CoreError::NotFound { entity: "Entity", id });
        }

        let max = self.config.max_hierarchy_depth();
        if deepest(&subtree).is_some_and(|depth| depth > max) {
            tracing::warn!(entity_id = id, max, "Subtree deeper than the configured bound");
            return Err(CoreError::MaxDepthExceeded { max });
        }

        let deleted_ids: Vec<DbId> = subtree.iter().map(|item| item.id).collect();
        store.soft_delete(&deleted_ids).await?;

        Ok(DeleteOutcome { deleted_ids })
    }

    // -- validation helpers -------------------------------------------------

    /// Validate moving `current` under `new_parent` and return its subtree
    /// (the entity itself at depth 0).
    async fn validate_move<S: EntityStore>(
        &self,
        store: &mut S,
        current: &Entity,
        new_parent: Option<DbId>,
    ) -> Result<Vec<ListItem>, CoreError> {
        let id = current.id;

        let Some(parent_id) = new_parent else {
            if current.entity_type.requires_parent() {
                return Err(CoreError::ParentRequired);
            }
            let subtree = self.descendants(store, id).await?;
            self.ensure_fits(0, subtree_height(&subtree))?;
            return Ok(subtree);
        };

        if parent_id == id {
            return Err(CoreError::ParentCycle { id, parent_id });
        }

        let chain = self.ancestor_chain(store, parent_id).await?;
        if chain.iter().any(|item| item.id == id) {
            tracing::debug!(entity_id = id, parent_id, "Rejected move into own subtree");
            return Err(CoreError::ParentCycle { id, parent_id });
        }

        current
            .entity_type
            .validate_parent_type(parent_of(&chain, parent_id)?.entity_type)?;

        let subtree = self.descendants(store, id).await?;
        self.ensure_fits(chain.len() as i32, subtree_height(&subtree))?;
        ensure_parent_published(store, parent_id).await?;

        Ok(subtree)
    }

    /// The parent's ancestor chain, the parent itself at depth 0.
    async fn ancestor_chain<S: EntityStore>(
        &self,
        store: &mut S,
        parent_id: DbId,
    ) -> Result<Vec<ListItem>, CoreError> {
        let chain = traverse(
            store,
            &[parent_id],
            self.config.max_hierarchy_depth() + 1,
            TraversalMode::ParentsOnly,
            self.config.traversal_timeout(),
        )
        .await?;
        if chain.is_empty() {
            return Err(CoreError::ParentNotFound(parent_id));
        }
        Ok(chain)
    }

    async fn descendants<S: EntityStore>(
        &self,
        store: &mut S,
        id: DbId,
    ) -> Result<Vec<ListItem>, CoreError> {
        traverse(
            store,
            &[id],
            self.config.max_hierarchy_depth() + 1,
            TraversalMode::ChildrenOnly,
            self.config.traversal_timeout(),
        )
        .await
    }

    async fn has_children<S: EntityStore>(
        &self,
        store: &mut S,
        id: DbId,
    ) -> Result<bool, CoreError> {
        let shallow = traverse(
            store,
            &[id],
            1,
            TraversalMode::ChildrenOnly,
            self.config.traversal_timeout(),
        )
        .await?;
        Ok(shallow.iter().any(|item| item.depth > 0))
    }

    /// Reject when `parent_levels + subtree_levels` exceeds the bound.
    fn ensure_fits(&self, parent_levels: i32, subtree_levels: i32) -> Result<(), CoreError> {
        let max = self.config.max_hierarchy_depth();
        if parent_levels + subtree_levels > max {
            tracing::debug!(parent_levels, subtree_levels, max, "Rejected: hierarchy too deep");
            return Err(CoreError::MaxDepthExceeded { max });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Free helpers
// ---------------------------------------------------------------------------

fn require_actor(actor: Option<DbId>) -> Result<DbId, CoreError> {
    actor.ok_or_else(|| CoreError::Validation("An acting user is required".into()))
}

/// A draft may not have living children, so it cannot take a new one.
async fn ensure_parent_published<S: EntityStore>(
    store: &mut S,
    parent_id: DbId,
) -> Result<(), CoreError> {
    let parent = store
        .find_entity(parent_id)
        .await?
        .ok_or(CoreError::ParentNotFound(parent_id))?;
    if parent.state.is_draft() {
        tracing::debug!(parent_id, "Rejected attach under a draft parent");
        return Err(CoreError::CannotDraftEntityWithChildren(parent_id));
    }
    Ok(())
}

fn parent_of(chain: &[ListItem], parent_id: DbId) -> Result<&ListItem, CoreError> {
    chain
        .iter()
        .find(|item| item.id == parent_id)
        .ok_or(CoreError::ParentNotFound(parent_id))
}

/// Number of levels in a subtree (1 for a leaf).
fn subtree_height(subtree: &[ListItem]) -> i32 {
    deepest(subtree).map_or(1, |depth| depth + 1)
}

fn snapshot(entity: &Entity, version: i32, actor: DbId) -> NewEntityVersion {
    NewEntityVersion {
        entity_id: entity.id,
        version,
        name: entity.name.clone(),
        content: entity.content.clone(),
        parent_id: entity.parent_id,
        created_by: actor,
    }
}
