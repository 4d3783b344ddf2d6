//! In-memory store implementing every store contract.
//!
//! Traversals are breadth-first walks bounded by `max_depth`, run separately
//! per direction so a mixed traversal returns ancestors and descendants of
//! the roots but never their siblings. Used by unit tests and by tooling
//! that needs the lifecycle rules without a database.

use std::collections::{BTreeMap, HashMap, VecDeque};

use chrono::Utc;

use crate::entity::{Entity, EntityState, EntityType, EntityVersion, ListItem};
use crate::error::CoreError;
use crate::hierarchy::{
    EntityPatch, EntityStore, HierarchyStore, NewEntity, NewEntityVersion, RoleStore,
    TraversalMode,
};
use crate::roles::{AccessLevel, UserRole};
use crate::types::{DbId, Timestamp};

#[derive(Debug, Clone)]
struct StoredEntity {
    entity: Entity,
    deleted_at: Option<Timestamp>,
}

/// Entity, version, and role rows held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    entities: BTreeMap<DbId, StoredEntity>,
    versions: Vec<EntityVersion>,
    roles: Vec<UserRole>,
    next_id: DbId,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    /// Insert a draft entity directly, bypassing lifecycle validation.
    pub fn seed(&mut self, entity_type: EntityType, name: &str, parent_id: Option<DbId>) -> DbId {
        let id = self.allocate_id();
        let now = Utc::now();
        self.entities.insert(
            id,
            StoredEntity {
                entity: Entity {
                    id,
                    entity_type,
                    name: name.to_string(),
                    content: String::new(),
                    parent_id,
                    created_by: 0,
                    updated_by: 0,
                    state: EntityState::Draft,
                    created_at: now,
                    updated_at: now,
                },
                deleted_at: None,
            },
        );
        id
    }

    /// Overwrite a parent pointer without any checks, to model a corrupted tree.
    pub fn force_parent(&mut self, id: DbId, parent_id: Option<DbId>) {
        if let Some(stored) = self.entities.get_mut(&id) {
            stored.entity.parent_id = parent_id;
        }
    }

    /// Store a role grant and return its ID.
    pub fn grant(&mut self, user_id: DbId, role: AccessLevel, entity_id: Option<DbId>) -> DbId {
        let id = self.allocate_id();
        self.roles.push(UserRole {
            id,
            user_id,
            role,
            entity_id,
            created_at: Utc::now(),
        });
        id
    }

    /// A live (not soft-deleted) entity.
    pub fn entity(&self, id: DbId) -> Option<&Entity> {
        self.entities
            .get(&id)
            .filter(|stored| stored.deleted_at.is_none())
            .map(|stored| &stored.entity)
    }

    pub fn is_deleted(&self, id: DbId) -> bool {
        self.entities
            .get(&id)
            .is_some_and(|stored| stored.deleted_at.is_some())
    }

    /// Versions of an entity, oldest first.
    pub fn versions(&self, entity_id: DbId) -> Vec<EntityVersion> {
        let mut versions: Vec<_> = self
            .versions
            .iter()
            .filter(|v| v.entity_id == entity_id)
            .cloned()
            .collect();
        versions.sort_by_key(|v| v.version);
        versions
    }

    /// Every live entity as a list item at depth 0.
    pub fn live_items(&self) -> Vec<ListItem> {
        self.entities
            .values()
            .filter(|stored| stored.deleted_at.is_none())
            .map(|stored| to_item(&stored.entity, 0))
            .collect()
    }

    fn children_index(&self) -> HashMap<DbId, Vec<DbId>> {
        let mut index: HashMap<DbId, Vec<DbId>> = HashMap::new();
        for stored in self.entities.values() {
            if stored.deleted_at.is_some() {
                continue;
            }
            if let Some(parent_id) = stored.entity.parent_id {
                index.entry(parent_id).or_default().push(stored.entity.id);
            }
        }
        index
    }

    fn walk(
        &self,
        root_ids: &[DbId],
        max_depth: i32,
        next: impl Fn(DbId) -> Vec<DbId>,
        depths: &mut HashMap<DbId, i32>,
    ) {
        let mut seen: HashMap<DbId, i32> = HashMap::new();
        let mut queue = VecDeque::new();
        for &root in root_ids {
            if self.entity(root).is_some() && !seen.contains_key(&root) {
                seen.insert(root, 0);
                queue.push_back((root, 0));
            }
        }
        while let Some((id, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            for neighbour in next(id) {
                if self.entity(neighbour).is_none() || seen.contains_key(&neighbour) {
                    continue;
                }
                seen.insert(neighbour, depth + 1);
                queue.push_back((neighbour, depth + 1));
            }
        }
        for (id, depth) in seen {
            depths
                .entry(id)
                .and_modify(|d| *d = (*d).min(depth))
                .or_insert(depth);
        }
    }

    fn live_mut(&mut self, id: DbId) -> Result<&mut StoredEntity, CoreError> {
        self.entities
            .get_mut(&id)
            .filter(|stored| stored.deleted_at.is_none())
            .ok_or(CoreError::NotFound {
                entity: "Entity",
                id,
            })
    }
}

fn to_item(entity: &Entity, depth: i32) -> ListItem {
    ListItem {
        id: entity.id,
        entity_type: entity.entity_type,
        name: entity.name.clone(),
        parent_id: entity.parent_id,
        depth,
    }
}

impl HierarchyStore for InMemoryStore {
    async fn get_hierarchy(
        &mut self,
        root_ids: &[DbId],
        max_depth: i32,
        mode: TraversalMode,
    ) -> Result<Vec<ListItem>, CoreError> {
        let mut depths = HashMap::new();

        if mode.includes_children() {
            let index = self.children_index();
            self.walk(
                root_ids,
                max_depth,
                |id| index.get(&id).cloned().unwrap_or_default(),
                &mut depths,
            );
        }
        if mode.includes_parents() {
            self.walk(
                root_ids,
                max_depth,
                |id| {
                    self.entity(id)
                        .and_then(|e| e.parent_id)
                        .into_iter()
                        .collect()
                },
                &mut depths,
            );
        }

        let mut items: Vec<ListItem> = depths
            .into_iter()
            .filter_map(|(id, depth)| self.entity(id).map(|e| to_item(e, depth)))
            .collect();
        items.sort_by_key(|item| (item.depth, item.id));
        Ok(items)
    }

    async fn list_root_ids(&mut self) -> Result<Vec<DbId>, CoreError> {
        Ok(self
            .entities
            .values()
            .filter(|stored| stored.deleted_at.is_none() && stored.entity.parent_id.is_none())
            .map(|stored| stored.entity.id)
            .collect())
    }
}

impl RoleStore for InMemoryStore {
    async fn find_roles(
        &mut self,
        user_id: DbId,
        levels: &[AccessLevel],
    ) -> Result<Vec<UserRole>, CoreError> {
        Ok(self
            .roles
            .iter()
            .filter(|r| r.user_id == user_id && levels.contains(&r.role))
            .cloned()
            .collect())
    }
}

impl EntityStore for InMemoryStore {
    async fn find_entity(&mut self, id: DbId) -> Result<Option<Entity>, CoreError> {
        Ok(self.entity(id).cloned())
    }

    async fn insert_entity(&mut self, input: &NewEntity) -> Result<Entity, CoreError> {
        let id = self.allocate_id();
        let now = Utc::now();
        let entity = Entity {
            id,
            entity_type: input.entity_type,
            name: input.name.clone(),
            content: input.content.clone(),
            parent_id: input.parent_id,
            created_by: input.created_by,
            updated_by: input.created_by,
            state: input.state,
            created_at: now,
            updated_at: now,
        };
        self.entities.insert(
            id,
            StoredEntity {
                entity: entity.clone(),
                deleted_at: None,
            },
        );
        Ok(entity)
    }

    async fn update_entity(&mut self, id: DbId, patch: &EntityPatch) -> Result<Entity, CoreError> {
        let stored = self.live_mut(id)?;
        stored.entity.name = patch.name.clone();
        stored.entity.content = patch.content.clone();
        stored.entity.parent_id = patch.parent_id;
        stored.entity.updated_by = patch.updated_by;
        stored.entity.state = patch.state;
        stored.entity.updated_at = Utc::now();
        Ok(stored.entity.clone())
    }

    async fn insert_version(
        &mut self,
        input: &NewEntityVersion,
    ) -> Result<EntityVersion, CoreError> {
        if self
            .versions
            .iter()
            .any(|v| v.entity_id == input.entity_id && v.version == input.version)
        {
            return Err(CoreError::Internal(format!(
                "Version {} of entity {} already exists",
                input.version, input.entity_id
            )));
        }
        let version = EntityVersion {
            entity_id: input.entity_id,
            version: input.version,
            name: input.name.clone(),
            content: input.content.clone(),
            parent_id: input.parent_id,
            created_by: input.created_by,
            created_at: Utc::now(),
        };
        self.versions.push(version.clone());
        Ok(version)
    }

    async fn latest_version_number(&mut self, id: DbId) -> Result<i32, CoreError> {
        Ok(self
            .versions
            .iter()
            .filter(|v| v.entity_id == id)
            .map(|v| v.version)
            .max()
            .unwrap_or(0))
    }

    async fn soft_delete(&mut self, ids: &[DbId]) -> Result<u64, CoreError> {
        let now = Utc::now();
        let mut count = 0;
        for id in ids {
            if let Some(stored) = self.entities.get_mut(id) {
                if stored.deleted_at.is_none() {
                    stored.deleted_at = Some(now);
                    count += 1;
                }
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(items: &[ListItem]) -> Vec<(DbId, i32)> {
        items.iter().map(|i| (i.id, i.depth)).collect()
    }

    /// root -> a -> b -> c, root -> s (sibling branch)
    fn chain() -> (InMemoryStore, [DbId; 5]) {
        let mut store = InMemoryStore::new();
        let root = store.seed(EntityType::Department, "root", None);
        let a = store.seed(EntityType::Department, "a", Some(root));
        let b = store.seed(EntityType::Department, "b", Some(a));
        let c = store.seed(EntityType::Article, "c", Some(b));
        let s = store.seed(EntityType::Department, "s", Some(root));
        (store, [root, a, b, c, s])
    }

    #[tokio::test]
    async fn test_parents_only_walks_to_root() {
        let (mut store, [root, a, b, c, _]) = chain();
        let items = store
            .get_hierarchy(&[c], 10, TraversalMode::ParentsOnly)
            .await
            .unwrap();
        assert_eq!(ids(&items), vec![(c, 0), (b, 1), (a, 2), (root, 3)]);
    }

    #[tokio::test]
    async fn test_children_only_is_depth_bounded() {
        let (mut store, [root, a, b, _, s]) = chain();
        let items = store
            .get_hierarchy(&[root], 2, TraversalMode::ChildrenOnly)
            .await
            .unwrap();
        assert_eq!(ids(&items), vec![(root, 0), (a, 1), (s, 1), (b, 2)]);
    }

    #[tokio::test]
    async fn test_mixed_mode_excludes_siblings() {
        let (mut store, [root, a, b, c, s]) = chain();
        let items = store
            .get_hierarchy(&[b], 10, TraversalMode::ChildrenAndParents)
            .await
            .unwrap();
        let found: Vec<DbId> = items.iter().map(|i| i.id).collect();
        assert!(found.contains(&root));
        assert!(found.contains(&a));
        assert!(found.contains(&c));
        assert!(!found.contains(&s));
    }

    #[tokio::test]
    async fn test_multiple_roots_take_nearest_depth() {
        let (mut store, [root, a, b, c, _]) = chain();
        let items = store
            .get_hierarchy(&[root, b], 10, TraversalMode::ChildrenOnly)
            .await
            .unwrap();
        let depth_of = |id| items.iter().find(|i| i.id == id).unwrap().depth;
        assert_eq!(depth_of(a), 1);
        assert_eq!(depth_of(b), 0);
        assert_eq!(depth_of(c), 1);
    }

    #[tokio::test]
    async fn test_unknown_and_deleted_roots_contribute_nothing() {
        let (mut store, [_, a, ..]) = chain();
        store.soft_delete(&[a]).await.unwrap();
        let items = store
            .get_hierarchy(&[a, 999], 10, TraversalMode::ChildrenAndParents)
            .await
            .unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_cycle_terminates() {
        let (mut store, [root, a, b, ..]) = chain();
        store.force_parent(root, Some(b));
        let items = store
            .get_hierarchy(&[a], 50, TraversalMode::ParentsOnly)
            .await
            .unwrap();
        assert_eq!(items.len(), 3);
    }

    #[tokio::test]
    async fn test_find_roles_filters_levels() {
        let mut store = InMemoryStore::new();
        store.grant(1, AccessLevel::Read, Some(10));
        store.grant(1, AccessLevel::Write, Some(11));
        store.grant(2, AccessLevel::Admin, None);

        let roles = store
            .find_roles(1, AccessLevel::Write.satisfied_by())
            .await
            .unwrap();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].entity_id, Some(11));
    }
}
