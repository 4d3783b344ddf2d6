//! Assemble traversal output into a deterministic forest.
//!
//! Input is usually permission-filtered, so a node whose parent is missing
//! from the set is promoted to a root instead of being dropped.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::config::HierarchyConfig;
use crate::entity::ListItem;
use crate::error::CoreError;
use crate::hierarchy::{traverse, HierarchyStore, RoleStore, TraversalMode};
use crate::permissions::get_direct_permissions;
use crate::roles::AccessLevel;
use crate::types::DbId;

/// A node in the presentation tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    #[serde(flatten)]
    pub item: ListItem,
    pub children: Vec<TreeNode>,
}

/// Build a forest from a flat item list.
///
/// Duplicate IDs keep the first occurrence. Siblings are ordered by
/// `(name, id)` at every level, so the output does not depend on input order.
pub fn build_tree(items: &[ListItem]) -> Vec<TreeNode> {
    let mut by_id: HashMap<DbId, &ListItem> = HashMap::with_capacity(items.len());
    for item in items {
        by_id.entry(item.id).or_insert(item);
    }

    let mut roots: Vec<DbId> = Vec::new();
    let mut children: HashMap<DbId, Vec<DbId>> = HashMap::new();
    for item in by_id.values() {
        match item.parent_id {
            Some(parent_id) if parent_id != item.id && by_id.contains_key(&parent_id) => {
                children.entry(parent_id).or_default().push(item.id);
            }
            _ => roots.push(item.id),
        }
    }

    // Nodes caught in a parent cycle are unreachable from any root. Promote
    // the smallest ID of each such group so nothing is silently lost.
    let mut visited = HashSet::new();
    let mut forest = assemble(&roots, &by_id, &children, &mut visited);
    let mut stranded: Vec<DbId> = by_id
        .keys()
        .copied()
        .filter(|id| !visited.contains(id))
        .collect();
    stranded.sort_unstable();
    for id in stranded {
        if !visited.contains(&id) {
            forest.extend(assemble(&[id], &by_id, &children, &mut visited));
        }
    }

    sort_siblings(&mut forest);
    forest
}

fn assemble(
    ids: &[DbId],
    by_id: &HashMap<DbId, &ListItem>,
    children: &HashMap<DbId, Vec<DbId>>,
    visited: &mut HashSet<DbId>,
) -> Vec<TreeNode> {
    let mut nodes = Vec::with_capacity(ids.len());
    for id in ids {
        if !visited.insert(*id) {
            continue;
        }
        let Some(item) = by_id.get(id) else {
            continue;
        };
        let kids = children
            .get(id)
            .map(|kids| assemble(kids, by_id, children, visited))
            .unwrap_or_default();
        nodes.push(TreeNode {
            item: (*item).clone(),
            children: kids,
        });
    }
    nodes
}

fn sort_siblings(nodes: &mut [TreeNode]) {
    nodes.sort_by(|a, b| {
        a.item
            .name
            .cmp(&b.item.name)
            .then(a.item.id.cmp(&b.item.id))
    });
    for node in nodes {
        sort_siblings(&mut node.children);
    }
}

/// The tree an actor may read.
///
/// Unrestricted actors see every root and its descendants. Scoped actors see
/// their granted entities together with the ancestors and descendants of
/// each, so a grant deep in the tree still renders under its real root.
pub async fn visible_tree<S: HierarchyStore + RoleStore>(
    store: &mut S,
    actor: Option<DbId>,
    config: &HierarchyConfig,
) -> Result<Vec<TreeNode>, CoreError> {
    let direct = get_direct_permissions(store, actor, AccessLevel::Read).await?;

    let (root_ids, mode) = if direct.is_admin {
        (store.list_root_ids().await?, TraversalMode::ChildrenOnly)
    } else {
        (direct.entity_ids, TraversalMode::ChildrenAndParents)
    };

    let items = traverse(
        store,
        &root_ids,
        config.max_hierarchy_depth(),
        mode,
        config.traversal_timeout(),
    )
    .await?;

    Ok(build_tree(&items))
}
