//! # Namespace Tree
//!
//! The hierarchical namespace of a case: registry keys (and value names)
//! as nodes keyed by `(parent, label)`.
//!
//! Three structures live here:
//! - the node arena (`NodeId -> TreeNode`), persisted in the snapshot and
//!   used by `lookup_by_id` during rehydration;
//! - the session cache (`(parent, label) -> TreeNode`), the working set of
//!   the current run, seeded from the node table on resume and dropped
//!   before a checkpoint;
//! - the child index (`parent -> {children}`), derived from committed edges
//!   and rebuilt after every commit.
//!
//! All maps are `BTreeMap`/`BTreeSet` for deterministic iteration.

use crate::primitives::{FIRST_NODE_ID, ROOT_PARENT};
use crate::{CaseError, NodeId, StringId, TreeNode};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// NAMESPACESTORE TRAIT
// =============================================================================

/// Operations the indexer needs from a namespace.
pub trait NamespaceStore {
    /// Return the node for `(parent, label)`, allocating it if unseen.
    fn resolve_or_create(&mut self, parent: NodeId, label: StringId)
    -> Result<NodeId, CaseError>;

    /// Lookup a node by id.
    fn lookup_by_id(&self, id: NodeId) -> Option<TreeNode>;

    /// Children of `parent` according to the last rebuilt child index.
    fn children(&self, parent: NodeId) -> Vec<NodeId>;

    /// Resolve a full key path from the root, creating missing segments.
    fn resolve_path(&mut self, labels: &[StringId]) -> Result<NodeId, CaseError> {
        let mut current = ROOT_PARENT;
        for &label in labels {
            current = self.resolve_or_create(current, label)?;
        }
        Ok(current)
    }
}

/// How a persisted edge was reconciled with the node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeReconcile {
    /// The arena already held the node with the same parent and label.
    Known,
    /// The node was missing from the arena and has been adopted from the edge.
    Adopted,
}

// =============================================================================
// NAMESPACE TREE
// =============================================================================

/// In-memory namespace tree owned by a `CaseContext`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceTree {
    /// Every node ever allocated in this case.
    nodes: BTreeMap<NodeId, TreeNode>,
    /// Session cache: (parent, label) -> node.
    #[serde(skip)]
    past_queries: BTreeMap<(NodeId, StringId), TreeNode>,
    /// Nodes below this id were already stored when the session began.
    #[serde(skip)]
    stored_below: u64,
    /// Child index: parent -> children, from committed edges.
    pid_cache: BTreeMap<NodeId, BTreeSet<NodeId>>,
    /// Next available node id.
    next_node_id: u64,
}

impl Default for NamespaceTree {
    fn default() -> Self {
        Self {
            nodes: BTreeMap::new(),
            past_queries: BTreeMap::new(),
            stored_below: 0,
            pid_cache: BTreeMap::new(),
            next_node_id: FIRST_NODE_ID,
        }
    }
}

impl NamespaceTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total nodes in the arena.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Entries in the session cache.
    #[must_use]
    pub fn session_len(&self) -> usize {
        self.past_queries.len()
    }

    #[must_use]
    pub fn next_node_id(&self) -> u64 {
        self.next_node_id
    }

    /// Every node in the arena, in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &TreeNode> {
        self.nodes.values()
    }

    /// Session cache lookup without allocation.
    #[must_use]
    pub fn find(&self, parent: NodeId, label: StringId) -> Option<TreeNode> {
        self.past_queries.get(&(parent, label)).copied()
    }

    /// Every edge in the session cache, in (parent, label) order.
    pub fn session_edges(&self) -> impl Iterator<Item = TreeNode> + '_ {
        self.past_queries.values().copied()
    }

    /// Session edges allocated by this run and not yet in the node table.
    pub fn pending_edges(&self) -> impl Iterator<Item = TreeNode> + '_ {
        self.past_queries
            .values()
            .filter(|node| node.id.0 >= self.stored_below)
            .copied()
    }

    /// The child index as built by the last `rebuild_child_index`.
    #[must_use]
    pub fn child_index(&self) -> &BTreeMap<NodeId, BTreeSet<NodeId>> {
        &self.pid_cache
    }

    /// Reconcile one edge loaded from the node table into the session cache.
    ///
    /// The arena is authoritative for node identity: an id bound to another
    /// `(parent, label)` is an invariant violation. An id missing from the
    /// arena (committed by a run that never checkpointed) is adopted and the
    /// allocator moves past it.
    pub fn rehydrate_edge(&mut self, edge: TreeNode) -> Result<EdgeReconcile, CaseError> {
        let outcome = match self.nodes.get(&edge.id) {
            Some(known) if known.key() == edge.key() => EdgeReconcile::Known,
            Some(known) => {
                return Err(CaseError::ConflictingNode {
                    id: edge.id,
                    stored_parent: known.parent,
                    stored_label: known.label,
                    parent: edge.parent,
                    label: edge.label,
                });
            }
            None => {
                self.nodes.insert(edge.id, edge);
                EdgeReconcile::Adopted
            }
        };
        if edge.id.0 >= self.next_node_id {
            self.next_node_id = edge.id.0.saturating_add(1);
        }
        self.past_queries.insert(edge.key(), edge);
        Ok(outcome)
    }

    /// Replace the child index with one derived from `edges`.
    pub fn rebuild_child_index<I>(&mut self, edges: I)
    where
        I: IntoIterator<Item = TreeNode>,
    {
        let mut pid_cache: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();
        for edge in edges {
            pid_cache.entry(edge.parent).or_default().insert(edge.id);
        }
        self.pid_cache = pid_cache;
    }

    /// Record that every node allocated so far is in the node table.
    pub(crate) fn mark_stored(&mut self) {
        self.stored_below = self.next_node_id;
    }

    /// Drop the session cache. It is rebuilt from the node table on resume.
    pub(crate) fn clear_session_cache(&mut self) {
        self.past_queries.clear();
    }
}

impl NamespaceStore for NamespaceTree {
    fn resolve_or_create(
        &mut self,
        parent: NodeId,
        label: StringId,
    ) -> Result<NodeId, CaseError> {
        if let Some(node) = self.past_queries.get(&(parent, label)) {
            return Ok(node.id);
        }
        if parent != ROOT_PARENT && !self.nodes.contains_key(&parent) {
            return Err(CaseError::NodeNotFound(parent));
        }

        let node = TreeNode::new(NodeId(self.next_node_id), parent, label);
        self.next_node_id = self.next_node_id.saturating_add(1);
        self.nodes.insert(node.id, node);
        self.past_queries.insert(node.key(), node);
        Ok(node.id)
    }

    fn lookup_by_id(&self, id: NodeId) -> Option<TreeNode> {
        self.nodes.get(&id).copied()
    }

    fn children(&self, parent: NodeId) -> Vec<NodeId> {
        self.pid_cache
            .get(&parent)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_pair_resolves_to_same_node() {
        let mut tree = NamespaceTree::new();
        let a = tree.resolve_or_create(ROOT_PARENT, StringId(1)).expect("a");
        let b = tree.resolve_or_create(ROOT_PARENT, StringId(1)).expect("b");

        assert_eq!(a, b);
        assert_eq!(tree.node_count(), 1);
        assert_eq!(a, NodeId(FIRST_NODE_ID));
    }

    #[test]
    fn unknown_parent_is_rejected() {
        let mut tree = NamespaceTree::new();
        let result = tree.resolve_or_create(NodeId(99), StringId(1));
        assert!(matches!(result, Err(CaseError::NodeNotFound(NodeId(99)))));
    }

    #[test]
    fn resolve_path_shares_prefixes() {
        let mut tree = NamespaceTree::new();
        let services = tree
            .resolve_path(&[StringId(0), StringId(1)])
            .expect("path");
        let enum_key = tree
            .resolve_path(&[StringId(0), StringId(2)])
            .expect("path");

        assert_ne!(services, enum_key);
        assert_eq!(tree.node_count(), 3);
        let enum_node = tree.lookup_by_id(enum_key).expect("node");
        assert_eq!(enum_node.label, StringId(2));
        assert_eq!(
            tree.lookup_by_id(enum_node.parent).map(|n| n.label),
            Some(StringId(0))
        );
    }

    #[test]
    fn rehydrate_known_edge_seeds_cache() {
        let mut tree = NamespaceTree::new();
        let id = tree.resolve_or_create(ROOT_PARENT, StringId(4)).expect("id");
        tree.clear_session_cache();
        assert!(tree.find(ROOT_PARENT, StringId(4)).is_none());

        let edge = TreeNode::new(id, ROOT_PARENT, StringId(4));
        assert_eq!(tree.rehydrate_edge(edge).expect("known"), EdgeReconcile::Known);
        assert_eq!(tree.find(ROOT_PARENT, StringId(4)), Some(edge));
    }

    #[test]
    fn rehydrate_conflicting_edge_fails() {
        let mut tree = NamespaceTree::new();
        let id = tree.resolve_or_create(ROOT_PARENT, StringId(4)).expect("id");

        let result = tree.rehydrate_edge(TreeNode::new(id, ROOT_PARENT, StringId(5)));
        assert!(matches!(result, Err(CaseError::ConflictingNode { .. })));
    }

    #[test]
    fn rehydrate_unknown_edge_is_adopted() {
        let mut tree = NamespaceTree::new();
        let edge = TreeNode::new(NodeId(10), ROOT_PARENT, StringId(1));

        assert_eq!(tree.rehydrate_edge(edge).expect("adopt"), EdgeReconcile::Adopted);
        assert_eq!(tree.lookup_by_id(NodeId(10)), Some(edge));
        assert_eq!(tree.next_node_id(), 11);
    }

    #[test]
    fn child_index_lists_each_child_once() {
        let mut tree = NamespaceTree::new();
        let root = tree.resolve_or_create(ROOT_PARENT, StringId(0)).expect("root");
        let a = tree.resolve_or_create(root, StringId(1)).expect("a");
        let b = tree.resolve_or_create(root, StringId(2)).expect("b");

        let mut edges: Vec<TreeNode> = tree.session_edges().collect();
        edges.extend(tree.session_edges());
        tree.rebuild_child_index(edges);

        assert_eq!(tree.children(root), vec![a, b]);
        assert_eq!(tree.children(ROOT_PARENT), vec![root]);
        assert!(tree.children(a).is_empty());
    }

    #[test]
    fn pending_edges_exclude_stored_nodes() {
        let mut tree = NamespaceTree::new();
        let stored = TreeNode::new(NodeId(1), ROOT_PARENT, StringId(0));
        tree.rehydrate_edge(stored).expect("rehydrate");
        tree.mark_stored();

        let child = tree.resolve_or_create(stored.id, StringId(1)).expect("child");
        let pending: Vec<NodeId> = tree.pending_edges().map(|e| e.id).collect();

        assert_eq!(tree.session_len(), 2);
        assert_eq!(pending, vec![child]);
    }

    #[test]
    fn snapshot_drops_session_cache() {
        let mut tree = NamespaceTree::new();
        tree.resolve_or_create(ROOT_PARENT, StringId(0)).expect("node");

        let bytes = postcard::to_stdvec(&tree).expect("serialize");
        let restored: NamespaceTree = postcard::from_bytes(&bytes).expect("deserialize");

        assert_eq!(restored.session_len(), 0);
        assert_eq!(restored.node_count(), 1);
        assert_eq!(restored.next_node_id(), tree.next_node_id());
    }
}
