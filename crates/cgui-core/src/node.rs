//! Generic node tree.
//!
//! [`Tree`] is an arena of nodes keyed by generation-checked [`NodeId`]s. Each
//! node owns an ordered list of children, knows its parent, carries a payload
//! and a list of registered [`GuardSlot`]s. Nodes without a parent live in the
//! tree's root list, so every node always has exactly one owner.
//!
//! # Invariants
//!
//! - A node's `parent` is `Some(p)` iff the node appears in `p`'s children.
//! - A node's `parent` is `None` iff the node appears in the root list.
//! - Child order is insertion order and is the traversal order.
//! - Destruction is post-order: children are gone before their parent.
//!
//! Passing an id that is stale or not related the way an operation expects
//! is never a panic. Structural operations return `None`/`false`; the few
//! that need to explain themselves return a [`GraphError`].

use std::collections::VecDeque;

use slotmap::{SlotMap, new_key_type};

use crate::error::{GraphError, GraphResult};
use crate::guard::{GuardList, GuardSlot};
use crate::logging::targets;

new_key_type! {
    /// A generation-checked handle to a node in a [`Tree`].
    ///
    /// Ids stay valid while the tree is restructured and stop resolving once
    /// the node is destroyed, even if its slot is reused.
    pub struct NodeId;
}

impl NodeId {
    /// Raw FFI-friendly representation of this id.
    pub fn as_raw(self) -> u64 {
        use slotmap::Key;
        self.data().as_ffi()
    }
}

struct NodeData<T> {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    guards: GuardList,
    value: T,
}

impl<T> NodeData<T> {
    fn new(parent: Option<NodeId>, value: T) -> Self {
        Self {
            parent,
            children: Vec::new(),
            guards: GuardList::default(),
            value,
        }
    }
}

/// A forest of nodes carrying payloads of type `T`.
pub struct Tree<T> {
    nodes: SlotMap<NodeId, NodeData<T>>,
    roots: Vec<NodeId>,
}

impl<T> Tree<T> {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            roots: Vec::new(),
        }
    }

    /// Number of live nodes across the whole forest.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the forest has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether `id` refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Root nodes in registration order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Iterate over every live node in arena order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &T)> + '_ {
        self.nodes.iter().map(|(id, data)| (id, &data.value))
    }

    /// Payload of a node.
    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.nodes.get(id).map(|d| &d.value)
    }

    /// Mutable payload of a node.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.nodes.get_mut(id).map(|d| &mut d.value)
    }

    // =========================================================================
    // Structural mutation
    // =========================================================================

    /// Add a new root node at the back of the forest.
    pub fn insert_root(&mut self, value: T) -> NodeId {
        let id = self.nodes.insert(NodeData::new(None, value));
        self.roots.push(id);
        tracing::trace!(target: targets::NODE, ?id, "inserted root");
        id
    }

    /// Add a new child at the back of `parent`'s children.
    pub fn push(&mut self, parent: NodeId, value: T) -> GraphResult<NodeId> {
        if !self.nodes.contains_key(parent) {
            return Err(GraphError::StaleNode);
        }
        let id = self.nodes.insert(NodeData::new(Some(parent), value));
        if let Some(parent_data) = self.nodes.get_mut(parent) {
            parent_data.children.push(id);
        }
        tracing::trace!(target: targets::NODE, ?id, ?parent, "pushed child");
        Ok(id)
    }

    /// Detach `child` from `parent` without destroying it.
    ///
    /// The detached node becomes a root of the forest and keeps its subtree.
    /// Returns `None` if `child` is not a direct child of `parent`.
    pub fn pop(&mut self, parent: NodeId, child: NodeId) -> Option<NodeId> {
        if !self.is_child_of(child, parent) {
            return None;
        }
        self.detach(child);
        if let Some(data) = self.nodes.get_mut(child) {
            data.parent = None;
        }
        self.roots.push(child);
        tracing::trace!(target: targets::NODE, id = ?child, ?parent, "popped child");
        Some(child)
    }

    /// Detach and destroy `child` together with its subtree.
    ///
    /// Returns `false` without touching anything if `child` is not a direct
    /// child of `parent`.
    pub fn delete(&mut self, parent: NodeId, child: NodeId) -> bool {
        if !self.is_child_of(child, parent) {
            return false;
        }
        self.destroy(child)
    }

    /// Destroy the last child of `parent`.
    pub fn delete_back(&mut self, parent: NodeId) -> bool {
        match self.back(parent) {
            Some(child) => self.destroy(child),
            None => false,
        }
    }

    /// Destroy the first child of `parent`.
    pub fn delete_front(&mut self, parent: NodeId) -> bool {
        match self.front(parent) {
            Some(child) => self.destroy(child),
            None => false,
        }
    }

    /// Destroy a node and its whole subtree, children first.
    ///
    /// Returns `false` if the node was already gone.
    pub fn destroy(&mut self, id: NodeId) -> bool {
        let _span = tracing::trace_span!(target: targets::NODE, "destroy", ?id).entered();
        let Ok(order) = self.postorder(id) else {
            return false;
        };
        tracing::trace!(target: targets::NODE, ?id, node_count = order.len(), "destroying subtree");
        for node in order {
            // Post-order guarantees every node is a leaf by the time we reach it.
            drop(self.remove_leaf(node));
        }
        true
    }

    /// Remove a childless node and return its payload.
    ///
    /// Nulls the node's guard slots, then detaches it from its parent or the
    /// root list. Returns `None` if the node is gone or still has children.
    /// Owners that run teardown logic per node build their own post-order
    /// destruction on top of this.
    pub fn remove_leaf(&mut self, id: NodeId) -> Option<T> {
        let data = self.nodes.get_mut(id)?;
        if !data.children.is_empty() {
            return None;
        }
        let nulled = data.guards.invalidate();
        self.detach(id);
        let data = self.nodes.remove(id)?;
        tracing::trace!(target: targets::NODE, ?id, guards_nulled = nulled, "removed node");
        Some(data.value)
    }

    /// Move `id` (with its subtree) to the back of `new_parent`'s children.
    pub fn adopt(&mut self, new_parent: NodeId, id: NodeId) -> GraphResult<()> {
        if !self.nodes.contains_key(id) || !self.nodes.contains_key(new_parent) {
            return Err(GraphError::StaleNode);
        }
        if id == new_parent || self.is_descendant_of(new_parent, id) {
            tracing::warn!(target: targets::NODE, ?id, ?new_parent, "rejected circular parentage");
            return Err(GraphError::CircularParentage);
        }
        self.detach(id);
        if let Some(data) = self.nodes.get_mut(id) {
            data.parent = Some(new_parent);
        }
        if let Some(parent_data) = self.nodes.get_mut(new_parent) {
            parent_data.children.push(id);
        }
        tracing::trace!(target: targets::NODE, ?id, ?new_parent, "adopted node");
        Ok(())
    }

    /// Register a guard slot that reads `None` once `id` is destroyed.
    pub fn guard(&mut self, id: NodeId) -> GraphResult<GuardSlot> {
        let data = self.nodes.get_mut(id).ok_or(GraphError::StaleNode)?;
        Ok(data.guards.register(id))
    }

    /// Number of guard slots registered on `id` whose holders are alive.
    pub fn guard_count(&self, id: NodeId) -> usize {
        self.nodes.get(id).map_or(0, |d| d.guards.live_count())
    }

    /// Unlink `id` from its owner's list. Leaves `id`'s own parent field alone.
    fn detach(&mut self, id: NodeId) {
        let parent = self.nodes.get(id).and_then(|d| d.parent);
        match parent {
            Some(parent_id) => {
                if let Some(parent_data) = self.nodes.get_mut(parent_id) {
                    parent_data.children.retain(|&child| child != id);
                }
            }
            None => self.roots.retain(|&root| root != id),
        }
    }

    /// The list that owns `id`: its parent's children, or the root list.
    fn owner_list_mut(&mut self, id: NodeId) -> Option<&mut Vec<NodeId>> {
        let parent = self.nodes.get(id)?.parent;
        match parent {
            Some(parent_id) => self.nodes.get_mut(parent_id).map(|p| &mut p.children),
            None => Some(&mut self.roots),
        }
    }

    // =========================================================================
    // Z-Order / Sibling Ordering
    // =========================================================================

    /// Index of `id` among its siblings. Roots are indexed within the root list.
    pub fn sibling_index(&self, id: NodeId) -> Option<usize> {
        let data = self.nodes.get(id)?;
        let siblings = match data.parent {
            Some(parent_id) => &self.nodes.get(parent_id)?.children,
            None => &self.roots,
        };
        siblings.iter().position(|&sibling| sibling == id)
    }

    /// Move `id` to the back of its siblings (last visited, front-most).
    pub fn raise(&mut self, id: NodeId) -> bool {
        let Some(list) = self.owner_list_mut(id) else {
            return false;
        };
        list.retain(|&sibling| sibling != id);
        list.push(id);
        true
    }

    /// Move `id` to the front of its siblings (first visited, back-most).
    pub fn lower(&mut self, id: NodeId) -> bool {
        let Some(list) = self.owner_list_mut(id) else {
            return false;
        };
        list.retain(|&sibling| sibling != id);
        list.insert(0, id);
        true
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Parent of `id`, `None` for roots and stale ids.
    pub fn stem(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|d| d.parent)
    }

    /// Topmost ancestor of `id` (itself if it is a root).
    pub fn root(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        let mut data = self.nodes.get(current)?;
        while let Some(parent) = data.parent {
            current = parent;
            data = self.nodes.get(current)?;
        }
        Some(current)
    }

    /// Children of `id` in traversal order. Empty for stale ids.
    pub fn branches(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map_or(&[], |d| d.children.as_slice())
    }

    /// Number of children of `id`.
    pub fn branch_count(&self, id: NodeId) -> usize {
        self.branches(id).len()
    }

    /// First child of `id`.
    pub fn front(&self, id: NodeId) -> Option<NodeId> {
        self.branches(id).first().copied()
    }

    /// Last child of `id`.
    pub fn back(&self, id: NodeId) -> Option<NodeId> {
        self.branches(id).last().copied()
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.nodes.get(id).is_some_and(|d| d.children.is_empty())
    }

    pub fn is_root(&self, id: NodeId) -> bool {
        self.nodes.get(id).is_some_and(|d| d.parent.is_none())
    }

    /// A node with both a parent and children.
    pub fn is_trunk(&self, id: NodeId) -> bool {
        self.nodes
            .get(id)
            .is_some_and(|d| d.parent.is_some() && !d.children.is_empty())
    }

    /// Number of edges between `id` and its root.
    pub fn level(&self, id: NodeId) -> Option<usize> {
        let mut data = self.nodes.get(id)?;
        let mut level = 0;
        while let Some(parent) = data.parent {
            level += 1;
            data = self.nodes.get(parent)?;
        }
        Some(level)
    }

    /// Whether `ancestor` appears strictly above `id`.
    pub fn is_descendant_of(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut current = self.stem(id);
        while let Some(current_id) = current {
            if current_id == ancestor {
                return true;
            }
            current = self.stem(current_id);
        }
        false
    }

    /// Whether `parent` is the direct parent of `id`.
    pub fn is_child_of(&self, id: NodeId, parent: NodeId) -> bool {
        self.nodes.contains_key(parent) && self.stem(id) == Some(parent)
    }

    // =========================================================================
    // Traversal
    // =========================================================================

    /// All ancestors of a node from immediate parent to root.
    pub fn ancestors(&self, id: NodeId) -> GraphResult<Vec<NodeId>> {
        if !self.nodes.contains_key(id) {
            return Err(GraphError::StaleNode);
        }
        let mut result = Vec::new();
        let mut current = self.stem(id);
        while let Some(current_id) = current {
            result.push(current_id);
            current = self.stem(current_id);
        }
        Ok(result)
    }

    /// Depth-first pre-order: the node, then each child's subtree left to right.
    pub fn preorder(&self, id: NodeId) -> GraphResult<Vec<NodeId>> {
        if !self.nodes.contains_key(id) {
            return Err(GraphError::StaleNode);
        }
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(self.branches(current).iter().rev().copied());
        }
        Ok(result)
    }

    /// Depth-first post-order: each child's subtree left to right, then the node.
    pub fn postorder(&self, id: NodeId) -> GraphResult<Vec<NodeId>> {
        if !self.nodes.contains_key(id) {
            return Err(GraphError::StaleNode);
        }
        // Node, then children right to left; reversed that is post-order.
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(self.branches(current).iter().copied());
        }
        result.reverse();
        Ok(result)
    }

    /// Level-order: every node at depth N before any node at depth N+1.
    pub fn breadth_first(&self, id: NodeId) -> GraphResult<Vec<NodeId>> {
        if !self.nodes.contains_key(id) {
            return Err(GraphError::StaleNode);
        }
        let mut result = Vec::new();
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            result.push(current);
            queue.extend(self.branches(current).iter().copied());
        }
        Ok(result)
    }

    /// Visit `id` and then its whole subtree in pre-order.
    pub fn apply<F>(&self, id: NodeId, mut visitor: F) -> GraphResult<()>
    where
        F: FnMut(NodeId, &T),
    {
        for node in self.preorder(id)? {
            if let Some(data) = self.nodes.get(node) {
                visitor(node, &data.value);
            }
        }
        Ok(())
    }

    /// Like [`apply`](Self::apply) but skips `id` itself.
    pub fn apply_branches<F>(&self, id: NodeId, mut visitor: F) -> GraphResult<()>
    where
        F: FnMut(NodeId, &T),
    {
        for node in self.preorder(id)?.into_iter().skip(1) {
            if let Some(data) = self.nodes.get(node) {
                visitor(node, &data.value);
            }
        }
        Ok(())
    }

    /// Pre-order traversal with mutable access to every payload.
    pub fn apply_mut<F>(&mut self, id: NodeId, mut visitor: F) -> GraphResult<()>
    where
        F: FnMut(NodeId, &mut T),
    {
        for node in self.preorder(id)? {
            if let Some(data) = self.nodes.get_mut(node) {
                visitor(node, &mut data.value);
            }
        }
        Ok(())
    }
}

impl<T> Default for Tree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Tree<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tree")
            .field("len", &self.nodes.len())
            .field("roots", &self.roots)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// root -> [a -> [a1, a2], b, c -> [c1]]
    fn sample() -> (Tree<&'static str>, Vec<NodeId>) {
        let mut tree = Tree::new();
        let root = tree.insert_root("root");
        let a = tree.push(root, "a").unwrap();
        let a1 = tree.push(a, "a1").unwrap();
        let a2 = tree.push(a, "a2").unwrap();
        let b = tree.push(root, "b").unwrap();
        let c = tree.push(root, "c").unwrap();
        let c1 = tree.push(c, "c1").unwrap();
        (tree, vec![root, a, a1, a2, b, c, c1])
    }

    fn names(tree: &Tree<&'static str>, ids: &[NodeId]) -> Vec<&'static str> {
        ids.iter().map(|&id| *tree.get(id).unwrap()).collect()
    }

    #[test]
    fn test_delete_middle_child_keeps_order() {
        let mut tree = Tree::new();
        let root = tree.insert_root(0);
        let first = tree.push(root, 1).unwrap();
        let middle = tree.push(root, 2).unwrap();
        let third = tree.push(root, 3).unwrap();
        assert_eq!(tree.branch_count(root), 3);

        assert!(tree.delete(root, middle));
        assert_eq!(tree.branch_count(root), 2);
        assert_eq!(tree.branches(root), &[first, third]);
        assert!(!tree.contains(middle));
    }

    #[test]
    fn test_guard_nulled_on_destroy() {
        let mut tree = Tree::new();
        let root = tree.insert_root("x");
        let slot = tree.guard(root).unwrap();
        assert_eq!(slot.get(), Some(root));

        assert!(tree.destroy(root));
        assert!(slot == None::<NodeId>);
        assert!(tree.is_empty());
        assert!(tree.roots().is_empty());
    }

    #[test]
    fn test_delete_nulls_descendant_guards() {
        let (mut tree, ids) = sample();
        let (root, a, a1) = (ids[0], ids[1], ids[2]);
        let on_a = tree.guard(a).unwrap();
        let on_a1 = tree.guard(a1).unwrap();
        let on_root = tree.guard(root).unwrap();

        assert!(tree.delete(root, a));
        assert!(on_a.is_null());
        assert!(on_a1.is_null());
        assert!(!on_root.is_null());
        assert!(!tree.contains(a1));
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn test_delete_non_child_is_noop() {
        let (mut tree, ids) = sample();
        let (root, a, c1) = (ids[0], ids[1], ids[6]);
        assert!(!tree.delete(a, c1));
        assert!(!tree.delete(root, c1));
        assert_eq!(tree.pop(a, c1), None);
        assert_eq!(tree.len(), 7);
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let (mut tree, ids) = sample();
        assert!(tree.destroy(ids[5]));
        assert!(!tree.destroy(ids[5]));
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn test_stale_id_not_resolved_after_slot_reuse() {
        let mut tree = Tree::new();
        let old = tree.insert_root(1);
        tree.destroy(old);
        let new = tree.insert_root(2);
        assert_ne!(old, new);
        assert_eq!(tree.get(old), None);
        assert_eq!(tree.get(new), Some(&2));
    }

    #[test]
    fn test_shape_queries() {
        let (tree, ids) = sample();
        let (root, a, a1, b) = (ids[0], ids[1], ids[2], ids[4]);

        assert!(tree.is_root(root));
        assert!(!tree.is_leaf(root));
        assert!(!tree.is_trunk(root));
        assert!(tree.is_trunk(a));
        assert!(tree.is_leaf(a1));
        assert!(tree.is_leaf(b));
        assert!(!tree.is_trunk(b));

        for &id in &ids {
            let expected = tree.stem(id).map_or(0, |p| tree.level(p).unwrap() + 1);
            assert_eq!(tree.level(id), Some(expected));
            assert_eq!(tree.is_leaf(id), tree.branch_count(id) == 0);
            assert_eq!(tree.is_root(id), tree.stem(id).is_none());
            assert_eq!(tree.is_trunk(id), !tree.is_root(id) && !tree.is_leaf(id));
        }
        assert_eq!(tree.level(a1), Some(2));
    }

    #[test]
    fn test_relationships() {
        let (tree, ids) = sample();
        let (root, a, a1, c) = (ids[0], ids[1], ids[2], ids[5]);

        assert!(tree.is_descendant_of(a1, root));
        assert!(tree.is_descendant_of(a1, a));
        assert!(!tree.is_descendant_of(a1, c));
        assert!(!tree.is_descendant_of(root, root));
        assert!(tree.is_child_of(a1, a));
        assert!(!tree.is_child_of(a1, root));
        assert_eq!(tree.root(a1), Some(root));
        assert_eq!(tree.front(root), Some(a));
        assert_eq!(tree.back(root), Some(c));
        assert_eq!(tree.ancestors(a1).unwrap(), vec![a, root]);
    }

    #[test]
    fn test_traversal_orders() {
        let (tree, ids) = sample();
        let root = ids[0];

        let pre = tree.preorder(root).unwrap();
        assert_eq!(names(&tree, &pre), ["root", "a", "a1", "a2", "b", "c", "c1"]);

        let post = tree.postorder(root).unwrap();
        assert_eq!(names(&tree, &post), ["a1", "a2", "a", "b", "c1", "c", "root"]);

        let bfs = tree.breadth_first(root).unwrap();
        assert_eq!(names(&tree, &bfs), ["root", "a", "b", "c", "a1", "a2", "c1"]);
    }

    #[test]
    fn test_apply_visits_preorder() {
        let (tree, ids) = sample();
        let mut seen = Vec::new();
        tree.apply(ids[0], |_, name| seen.push(*name)).unwrap();
        assert_eq!(seen, ["root", "a", "a1", "a2", "b", "c", "c1"]);

        let mut branches = Vec::new();
        tree.apply_branches(ids[1], |_, name| branches.push(*name))
            .unwrap();
        assert_eq!(branches, ["a1", "a2"]);
    }

    #[test]
    fn test_apply_mut() {
        let mut tree = Tree::new();
        let root = tree.insert_root(1);
        let child = tree.push(root, 2).unwrap();
        tree.apply_mut(root, |_, v| *v *= 10).unwrap();
        assert_eq!(tree.get(child), Some(&20));
        assert_eq!(tree.apply_mut(NodeId::default(), |_, _| {}), Err(GraphError::StaleNode));
    }

    #[test]
    fn test_pop_detaches_to_root() {
        let (mut tree, ids) = sample();
        let (root, c, c1) = (ids[0], ids[5], ids[6]);

        assert_eq!(tree.pop(root, c), Some(c));
        assert!(tree.is_root(c));
        assert_eq!(tree.roots(), &[root, c]);
        assert_eq!(tree.branches(c), &[c1]);
        assert_eq!(tree.branch_count(root), 2);
        assert_eq!(tree.level(c1), Some(1));
    }

    #[test]
    fn test_adopt_rejects_cycles() {
        let (mut tree, ids) = sample();
        let (root, a, a1, b) = (ids[0], ids[1], ids[2], ids[4]);

        assert_eq!(tree.adopt(a1, a), Err(GraphError::CircularParentage));
        assert_eq!(tree.adopt(a, a), Err(GraphError::CircularParentage));

        tree.adopt(b, a).unwrap();
        assert!(tree.is_child_of(a, b));
        assert_eq!(tree.level(a1), Some(3));
        assert_eq!(tree.branch_count(root), 2);
    }

    #[test]
    fn test_adopt_root_leaves_root_list() {
        let mut tree = Tree::new();
        let first = tree.insert_root("first");
        let second = tree.insert_root("second");
        tree.adopt(first, second).unwrap();
        assert_eq!(tree.roots(), &[first]);
        assert_eq!(tree.stem(second), Some(first));
    }

    #[test]
    fn test_raise_lower() {
        let (mut tree, ids) = sample();
        let (root, a, b, c) = (ids[0], ids[1], ids[4], ids[5]);

        assert!(tree.raise(a));
        assert_eq!(tree.branches(root), &[b, c, a]);
        assert!(tree.lower(c));
        assert_eq!(tree.branches(root), &[c, b, a]);
        assert_eq!(tree.sibling_index(b), Some(1));
        assert_eq!(tree.sibling_index(root), Some(0));
    }

    #[test]
    fn test_delete_front_back() {
        let (mut tree, ids) = sample();
        let (root, b) = (ids[0], ids[4]);
        assert!(tree.delete_front(root));
        assert!(tree.delete_back(root));
        assert_eq!(tree.branches(root), &[b]);
        assert!(tree.delete_back(root));
        assert!(!tree.delete_front(root));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_remove_leaf_refuses_parents() {
        let (mut tree, ids) = sample();
        assert_eq!(tree.remove_leaf(ids[1]), None);
        assert_eq!(tree.remove_leaf(ids[2]), Some("a1"));
        assert_eq!(tree.branches(ids[1]), &[ids[3]]);
    }

    #[test]
    fn test_stale_queries() {
        let mut tree = Tree::new();
        let gone = tree.insert_root(());
        tree.destroy(gone);

        assert!(!tree.is_leaf(gone));
        assert!(!tree.is_root(gone));
        assert_eq!(tree.level(gone), None);
        assert_eq!(tree.branch_count(gone), 0);
        assert_eq!(tree.push(gone, ()), Err(GraphError::StaleNode));
        assert!(tree.guard(gone).is_err());
        assert!(tree.preorder(gone).is_err());
        assert!(!tree.raise(gone));
    }

    #[test]
    fn test_guard_count_tracks_holders() {
        let mut tree = Tree::new();
        let id = tree.insert_root(());
        let slot = tree.guard(id).unwrap();
        let _other = tree.guard(id).unwrap();
        assert_eq!(tree.guard_count(id), 2);
        drop(slot);
        assert_eq!(tree.guard_count(id), 1);
    }

    #[test]
    fn test_deep_chain_traversal_and_destroy() {
        const DEPTH: usize = 100_000;
        let mut tree = Tree::new();
        let root = tree.insert_root(0);
        let mut tip = root;
        for depth in 1..=DEPTH {
            tip = tree.push(tip, depth).unwrap();
        }
        let slot = tree.guard(tip).unwrap();
        assert_eq!(tree.level(tip), Some(DEPTH));

        let post = tree.postorder(root).unwrap();
        assert_eq!(post.len(), DEPTH + 1);
        assert_eq!(post.first(), Some(&tip));
        assert_eq!(post.last(), Some(&root));

        assert!(tree.destroy(root));
        assert!(tree.is_empty());
        assert!(slot.is_null());
    }
}
