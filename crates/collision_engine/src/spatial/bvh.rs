//! Dynamic bounding-volume hierarchy
//!
//! A binary tree of [`AabbShape`] nodes stored in a growable arena. Free
//! nodes form a singly linked list threaded through the same field that
//! holds the parent link of an allocated node, and carry a height of `-1`.
//!
//! Leaves are placed with a surface-area style cost heuristic and every
//! ancestor is rebalanced on the way back up, so sibling heights never
//! differ by more than one. Node indices are private to this module: the
//! public API speaks entity ids, and an index is never handed out where it
//! could outlive the node it names.

use crate::foundation::math::Vec2;
use crate::spatial::aabb::AabbShape;
use crate::world::{Entity, EntityId, World};
use std::collections::BTreeMap;

const FREE_HEIGHT: i32 = -1;

#[derive(Debug, Clone)]
struct TreeNode {
    shape: AabbShape,
    entity: Option<EntityId>,
    child1: Option<usize>,
    child2: Option<usize>,
    /// Parent while allocated, next free node while on the free list
    parent_or_next: Option<usize>,
    height: i32,
}

impl TreeNode {
    fn free(next: Option<usize>) -> Self {
        Self {
            shape: AabbShape::from_circle(Vec2::zeros(), 0.0),
            entity: None,
            child1: None,
            child2: None,
            parent_or_next: next,
            height: FREE_HEIGHT,
        }
    }

    fn is_leaf(&self) -> bool {
        self.child1.is_none()
    }
}

/// Read-only view of a tree node, for debug drawing and inspection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeView {
    /// Node bounds
    pub shape: AabbShape,
    /// 0 for leaves
    pub height: i32,
    /// Distance from the root
    pub depth: usize,
    /// Entity stored in a leaf
    pub entity: Option<EntityId>,
}

/// Structural defects reported by [`DynamicBvh::validate`]
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BvhInvariantError {
    /// Internal node without two children
    #[error("internal node {0} is missing a child")]
    MissingChild(usize),
    /// Child does not point back at its parent, or the root has a parent
    #[error("node {0} has a broken parent link")]
    BrokenParentLink(usize),
    /// Internal shape is not the union of its children
    #[error("node {0} shape is not the union of its children")]
    ShapeMismatch(usize),
    /// Height is not `1 + max(child heights)` (or not 0 on a leaf)
    #[error("node {0} has a stale height")]
    HeightMismatch(usize),
    /// Children differ in height by more than one
    #[error("node {node} is unbalanced ({left} vs {right})")]
    Unbalanced {
        /// Offending node
        node: usize,
        /// Height of child1
        left: i32,
        /// Height of child2
        right: i32,
    },
    /// A node on the free list is reachable from the root
    #[error("free node {0} is reachable from the root")]
    FreeNodeReachable(usize),
    /// Leaf without an entity, or entity map pointing elsewhere
    #[error("leaf {0} does not match the entity map")]
    LeafMismatch(usize),
    /// Live node count disagrees with the nodes reachable from the root
    #[error("expected {expected} live nodes, found {found}")]
    NodeCountMismatch {
        /// Bookkept count
        expected: usize,
        /// Reachable count
        found: usize,
    },
    /// Free list length disagrees with capacity minus live nodes
    #[error("free list holds {found} nodes, expected {expected}")]
    FreeListMismatch {
        /// Capacity minus live nodes
        expected: usize,
        /// Walked free list length
        found: usize,
    },
}

/// Dynamic AABB tree broad phase
#[derive(Debug, Clone)]
pub struct DynamicBvh {
    nodes: Vec<TreeNode>,
    root: Option<usize>,
    free_list: Option<usize>,
    node_count: usize,
    leaves: BTreeMap<EntityId, usize>,
}

impl Default for DynamicBvh {
    fn default() -> Self {
        Self::new(16)
    }
}

impl DynamicBvh {
    /// Create an empty tree with room for `initial_capacity` nodes
    pub fn new(initial_capacity: usize) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            root: None,
            free_list: None,
            node_count: 0,
            leaves: BTreeMap::new(),
        };
        tree.grow_to(initial_capacity.max(1));
        tree
    }

    /// Live (allocated) nodes, leaves and internal nodes together
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Number of entities stored as leaves
    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// Size of the node pool
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree holds no leaves
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Height of the root, 0 when empty
    pub fn height(&self) -> i32 {
        self.root.map_or(0, |root| self.nodes[root].height)
    }

    /// Bounds of the whole tree
    pub fn root_shape(&self) -> Option<AabbShape> {
        self.root.map(|root| self.nodes[root].shape)
    }

    /// Does the tree hold a leaf for `id`?
    pub fn contains(&self, id: EntityId) -> bool {
        self.leaves.contains_key(&id)
    }

    fn grow_to(&mut self, capacity: usize) {
        let old = self.nodes.len();
        if capacity <= old {
            return;
        }
        // Thread the new nodes onto the front of the free list
        for index in old..capacity {
            let next = if index + 1 < capacity { Some(index + 1) } else { self.free_list };
            self.nodes.push(TreeNode::free(next));
        }
        self.free_list = Some(old);
    }

    fn allocate_node(&mut self) -> usize {
        let index = match self.free_list {
            Some(index) => index,
            None => {
                // Growth links the new nodes starting at the old length
                let old = self.nodes.len();
                let capacity = (old * 2).max(1);
                log::debug!("BVH node pool exhausted, growing {old} -> {capacity}");
                self.grow_to(capacity);
                old
            }
        };
        let node = &mut self.nodes[index];
        debug_assert_eq!(node.height, FREE_HEIGHT, "allocating a live node");
        self.free_list = node.parent_or_next;
        node.parent_or_next = None;
        node.child1 = None;
        node.child2 = None;
        node.entity = None;
        node.height = 0;
        self.node_count += 1;
        index
    }

    fn free_node(&mut self, index: usize) {
        debug_assert_ne!(self.nodes[index].height, FREE_HEIGHT, "double free of node {index}");
        self.nodes[index] = TreeNode::free(self.free_list);
        self.free_list = Some(index);
        self.node_count -= 1;
    }

    /// Insert a leaf for `entity`
    ///
    /// An entity that already has a leaf is moved instead of duplicated.
    pub fn insert(&mut self, entity: &Entity) {
        let id = entity.id();
        if self.leaves.contains_key(&id) {
            self.remove(id);
        }
        let leaf = self.allocate_node();
        self.nodes[leaf].shape = AabbShape::from_entity(entity);
        self.nodes[leaf].entity = Some(id);
        self.insert_leaf(leaf);
        self.leaves.insert(id, leaf);
    }

    /// Remove the leaf for `id`; returns `false` if there was none
    pub fn remove(&mut self, id: EntityId) -> bool {
        let Some(leaf) = self.leaves.remove(&id) else {
            return false;
        };
        self.remove_leaf(leaf);
        self.free_node(leaf);
        true
    }

    /// Re-index every leaf for the current tick
    ///
    /// Leaves whose entity is gone or scheduled for destruction are removed;
    /// leaves whose bounds changed are unlinked and reinserted.
    pub fn update(&mut self, world: &World) {
        let tracked: Vec<(EntityId, usize)> = self.leaves.iter().map(|(&id, &leaf)| (id, leaf)).collect();
        let mut moved = 0usize;
        let mut dropped = 0usize;
        for (id, leaf) in tracked {
            match world.get(id) {
                Some(entity) if !entity.is_destroy_scheduled() => {
                    if self.move_leaf(leaf, AabbShape::from_entity(entity)) {
                        moved += 1;
                    }
                }
                _ => {
                    self.remove(id);
                    dropped += 1;
                }
            }
        }
        if moved > 0 || dropped > 0 {
            log::trace!("BVH update: {moved} moved, {dropped} dropped, height {}", self.height());
        }
    }

    /// Move the leaf of one tracked entity to its current bounds
    ///
    /// Returns `false` if the entity is not tracked or its bounds are
    /// unchanged.
    pub fn refresh(&mut self, entity: &Entity) -> bool {
        let Some(&leaf) = self.leaves.get(&entity.id()) else {
            return false;
        };
        self.move_leaf(leaf, AabbShape::from_entity(entity))
    }

    fn move_leaf(&mut self, leaf: usize, shape: AabbShape) -> bool {
        if shape == self.nodes[leaf].shape {
            return false;
        }
        self.remove_leaf(leaf);
        self.nodes[leaf].shape = shape;
        self.insert_leaf(leaf);
        true
    }

    /// Every entity whose leaf box intersects `shape`
    pub fn query(&self, shape: &AabbShape) -> Vec<EntityId> {
        let mut result = Vec::new();
        let Some(root) = self.root else {
            return result;
        };
        let mut stack = vec![root];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if !node.shape.intersects(shape) {
                continue;
            }
            if node.is_leaf() {
                result.extend(node.entity);
            } else {
                stack.extend(node.child1);
                stack.extend(node.child2);
            }
        }
        result
    }

    /// Candidates overlapping an entity's own bounds (includes the entity itself)
    pub fn query_entity(&self, entity: &Entity) -> Vec<EntityId> {
        self.query(&AabbShape::from_entity(entity))
    }

    /// Return every node to the free list
    pub fn clear(&mut self) {
        let capacity = self.nodes.len();
        for (index, node) in self.nodes.iter_mut().enumerate() {
            let next = if index + 1 < capacity { Some(index + 1) } else { None };
            *node = TreeNode::free(next);
        }
        self.free_list = if capacity > 0 { Some(0) } else { None };
        self.root = None;
        self.node_count = 0;
        self.leaves.clear();
    }

    /// Depth-first snapshot of the live nodes
    pub fn nodes(&self) -> Vec<NodeView> {
        let mut views = Vec::with_capacity(self.node_count);
        let mut stack: Vec<(usize, usize)> = self.root.map(|root| (root, 0)).into_iter().collect();
        while let Some((index, depth)) = stack.pop() {
            let node = &self.nodes[index];
            views.push(NodeView {
                shape: node.shape,
                height: node.height,
                depth,
                entity: node.entity,
            });
            for child in [node.child2, node.child1].into_iter().flatten() {
                stack.push((child, depth + 1));
            }
        }
        views
    }

    fn insert_leaf(&mut self, leaf: usize) {
        let Some(root) = self.root else {
            self.root = Some(leaf);
            self.nodes[leaf].parent_or_next = None;
            return;
        };

        // Find the best sibling
        let leaf_shape = self.nodes[leaf].shape;
        let mut index = root;
        while let (Some(child1), Some(child2)) = (self.nodes[index].child1, self.nodes[index].child2) {
            let area = self.nodes[index].shape.area();
            let combined_area = self.nodes[index].shape.union(&leaf_shape).area();

            // Cost of a new parent for this node and the leaf
            let cost = 2.0 * combined_area;
            // Minimum cost pushed down to the children
            let inheritance_cost = 2.0 * (combined_area - area);

            let cost1 = self.descend_cost(child1, &leaf_shape) + inheritance_cost;
            let cost2 = self.descend_cost(child2, &leaf_shape) + inheritance_cost;

            if cost < cost1 && cost < cost2 {
                break;
            }
            index = if cost1 < cost2 { child1 } else { child2 };
        }
        let sibling = index;

        // Splice a new parent above the sibling
        let old_parent = self.nodes[sibling].parent_or_next;
        let new_parent = self.allocate_node();
        let sibling_shape = self.nodes[sibling].shape;
        let sibling_height = self.nodes[sibling].height;
        {
            let node = &mut self.nodes[new_parent];
            node.parent_or_next = old_parent;
            node.shape = leaf_shape.union(&sibling_shape);
            node.height = sibling_height + 1;
            node.child1 = Some(sibling);
            node.child2 = Some(leaf);
        }
        match old_parent {
            Some(parent) => self.replace_child(parent, sibling, new_parent),
            None => self.root = Some(new_parent),
        }
        self.nodes[sibling].parent_or_next = Some(new_parent);
        self.nodes[leaf].parent_or_next = Some(new_parent);

        self.fix_upwards(Some(new_parent));
    }

    fn descend_cost(&self, child: usize, leaf_shape: &AabbShape) -> f32 {
        let node = &self.nodes[child];
        let combined_area = leaf_shape.union(&node.shape).area();
        if node.is_leaf() {
            combined_area
        } else {
            combined_area - node.shape.area()
        }
    }

    fn remove_leaf(&mut self, leaf: usize) {
        if self.root == Some(leaf) {
            self.root = None;
            return;
        }
        let parent = self.nodes[leaf].parent_or_next;
        debug_assert!(parent.is_some(), "non-root leaf {leaf} without parent");
        let Some(parent) = parent else {
            return;
        };
        let grand_parent = self.nodes[parent].parent_or_next;
        let sibling = if self.nodes[parent].child1 == Some(leaf) {
            self.nodes[parent].child2
        } else {
            self.nodes[parent].child1
        };
        debug_assert!(sibling.is_some(), "parent {parent} of leaf {leaf} has one child");
        let Some(sibling) = sibling else {
            return;
        };

        match grand_parent {
            Some(grand_parent) => {
                self.replace_child(grand_parent, parent, sibling);
                self.nodes[sibling].parent_or_next = Some(grand_parent);
                self.free_node(parent);
                self.fix_upwards(Some(grand_parent));
            }
            None => {
                self.root = Some(sibling);
                self.nodes[sibling].parent_or_next = None;
                self.free_node(parent);
            }
        }
        self.nodes[leaf].parent_or_next = None;
    }

    /// Rebalance and refit from `start` to the root
    fn fix_upwards(&mut self, start: Option<usize>) {
        let mut index = start;
        while let Some(current) = index {
            let current = self.balance(current);
            self.refit(current);
            index = self.nodes[current].parent_or_next;
        }
    }

    fn replace_child(&mut self, parent: usize, old: usize, new: usize) {
        let node = &mut self.nodes[parent];
        if node.child1 == Some(old) {
            node.child1 = Some(new);
        } else {
            debug_assert_eq!(node.child2, Some(old), "node {old} is not a child of {parent}");
            node.child2 = Some(new);
        }
    }

    fn refit(&mut self, index: usize) {
        let node = &self.nodes[index];
        let (Some(child1), Some(child2)) = (node.child1, node.child2) else {
            debug_assert!(node.is_leaf(), "internal node {index} is missing a child");
            return;
        };
        let shape = self.nodes[child1].shape.union(&self.nodes[child2].shape);
        let height = 1 + self.nodes[child1].height.max(self.nodes[child2].height);
        let node = &mut self.nodes[index];
        node.shape = shape;
        node.height = height;
    }

    /// Rotate the taller child up if the children differ in height by more
    /// than one. Returns the index now at this position in the tree.
    fn balance(&mut self, index: usize) -> usize {
        let node = &self.nodes[index];
        if node.is_leaf() {
            return index;
        }
        debug_assert!(node.child2.is_some(), "internal node {index} is missing a child");
        let (Some(child1), Some(child2)) = (node.child1, node.child2) else {
            return index;
        };
        let difference = self.nodes[child2].height - self.nodes[child1].height;
        if difference > 1 {
            self.rotate_up(index, child2)
        } else if difference < -1 {
            self.rotate_up(index, child1)
        } else {
            index
        }
    }

    /// Promote `child` into the place of `index`.
    ///
    /// The promoted node keeps its taller grandchild; the shorter one takes
    /// the promoted node's old slot under `index`. The demoted node is then
    /// balanced in turn, since a large height gap can survive one rotation.
    fn rotate_up(&mut self, index: usize, child: usize) -> usize {
        debug_assert!(!self.nodes[child].is_leaf(), "rotating leaf {child} above {index}");
        let (Some(grand1), Some(grand2)) = (self.nodes[child].child1, self.nodes[child].child2) else {
            return index;
        };

        let parent = self.nodes[index].parent_or_next;
        self.nodes[child].parent_or_next = parent;
        match parent {
            Some(parent) => self.replace_child(parent, index, child),
            None => self.root = Some(child),
        }
        self.nodes[index].parent_or_next = Some(child);

        let (taller, shorter) = if self.nodes[grand1].height > self.nodes[grand2].height {
            (grand1, grand2)
        } else {
            (grand2, grand1)
        };
        self.nodes[child].child1 = Some(index);
        self.nodes[child].child2 = Some(taller);
        self.replace_child(index, child, shorter);
        self.nodes[shorter].parent_or_next = Some(index);

        self.refit(index);
        let demoted = self.balance(index);
        self.refit(demoted);
        self.refit(child);
        child
    }

    /// Check every structural invariant of the tree
    pub fn validate(&self) -> Result<(), BvhInvariantError> {
        let mut reachable = 0usize;
        if let Some(root) = self.root {
            if self.nodes[root].parent_or_next.is_some() {
                return Err(BvhInvariantError::BrokenParentLink(root));
            }
            let mut stack = vec![root];
            while let Some(index) = stack.pop() {
                reachable += 1;
                let node = &self.nodes[index];
                if node.height == FREE_HEIGHT {
                    return Err(BvhInvariantError::FreeNodeReachable(index));
                }
                if node.is_leaf() {
                    if node.child2.is_some() {
                        return Err(BvhInvariantError::MissingChild(index));
                    }
                    if node.height != 0 {
                        return Err(BvhInvariantError::HeightMismatch(index));
                    }
                    let mapped = node.entity.and_then(|id| self.leaves.get(&id)).copied();
                    if mapped != Some(index) {
                        return Err(BvhInvariantError::LeafMismatch(index));
                    }
                    continue;
                }

                let (Some(child1), Some(child2)) = (node.child1, node.child2) else {
                    return Err(BvhInvariantError::MissingChild(index));
                };
                for child in [child1, child2] {
                    if self.nodes[child].parent_or_next != Some(index) {
                        return Err(BvhInvariantError::BrokenParentLink(child));
                    }
                }
                let (left, right) = (self.nodes[child1].height, self.nodes[child2].height);
                if node.shape != self.nodes[child1].shape.union(&self.nodes[child2].shape) {
                    return Err(BvhInvariantError::ShapeMismatch(index));
                }
                if node.height != 1 + left.max(right) {
                    return Err(BvhInvariantError::HeightMismatch(index));
                }
                if (left - right).abs() > 1 {
                    return Err(BvhInvariantError::Unbalanced { node: index, left, right });
                }
                stack.push(child1);
                stack.push(child2);
            }
        }

        if reachable != self.node_count {
            return Err(BvhInvariantError::NodeCountMismatch {
                expected: self.node_count,
                found: reachable,
            });
        }
        let leaf_nodes = if reachable == 0 { 0 } else { reachable.div_ceil(2) };
        if leaf_nodes != self.leaves.len() {
            return Err(BvhInvariantError::NodeCountMismatch {
                expected: (self.leaves.len() * 2).saturating_sub(1),
                found: reachable,
            });
        }

        let mut free = 0usize;
        let mut cursor = self.free_list;
        while let Some(index) = cursor {
            free += 1;
            if free > self.nodes.len() {
                break;
            }
            cursor = self.nodes[index].parent_or_next;
        }
        let expected = self.nodes.len() - self.node_count;
        if free != expected {
            return Err(BvhInvariantError::FreeListMismatch { expected, found: free });
        }
        Ok(())
    }
}
