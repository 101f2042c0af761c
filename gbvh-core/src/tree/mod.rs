//! Arena-backed BVH tree.
//!
//! Nodes live in a single `Vec` and refer to each other by index, mirroring
//! the record array they are decoded from. Every node has at most one
//! parent, and the only ways to link nodes keep the structure acyclic:
//! children can only be attached to a *new* branch, and only while they are
//! detached.
//!
//! Traversals are iterative so tree depth never touches the call stack.

mod assemble;
mod flatten;
mod rebuild;

pub use assemble::{AssembledTree, assemble};
pub use flatten::flatten;
pub use rebuild::{Rebuild, VolumeInsertion};

use crate::bounds::Aabb;
use crate::error::{GbvhError, Result};

/// Index of a node within its tree's arena.
pub type NodeId = usize;

/// Which child slot of a branch an edge occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The `left` slot.
    Left,
    /// The `right` slot.
    Right,
}

/// One tree node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Bounding box of the node (for branches, of its whole subtree).
    pub bounds: Aabb,
    /// Leaf payload. A node is a leaf iff this is present.
    pub payload: Option<u32>,
    /// Owning branch, if attached.
    pub parent: Option<NodeId>,
    /// Left child.
    pub left: Option<NodeId>,
    /// Right child.
    pub right: Option<NodeId>,
}

impl Node {
    fn detached(bounds: Aabb, payload: Option<u32>) -> Self {
        Self { bounds, payload, parent: None, left: None, right: None }
    }

    /// Whether the node carries a payload.
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        self.payload.is_some()
    }

    /// Child in the given slot.
    #[must_use]
    pub const fn child(&self, side: Side) -> Option<NodeId> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }
}

/// A leaf's portable content: its box and its payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Leaf {
    /// Bounding box of the referenced object.
    pub bounds: Aabb,
    /// Object identifier.
    pub payload: u32,
}

/// Owned, rooted binary BVH.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tree {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl Tree {
    /// Create an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from an already-validated arena.
    pub(crate) fn from_parts(nodes: Vec<Node>, root: Option<NodeId>) -> Self {
        Self { nodes, root }
    }

    /// Number of nodes in the arena, including detached ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena holds no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Root node, if the tree has one.
    #[must_use]
    pub const fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Look up a node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Add a detached leaf.
    pub fn push_leaf(&mut self, bounds: Aabb, payload: u32) -> NodeId {
        self.nodes.push(Node::detached(bounds, Some(payload)));
        self.nodes.len() - 1
    }

    /// Add a branch owning the given detached children.
    ///
    /// # Errors
    ///
    /// Returns an error if a child does not exist, is already attached, is
    /// the root, or if both slots name the same node.
    pub fn push_branch(
        &mut self,
        bounds: Aabb,
        left: Option<NodeId>,
        right: Option<NodeId>,
    ) -> Result<NodeId> {
        let id = self.nodes.len();
        if left.is_some() && left == right {
            return Err(GbvhError::MalformedTree { record: id, reason: "both children are the same node" });
        }
        for child in [left, right].into_iter().flatten() {
            self.check_detached(child, id)?;
        }

        self.nodes.push(Node { bounds, payload: None, parent: None, left, right });
        for child in [left, right].into_iter().flatten() {
            if let Some(node) = self.nodes.get_mut(child) {
                node.parent = Some(id);
            }
        }
        Ok(id)
    }

    /// Make a detached node the root.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist or is attached to a parent.
    pub fn set_root(&mut self, id: NodeId) -> Result<()> {
        self.check_detached(id, id)?;
        self.root = Some(id);
        Ok(())
    }

    fn check_detached(&self, child: NodeId, record: usize) -> Result<()> {
        let node = self
            .nodes
            .get(child)
            .ok_or(GbvhError::MalformedTree { record, reason: "child does not exist" })?;
        if node.parent.is_some() || self.root == Some(child) {
            return Err(GbvhError::MalformedTree { record, reason: "child is already attached" });
        }
        Ok(())
    }

    /// Insert a new branch above `at`, owning `at` (left) and the detached
    /// `leaf` (right). The branch takes `at`'s place under its parent, or
    /// becomes the root.
    pub(crate) fn split(&mut self, at: NodeId, leaf: NodeId, bounds: Aabb) -> NodeId {
        let id = self.nodes.len();
        let parent = self.nodes.get(at).and_then(|node| node.parent);

        self.nodes.push(Node { bounds, payload: None, parent, left: Some(at), right: Some(leaf) });

        if let Some(node) = parent.and_then(|p| self.nodes.get_mut(p)) {
            if node.left == Some(at) {
                node.left = Some(id);
            } else {
                node.right = Some(id);
            }
        }
        for child in [at, leaf] {
            if let Some(node) = self.nodes.get_mut(child) {
                node.parent = Some(id);
            }
        }
        if self.root == Some(at) {
            self.root = Some(id);
        }
        id
    }

    /// Node ids reachable from the root, in pre-order (left before right).
    #[must_use]
    pub fn walk(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();

        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else { continue };
            order.push(id);
            stack.extend(node.right);
            stack.extend(node.left);
        }
        order
    }

    /// Leaves reachable from the root, in pre-order.
    #[must_use]
    pub fn leaves(&self) -> Vec<Leaf> {
        self.walk()
            .into_iter()
            .filter_map(|id| self.nodes.get(id))
            .filter_map(|node| node.payload.map(|payload| Leaf { bounds: node.bounds, payload }))
            .collect()
    }

    /// Number of edges on the longest root-to-node path, or `None` for an empty tree.
    #[must_use]
    pub fn depth(&self) -> Option<usize> {
        let mut deepest = None;
        let mut stack: Vec<(NodeId, usize)> = self.root.map(|r| (r, 0)).into_iter().collect();

        while let Some((id, depth)) = stack.pop() {
            let Some(node) = self.nodes.get(id) else { continue };
            deepest = deepest.max(Some(depth));
            stack.extend(node.left.map(|c| (c, depth + 1)));
            stack.extend(node.right.map(|c| (c, depth + 1)));
        }
        deepest
    }
}
