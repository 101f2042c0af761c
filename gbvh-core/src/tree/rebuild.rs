//! Leaf list → fresh tree.
//!
//! The container stores topology, but the editable form does not. Packing
//! regenerates a tree by inserting leaves one at a time; any strategy that
//! produces a valid tree is acceptable, so the strategy sits behind a trait.

use super::{Leaf, NodeId, Tree};
use crate::error::{GbvhError, Result};

/// Strategy for building a tree from a leaf list.
pub trait Rebuild {
    /// Build a tree containing exactly the given leaves.
    ///
    /// # Errors
    ///
    /// Returns an error if the strategy cannot link the leaves into a tree.
    fn rebuild(&self, leaves: &[Leaf]) -> Result<Tree>;
}

/// Incremental insertion in list order, choosing at each branch whichever of
/// "split here", "descend left" or "descend right" yields the least total
/// box volume.
#[derive(Debug, Clone, Copy, Default)]
pub struct VolumeInsertion;

impl VolumeInsertion {
    /// Insert one leaf into `tree`.
    ///
    /// # Errors
    ///
    /// Returns an error if the tree's root link is broken.
    pub fn insert(tree: &mut Tree, leaf: Leaf) -> Result<()> {
        let new = tree.push_leaf(leaf.bounds, leaf.payload);

        let Some(mut current) = tree.root() else {
            return tree.set_root(new);
        };

        loop {
            let node = tree.node(current).ok_or(GbvhError::MalformedTree {
                record: current,
                reason: "descent reached a node that does not exist",
            })?;
            let merged = node.bounds.merged(&leaf.bounds);

            let next = match (node.is_leaf(), node.left, node.right) {
                (false, Some(left), Some(right)) => {
                    Self::choose_descent(tree, merged.volume(), left, right, &leaf)
                }
                _ => None,
            };

            match next {
                Some(child) => {
                    if let Some(node) = tree.node_mut(current) {
                        node.bounds = merged;
                    }
                    current = child;
                }
                None => {
                    tree.split(current, new, merged);
                    return Ok(());
                }
            }
        }
    }

    /// `None` means split at the current branch.
    fn choose_descent(
        tree: &Tree,
        branch_cost: f32,
        left: NodeId,
        right: NodeId,
        leaf: &Leaf,
    ) -> Option<NodeId> {
        let left_bounds = tree.node(left)?.bounds;
        let right_bounds = tree.node(right)?.bounds;

        let left_cost = left_bounds.merged(&leaf.bounds).volume() + right_bounds.volume();
        let right_cost = left_bounds.volume() + right_bounds.merged(&leaf.bounds).volume();

        if branch_cost < left_cost && branch_cost < right_cost {
            None
        } else if left_cost <= right_cost {
            Some(left)
        } else {
            Some(right)
        }
    }
}

impl Rebuild for VolumeInsertion {
    fn rebuild(&self, leaves: &[Leaf]) -> Result<Tree> {
        let mut tree = Tree::new();
        for leaf in leaves {
            Self::insert(&mut tree, *leaf)?;
        }
        tracing::debug!(leaves = leaves.len(), nodes = tree.len(), "rebuilt tree");
        Ok(tree)
    }
}
