//! Tree → record array.
//!
//! Positions are assigned from an explicit worklist seeded with the root.
//! A node gets the next free index when it is popped, and the parent's
//! child slot is back-filled at that moment. Children are pushed left then
//! right, so the right subtree is laid out before the left one. Callers can
//! rely on the root being record 0 and on every reachable node appearing
//! exactly once; sibling order is not part of the contract.

use super::{NodeId, Side, Tree};
use crate::error::{GbvhError, Result};
use crate::record::{NodeDescriptor, RecordIndex};

/// Lay out the nodes reachable from the root as records.
///
/// An empty tree yields no records.
///
/// # Errors
///
/// Returns an error if the tree has more nodes than a record index can name.
pub fn flatten(tree: &Tree) -> Result<Vec<NodeDescriptor>> {
    let mut records: Vec<NodeDescriptor> = Vec::with_capacity(tree.len());
    let mut stack: Vec<(NodeId, Option<(RecordIndex, Side)>)> =
        tree.root().map(|root| (root, None)).into_iter().collect();

    while let Some((id, edge)) = stack.pop() {
        let Some(node) = tree.node(id) else { continue };

        let index = RecordIndex::try_from(records.len()).map_err(|_| GbvhError::MalformedTree {
            record: records.len(),
            reason: "tree has more nodes than the record format can address",
        })?;

        records.push(NodeDescriptor {
            bounds: node.bounds,
            parent: edge.map(|(parent, _)| parent),
            left: None,
            right: None,
            payload: node.payload,
        });

        if let Some((parent, side)) = edge {
            if let Some(slot) = records.get_mut(parent as usize) {
                match side {
                    Side::Left => slot.left = Some(index),
                    Side::Right => slot.right = Some(index),
                }
            }
        }

        for side in [Side::Left, Side::Right] {
            if let Some(child) = node.child(side) {
                stack.push((child, Some((index, side))));
            }
        }
    }

    debug_assert!(records.len() <= tree.len());
    tracing::trace!(records = records.len(), "flattened tree");
    Ok(records)
}
