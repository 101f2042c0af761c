//! Record array → tree.
//!
//! Resolution runs in two passes. The first checks every pointer against
//! the record count (forward references are legal, so nothing can be linked
//! yet). The second walks from record 0 with an explicit stack and turns
//! child indices into ownership links, rejecting any edge that would give a
//! node a second parent.

use super::{Leaf, Node, NodeId, Tree};
use crate::error::{GbvhError, Result};
use crate::record::{NodeDescriptor, RecordIndex, decode_records};

/// A decoded map tree together with its leaves.
#[derive(Debug, Clone, Default)]
pub struct AssembledTree {
    /// The tree; node ids equal record indices.
    pub tree: Tree,
    /// Every record carrying a payload, in array order.
    pub leaves: Vec<Leaf>,
}

impl AssembledTree {
    /// Decode a raw record array and assemble it.
    ///
    /// # Errors
    ///
    /// Returns an error if any record fails to decode or the pointer graph
    /// is not a tree rooted at record 0.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        assemble(&decode_records(bytes)?)
    }
}

/// Build a tree from decoded records. Record 0 is the root.
///
/// The root can never be a child, so a child pointer of 0 is read as "no
/// child" (older writers used it that way) and logged at `warn`.
///
/// # Errors
///
/// Returns an error if:
/// - a pointer names a record at or past `records.len()`
/// - a child pointer reaches a non-root node that is already in the tree (a
///   shared child, or a cycle)
pub fn assemble(records: &[NodeDescriptor]) -> Result<AssembledTree> {
    let count = records.len();

    for (record, desc) in records.iter().enumerate() {
        for index in [desc.parent, desc.left, desc.right].into_iter().flatten() {
            check_index(index, record, count)?;
        }
    }

    let mut nodes: Vec<Node> = records
        .iter()
        .map(|desc| Node {
            bounds: desc.bounds,
            payload: desc.payload,
            parent: None,
            left: None,
            right: None,
        })
        .collect();

    let leaves: Vec<Leaf> = records
        .iter()
        .filter_map(|desc| desc.payload.map(|payload| Leaf { bounds: desc.bounds, payload }))
        .collect();

    if count == 0 {
        return Ok(AssembledTree { tree: Tree::new(), leaves });
    }

    if let Some(parent) = records.first().and_then(|root| root.parent) {
        tracing::trace!(parent, "root record has a parent pointer; ignoring");
    }

    let mut attached = vec![false; count];
    let mut stack: Vec<NodeId> = vec![0];
    if let Some(root) = attached.first_mut() {
        *root = true;
    }

    while let Some(id) = stack.pop() {
        let Some(desc) = records.get(id) else { continue };

        for (slot, child) in [(0, desc.left), (1, desc.right)] {
            let Some(child) = child else { continue };
            if child == 0 {
                tracing::warn!(record = id, "child pointer to record 0; treating as no child");
                continue;
            }
            let child = child as NodeId;

            let seen = attached.get_mut(child).ok_or(GbvhError::IndexOutOfRange {
                record: id,
                index: child as u64,
                count,
            })?;
            if *seen {
                return Err(GbvhError::MalformedTree {
                    record: id,
                    reason: "child pointer reaches a node that is already in the tree",
                });
            }
            *seen = true;

            if let Some(node) = nodes.get_mut(id) {
                if slot == 0 {
                    node.left = Some(child);
                } else {
                    node.right = Some(child);
                }
            }
            if let Some(node) = nodes.get_mut(child) {
                node.parent = Some(id);
            }
            if records.get(child).and_then(|c| c.parent) != Some(id as RecordIndex) {
                tracing::trace!(record = child, owner = id, "stored parent pointer disagrees with owner");
            }

            stack.push(child);
        }
    }

    let unreachable = attached.iter().filter(|&&a| !a).count();
    if unreachable > 0 {
        tracing::debug!(unreachable, "records not reachable from the root");
    }

    Ok(AssembledTree { tree: Tree::from_parts(nodes, Some(0)), leaves })
}

fn check_index(index: RecordIndex, record: usize, count: usize) -> Result<()> {
    if (index as usize) < count {
        Ok(())
    } else {
        Err(GbvhError::IndexOutOfRange { record, index: u64::from(index), count })
    }
}
