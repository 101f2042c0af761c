//! gbvh - BVH container codec
//!
//! Levels keep a per-map bounding-volume hierarchy in a `.bvh` container: a
//! sequence of `GBVH` entries, each a flat array of 64-byte node records
//! linked by byte-offset pointers. This crate turns that container into
//! owned trees and hand-editable leaf lists, and packs edited leaf lists
//! back into a container.
//!
//! # Features
//!
//! - Bounds-checked pointer decoding (no unsafe aliasing, no recursion)
//! - Arena trees that cannot be linked into cycles
//! - Deterministic output: entries sorted by map, root always record 0
//! - Pluggable tree rebuilding through the [`Rebuild`] trait
//!
//! # Example
//!
//! ```no_run
//! use gbvh_core::{PortableOptions, VolumeInsertion};
//!
//! # fn main() -> gbvh_core::Result<()> {
//! // Container -> one JSON unit per map
//! gbvh_core::extract("field.bvh", "field_units", &PortableOptions::default())?;
//!
//! // ...edit the units...
//!
//! // Units -> container
//! gbvh_core::pack("field_units", "field_new.bvh", &VolumeInsertion)?;
//! # Ok(())
//! # }
//! ```

pub mod bounds;
pub mod container;
pub mod error;
pub mod ext;
pub mod header;
pub mod lvb;
pub mod portable;
pub mod record;
pub mod storage;
pub mod tree;

pub use bounds::Aabb;
pub use container::{decode_all, encode_all};
pub use error::{GbvhError, Result};
pub use ext::{Game, Registry};
pub use header::{EntryHeader, HEADER_SIZE, MAGIC, VERSION};
pub use lvb::Lvb;
pub use portable::{PortableLeaf, PortableOptions};
pub use record::{NULL_OFFSET, NodeDescriptor, RECORD_SIZE, RecordIndex};
pub use storage::{ContainerFile, write_locked};
pub use tree::{AssembledTree, Leaf, Node, NodeId, Rebuild, Tree, VolumeInsertion};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Shape of one decoded map tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapSummary {
    /// Map identifier
    pub map_id: u16,
    /// Records in the entry
    pub records: usize,
    /// Records carrying a payload
    pub leaves: usize,
    /// Longest root-to-node path, in edges
    pub depth: Option<usize>,
}

/// Summarize every map of a decoded container
#[must_use]
pub fn summarize(maps: &BTreeMap<u16, AssembledTree>) -> Vec<MapSummary> {
    maps.iter()
        .map(|(&map_id, assembled)| MapSummary {
            map_id,
            records: assembled.tree.len(),
            leaves: assembled.leaves.len(),
            depth: assembled.tree.depth(),
        })
        .collect()
}

/// Extract a container into one leaf unit per map
///
/// # Arguments
///
/// * `input` - Path to the container file
/// * `out_dir` - Directory for the units (created if missing)
/// * `options` - Unit formatting options
///
/// # Returns
///
/// Returns the map identifiers and unit paths written, in map order
///
/// # Errors
///
/// Returns an error if:
/// - The container cannot be read or is malformed (nothing is written)
/// - A leaf has non-finite bounds (nothing is written)
/// - The output directory or a unit cannot be written
pub fn extract<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    out_dir: Q,
    options: &PortableOptions,
) -> Result<Vec<(u16, PathBuf)>> {
    let out_dir = out_dir.as_ref();

    // Decode and serialize everything before touching the output directory
    let maps = ContainerFile::open(input)?.decode()?;
    let units = maps
        .iter()
        .map(|(&map_id, assembled)| -> Result<(u16, String)> {
            Ok((map_id, portable::to_json(map_id, &assembled.leaves, options)?))
        })
        .collect::<Result<Vec<_>>>()?;

    std::fs::create_dir_all(out_dir).map_err(|e| GbvhError::io(out_dir, e))?;

    let mut written = Vec::with_capacity(units.len());
    for (map_id, text) in units {
        let path = out_dir.join(portable::unit_file_name(map_id));
        write_locked(&path, text.as_bytes())?;
        tracing::info!(map_id, leaves = maps.get(&map_id).map_or(0, |m| m.leaves.len()), "extracted map");
        written.push((map_id, path));
    }

    Ok(written)
}

/// Rebuild trees from a directory of leaf units and write a container
///
/// # Arguments
///
/// * `input_dir` - Directory of `<mapId>.json` units
/// * `output` - Container file to write
/// * `rebuilder` - Strategy for regenerating each map's tree
///
/// # Returns
///
/// Returns the number of bytes written
///
/// # Errors
///
/// Returns an error if:
/// - A unit is malformed (the error names its map)
/// - A tree cannot be rebuilt or encoded
/// - The output cannot be written
pub fn pack<P: AsRef<Path>, Q: AsRef<Path>>(
    input_dir: P,
    output: Q,
    rebuilder: &impl Rebuild,
) -> Result<usize> {
    let units = portable::read_unit_dir(input_dir.as_ref())?;

    let mut trees = BTreeMap::new();
    for (map_id, leaves) in units {
        let tree = rebuilder.rebuild(&leaves).map_err(|e| e.in_map(map_id))?;
        tracing::info!(map_id, leaves = leaves.len(), nodes = tree.len(), "rebuilt map");
        trees.insert(map_id, tree);
    }

    let data = encode_all(trees.iter().map(|(map_id, tree)| (*map_id, tree)))?;
    write_locked(output, &data)?;

    Ok(data.len())
}
