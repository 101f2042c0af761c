//! Whole-container decode and encode.
//!
//! A container is a plain concatenation of entries, one per map:
//! `[EntryHeader][record array]` repeated until the end of the file, with no
//! index or trailing padding. Decoding is all-or-nothing: the first format
//! error aborts the whole container.

use crate::error::{GbvhError, Result};
use crate::header::{EntryHeader, HEADER_SIZE};
use crate::record::{RECORD_SIZE, encode_records};
use crate::tree::{AssembledTree, Tree, flatten};
use std::collections::BTreeMap;

/// Decode every entry of a container, keyed by map identifier.
///
/// # Errors
///
/// Returns an error if:
/// - an entry header is truncated or has the wrong tag or version
/// - an entry's size runs past the end of the data or leaves a partial record
/// - an entry's records do not form a tree rooted at record 0
/// - two entries share a map identifier
pub fn decode_all(data: &[u8]) -> Result<BTreeMap<u16, AssembledTree>> {
    let mut maps = BTreeMap::new();
    let mut offset = 0;

    while offset < data.len() {
        let header = EntryHeader::read(data, offset)?;
        let map_id = header.map_id;
        let end = offset + header.size as usize;

        if header.records_len() % RECORD_SIZE != 0 {
            return Err(GbvhError::BadEntrySize { offset, size: header.size }.in_map(map_id));
        }
        let body = data.get(offset + HEADER_SIZE..end).ok_or_else(|| {
            GbvhError::Truncated {
                offset,
                needed: header.size as usize,
                available: data.len() - offset,
            }
            .in_map(map_id)
        })?;

        let assembled = AssembledTree::from_bytes(body).map_err(|e| e.in_map(map_id))?;
        tracing::debug!(
            map_id,
            offset,
            records = body.len() / RECORD_SIZE,
            leaves = assembled.leaves.len(),
            "decoded entry"
        );

        if maps.insert(map_id, assembled).is_some() {
            return Err(GbvhError::DuplicateMap { map_id });
        }
        offset = end;
    }

    Ok(maps)
}

/// Encode trees into a container, in ascending map identifier order.
///
/// Input order does not affect the output.
///
/// # Errors
///
/// Returns an error if two trees share a map identifier, or a tree is too
/// large for the entry size field.
pub fn encode_all<'a, I>(trees: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = (u16, &'a Tree)>,
{
    let mut trees: Vec<(u16, &Tree)> = trees.into_iter().collect();
    trees.sort_by_key(|(map_id, _)| *map_id);

    for pair in trees.windows(2) {
        if let [(a, _), (b, _)] = pair {
            if a == b {
                return Err(GbvhError::DuplicateMap { map_id: *a });
            }
        }
    }

    let mut out = Vec::new();
    for (map_id, tree) in trees {
        let records = flatten(tree).map_err(|e| e.in_map(map_id))?;
        let body = encode_records(&records);
        let header = EntryHeader::new(map_id, body.len())?;

        out.extend_from_slice(&header.to_bytes());
        out.extend_from_slice(&body);
        tracing::debug!(map_id, records = records.len(), size = header.size, "encoded entry");
    }

    Ok(out)
}
