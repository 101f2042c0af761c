//! Fixed-width BVH node record layout.
//!
//! # Design Principles
//!
//! Every node of a map's tree is stored as one **64-byte** record. Records of
//! an entry are packed back to back, so a node is addressed directly:
//! `record_offset = index * RECORD_SIZE`. Pointer fields store exactly that
//! byte offset, relative to the start of the entry's record array.
//!
//! An all-ones pointer (`NULL_OFFSET`) means "no node".
//!
//! # Layout Invariants
//!
//! - Record size is fixed; the format has no per-file record size
//! - Present pointers are always multiples of `RECORD_SIZE`
//! - Padding lanes are written as zero and ignored on read

use crate::bounds::Aabb;
use crate::error::{GbvhError, Result};

/// Position of a record inside one entry's record array.
pub type RecordIndex = u32;

/// Size of one encoded node record in bytes.
pub const RECORD_SIZE: usize = 64;

/// Sentinel pointer value meaning "none".
pub const NULL_OFFSET: u64 = u64::MAX;

/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0x00    16    min x, y, z: f32 + pad
/// 0x10    16    max x, y, z: f32 + pad
/// 0x20    8     parent: u64 byte offset
/// 0x28    8     left: u64 byte offset
/// 0x30    8     right: u64 byte offset
/// 0x38    4     payload: u32
/// 0x3C    4     has_payload: u32 (nonzero = leaf)
/// ```
const MIN_AT: usize = 0x00;
const MAX_AT: usize = 0x10;
const PARENT_AT: usize = 0x20;
const LEFT_AT: usize = 0x28;
const RIGHT_AT: usize = 0x30;
const PAYLOAD_AT: usize = 0x38;
const HAS_PAYLOAD_AT: usize = 0x3C;

/// One decoded record. Pointer fields hold record indices, not byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NodeDescriptor {
    /// Bounding box of the node.
    pub bounds: Aabb,
    /// Parent record, if any.
    pub parent: Option<RecordIndex>,
    /// Left child record, if any.
    pub left: Option<RecordIndex>,
    /// Right child record, if any.
    pub right: Option<RecordIndex>,
    /// Leaf payload. Present iff the node is a leaf.
    pub payload: Option<u32>,
}

impl NodeDescriptor {
    /// Create a leaf descriptor with no links.
    #[must_use]
    pub const fn leaf(bounds: Aabb, payload: u32) -> Self {
        Self { bounds, parent: None, left: None, right: None, payload: Some(payload) }
    }

    /// Whether the record carries a payload.
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        self.payload.is_some()
    }

    /// Decode one record.
    ///
    /// `record` is the index of this record within its array and is only used
    /// to label errors.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `bytes` is shorter than `RECORD_SIZE`
    /// - a pointer field is neither `NULL_OFFSET` nor a multiple of `RECORD_SIZE`
    /// - a pointer resolves to an index that does not fit a `RecordIndex`
    pub fn decode(bytes: &[u8], record: usize) -> Result<Self> {
        let bytes: &[u8; RECORD_SIZE] = bytes
            .get(..RECORD_SIZE)
            .and_then(|b| b.try_into().ok())
            .ok_or(GbvhError::Truncated {
                offset: record * RECORD_SIZE,
                needed: RECORD_SIZE,
                available: bytes.len(),
            })?;

        let bounds = Aabb::new(read_vec3(bytes, MIN_AT), read_vec3(bytes, MAX_AT));
        let has_payload = read_u32(bytes, HAS_PAYLOAD_AT) != 0;

        Ok(Self {
            bounds,
            parent: offset_to_index(read_u64(bytes, PARENT_AT), record)?,
            left: offset_to_index(read_u64(bytes, LEFT_AT), record)?,
            right: offset_to_index(read_u64(bytes, RIGHT_AT), record)?,
            payload: has_payload.then(|| read_u32(bytes, PAYLOAD_AT)),
        })
    }

    /// Encode the record into its on-disk form.
    ///
    /// Absent pointers become `NULL_OFFSET`; an absent payload writes a zero
    /// payload and a zero flag.
    #[must_use]
    pub fn encode(&self) -> [u8; RECORD_SIZE] {
        let mut bytes = [0u8; RECORD_SIZE];

        write_vec3(&mut bytes, MIN_AT, self.bounds.min);
        write_vec3(&mut bytes, MAX_AT, self.bounds.max);
        write_u64(&mut bytes, PARENT_AT, index_to_offset(self.parent));
        write_u64(&mut bytes, LEFT_AT, index_to_offset(self.left));
        write_u64(&mut bytes, RIGHT_AT, index_to_offset(self.right));
        write_u32(&mut bytes, PAYLOAD_AT, self.payload.unwrap_or(0));
        write_u32(&mut bytes, HAS_PAYLOAD_AT, u32::from(self.payload.is_some()));

        bytes
    }
}

/// Decode a whole record array.
///
/// # Errors
///
/// Returns an error if the array length is not a multiple of `RECORD_SIZE`
/// or if any record fails to decode.
pub fn decode_records(bytes: &[u8]) -> Result<Vec<NodeDescriptor>> {
    if bytes.len() % RECORD_SIZE != 0 {
        return Err(GbvhError::Truncated {
            offset: bytes.len() - bytes.len() % RECORD_SIZE,
            needed: RECORD_SIZE,
            available: bytes.len() % RECORD_SIZE,
        });
    }

    bytes
        .chunks_exact(RECORD_SIZE)
        .enumerate()
        .map(|(record, chunk)| NodeDescriptor::decode(chunk, record))
        .collect()
}

/// Encode descriptors back to back into a record array.
#[must_use]
pub fn encode_records(records: &[NodeDescriptor]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(records.len() * RECORD_SIZE);
    for record in records {
        bytes.extend_from_slice(&record.encode());
    }
    bytes
}

/// Convert an optional record index to its pointer value.
///
/// # Formula
///
/// ```text
/// offset = index * RECORD_SIZE
/// ```
#[inline]
#[must_use]
pub const fn index_to_offset(index: Option<RecordIndex>) -> u64 {
    match index {
        Some(index) => index as u64 * RECORD_SIZE as u64,
        None => NULL_OFFSET,
    }
}

/// Convert a pointer value back to a record index.
///
/// `record` labels the error with the record that holds the pointer.
///
/// # Errors
///
/// Returns an error if the offset is not a multiple of `RECORD_SIZE`, or is
/// too large to name a record.
#[inline]
pub fn offset_to_index(offset: u64, record: usize) -> Result<Option<RecordIndex>> {
    if offset == NULL_OFFSET {
        return Ok(None);
    }
    if offset % RECORD_SIZE as u64 != 0 {
        return Err(GbvhError::MisalignedOffset { record, offset });
    }

    RecordIndex::try_from(offset / RECORD_SIZE as u64)
        .map(Some)
        .map_err(|_| GbvhError::OffsetTooLarge { record, offset })
}

#[inline]
fn read_u32(bytes: &[u8; RECORD_SIZE], at: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[at..at + 4]);
    u32::from_le_bytes(buf)
}

#[inline]
fn read_u64(bytes: &[u8; RECORD_SIZE], at: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(buf)
}

#[inline]
fn read_vec3(bytes: &[u8; RECORD_SIZE], at: usize) -> [f32; 3] {
    [
        f32::from_bits(read_u32(bytes, at)),
        f32::from_bits(read_u32(bytes, at + 4)),
        f32::from_bits(read_u32(bytes, at + 8)),
    ]
}

#[inline]
fn write_u32(bytes: &mut [u8; RECORD_SIZE], at: usize, value: u32) {
    bytes[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

#[inline]
fn write_u64(bytes: &mut [u8; RECORD_SIZE], at: usize, value: u64) {
    bytes[at..at + 8].copy_from_slice(&value.to_le_bytes());
}

#[inline]
fn write_vec3(bytes: &mut [u8; RECORD_SIZE], at: usize, v: [f32; 3]) {
    for (lane, value) in v.into_iter().enumerate() {
        write_u32(bytes, at + lane * 4, value.to_bits());
    }
    // Fourth lane is padding.
    write_u32(bytes, at + 12, 0);
}
