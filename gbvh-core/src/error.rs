//! Error types for container and leaf-unit conversion.
//!
//! Three families exist:
//! - **Format** errors describe a corrupt or unsupported container. They are
//!   always fatal for the whole decode.
//! - **Input** errors describe a malformed portable leaf unit. They name the
//!   map the unit belongs to.
//! - **Resource** errors wrap I/O failures on a concrete path.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while converting between containers, trees and leaf units.
#[derive(Error, Debug)]
pub enum GbvhError {
    /// Entry tag is not `GBVH`.
    #[error("bad entry tag {found:02X?} at byte offset {offset:#x}")]
    BadMagic {
        /// Byte offset of the entry header in the container.
        offset: usize,
        /// The four bytes found instead of the tag.
        found: [u8; 4],
    },

    /// Entry version marker is not `00 01`.
    #[error("unsupported entry version {found:02X?} at byte offset {offset:#x}")]
    BadVersion {
        /// Byte offset of the entry header in the container.
        offset: usize,
        /// The marker bytes found.
        found: [u8; 2],
    },

    /// Entry size is smaller than its header or leaves a partial record.
    #[error("invalid entry size {size} at byte offset {offset:#x}")]
    BadEntrySize {
        /// Byte offset of the entry header in the container.
        offset: usize,
        /// Declared entry size.
        size: u32,
    },

    /// The buffer ends before a declared structure does.
    #[error("truncated data at byte offset {offset:#x}: need {needed} bytes, {available} available")]
    Truncated {
        /// Byte offset where the structure starts.
        offset: usize,
        /// Bytes required.
        needed: usize,
        /// Bytes left in the buffer.
        available: usize,
    },

    /// A pointer field is not a multiple of the record size.
    #[error("record {record}: pointer {offset:#x} is not a multiple of the record size")]
    MisalignedOffset {
        /// Index of the record holding the pointer.
        record: usize,
        /// Raw pointer value.
        offset: u64,
    },

    /// A pointer resolves past the end of the record array.
    #[error("record {record}: pointer to record {index} is out of range ({count} records)")]
    IndexOutOfRange {
        /// Index of the record holding the pointer.
        record: usize,
        /// Resolved index.
        index: u64,
        /// Number of records in the array.
        count: usize,
    },

    /// A pointer names a record past what a 32-bit index can address.
    #[error("record {record}: pointer {offset:#x} is too large to name a record")]
    OffsetTooLarge {
        /// Index of the record holding the pointer.
        record: usize,
        /// Raw pointer value.
        offset: u64,
    },

    /// The pointer graph is not a tree rooted at record 0.
    #[error("record {record}: {reason}")]
    MalformedTree {
        /// Index of the offending record.
        record: usize,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// A level-file section header is inconsistent with its contents.
    #[error("section at byte offset {offset:#x}: {reason}")]
    BadSection {
        /// Byte offset of the section header.
        offset: usize,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// Two entries share the same map identifier.
    #[error("map {map_id} appears more than once")]
    DuplicateMap {
        /// The repeated identifier.
        map_id: u16,
    },

    /// A format error inside a specific map entry.
    #[error("map {map_id}: {source}")]
    InMap {
        /// Map the entry belongs to.
        map_id: u16,
        /// The underlying error.
        #[source]
        source: Box<GbvhError>,
    },

    /// A leaf identifier token is not 8 hexadecimal digits.
    #[error("map {map_id}: invalid leaf identifier {token:?}")]
    InvalidIdentifier {
        /// Map the unit belongs to.
        map_id: u16,
        /// The offending token.
        token: String,
    },

    /// A leaf unit could not be parsed (bad JSON, missing field).
    #[error("map {map_id}: invalid leaf unit: {reason}")]
    InvalidUnit {
        /// Map the unit belongs to.
        map_id: u16,
        /// Parser message.
        reason: String,
    },

    /// A leaf box holds an infinity or NaN, which JSON cannot represent.
    #[error("map {map_id}: leaf {token} has non-finite bounds")]
    NonFiniteBounds {
        /// Map the leaf belongs to.
        map_id: u16,
        /// Identifier token of the leaf.
        token: String,
    },

    /// A unit's name does not carry a map identifier.
    #[error("unit name {name:?} is not a map identifier")]
    InvalidUnitName {
        /// The offending name.
        name: String,
    },

    /// I/O failure on a file or directory.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl GbvhError {
    /// Attach a map identifier to an error raised while decoding that map's entry.
    #[must_use]
    pub fn in_map(self, map_id: u16) -> Self {
        match self {
            already @ GbvhError::InMap { .. } => already,
            other => GbvhError::InMap { map_id, source: Box::new(other) },
        }
    }

    /// Wrap an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GbvhError::Io { path: path.into(), source }
    }

    /// Whether this error describes a corrupt container rather than bad input or I/O.
    #[must_use]
    pub fn is_format_error(&self) -> bool {
        match self {
            GbvhError::InMap { source, .. } => source.is_format_error(),
            GbvhError::BadMagic { .. }
            | GbvhError::BadVersion { .. }
            | GbvhError::BadEntrySize { .. }
            | GbvhError::Truncated { .. }
            | GbvhError::MisalignedOffset { .. }
            | GbvhError::IndexOutOfRange { .. }
            | GbvhError::OffsetTooLarge { .. }
            | GbvhError::BadSection { .. }
            | GbvhError::MalformedTree { .. }
            | GbvhError::DuplicateMap { .. } => true,
            _ => false,
        }
    }
}

/// Result type for conversion operations.
pub type Result<T> = std::result::Result<T, GbvhError>;
