//! Level files (`LVLB`): a header followed by tagged sections of
//! fixed-size entries.
//!
//! ```text
//! File header (32 bytes)          Section header (32 bytes)
//! 0   4   magic "LVLB"            0   4   tag
//! 4   4   file size               4   4   section size, header included
//! 8   4   version (>= 5: XC3)     8   4   version
//! 12  4   hash                    12  4   entry count
//! 16  16  reserved                16  4   entry size
//!                                 20  4   first INFO row
//!                                 24  8   reserved
//! ```
//!
//! Entries are decoded through an [`ext::Registry`](crate::ext::Registry);
//! tags without a decoder keep their raw bytes. `STRG` holds one
//! variable-length string pool instead of fixed-size entries.

use crate::error::{GbvhError, Result};
use crate::ext::{ExtRecord, Game, Registry, field};
use crate::portable::write_json;
use crate::storage::ContainerFile;
use serde::{Serialize, Serializer};
use std::path::Path;

/// Tag bytes opening every level file
pub const LVB_MAGIC: &[u8; 4] = b"LVLB";

/// Size of the file header and of each section header
pub const LVB_HEADER_SIZE: usize = 32;

const STRING_POOL: [u8; 4] = *b"STRG";

/// A parsed level file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lvb {
    /// File format version
    pub version: u32,
    /// Sections in file order
    pub sections: Vec<Section>,
}

/// One tagged section
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    /// Four-byte tag
    #[serde(rename = "magic", serialize_with = "tag_as_str")]
    pub tag: [u8; 4],
    /// Section version
    #[serde(skip_serializing)]
    pub version: u32,
    /// First `INFO` row describing this section's entries
    #[serde(skip_serializing)]
    pub info_index: u32,
    /// Entries, decoded where a decoder is registered
    pub entries: Vec<SectionEntry>,
}

/// One section entry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SectionEntry {
    /// Decoded through the registry
    Decoded(ExtRecord),
    /// No decoder for this tag
    Raw {
        /// Entry bytes, hex in JSON
        #[serde(serialize_with = "hex::serde::serialize")]
        bytes: Vec<u8>,
    },
}

fn tag_as_str<S: Serializer>(tag: &[u8; 4], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf8_lossy(tag))
}

impl Lvb {
    /// Game revision whose layouts apply to this file
    #[must_use]
    pub const fn game(&self) -> Game {
        game_for_version(self.version)
    }

    /// Opens and parses a level file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is malformed.
    pub fn open<P: AsRef<Path>>(path: P, registry: &Registry) -> Result<Self> {
        Self::parse(ContainerFile::open(path)?.bytes(), registry)
    }

    /// Parses a level file held in memory
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The magic is wrong or the declared file size exceeds the data
    /// - A section header is truncated, or its size is below the header size
    /// - A section's entries run past the end of the section
    /// - A registered decoder rejects an entry
    pub fn parse(data: &[u8], registry: &Registry) -> Result<Self> {
        let magic: [u8; 4] = field(data, 0)?;
        if magic != *LVB_MAGIC {
            return Err(GbvhError::BadMagic { offset: 0, found: magic });
        }
        let file_size = u32::from_le_bytes(field(data, 4)?) as usize;
        let version = u32::from_le_bytes(field(data, 8)?);
        let game = game_for_version(version);

        let body = data.get(..file_size).ok_or(GbvhError::Truncated {
            offset: 0,
            needed: file_size,
            available: data.len(),
        })?;

        let mut sections = Vec::new();
        let mut offset = LVB_HEADER_SIZE;
        while offset < body.len() {
            let section = read_section(body, offset, game, registry)?;
            tracing::debug!(
                tag = %String::from_utf8_lossy(&section.tag),
                offset,
                entries = section.entries.len(),
                "read section"
            );
            offset += u32::from_le_bytes(field(body, offset + 4)?) as usize;
            sections.push(section);
        }

        Ok(Self { version, sections })
    }

    /// First section with the given tag
    #[must_use]
    pub fn section(&self, tag: [u8; 4]) -> Option<&Section> {
        self.sections.iter().find(|s| s.tag == tag)
    }

    /// JSON text of the whole file, indented one space per level when `pretty`
    ///
    /// Non-finite floats are written as `null`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        write_json(self, pretty)
    }
}

impl Section {
    /// JSON text of this section, indented one space per level when `pretty`
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        write_json(self, pretty)
    }
}

const fn game_for_version(version: u32) -> Game {
    if version >= 5 { Game::Xc3 } else { Game::Xc2 }
}

fn read_section(body: &[u8], offset: usize, game: Game, registry: &Registry) -> Result<Section> {
    let header: [u8; LVB_HEADER_SIZE] = field(body, offset)?;
    let word = |at: usize| u32::from_le_bytes(field(&header, at).unwrap_or_default());

    let tag: [u8; 4] = field(&header, 0)?;
    let size = word(4) as usize;
    let count = word(12) as usize;
    let entry_size = word(16) as usize;

    if size < LVB_HEADER_SIZE {
        return Err(GbvhError::BadSection { offset, reason: "section smaller than its header" });
    }
    let section = body.get(offset..offset + size).ok_or(GbvhError::Truncated {
        offset,
        needed: size,
        available: body.len().saturating_sub(offset),
    })?;
    let entries_data = section.get(LVB_HEADER_SIZE..).unwrap_or_default();

    let entries = if tag == STRING_POOL {
        vec![SectionEntry::Raw { bytes: entries_data.to_vec() }]
    } else {
        let needed = count
            .checked_mul(entry_size)
            .ok_or(GbvhError::BadSection { offset, reason: "entry table size overflows" })?;
        let table = entries_data
            .get(..needed)
            .ok_or(GbvhError::BadSection { offset, reason: "entries run past the end of the section" })?;

        if entry_size == 0 {
            Vec::new()
        } else {
            table
                .chunks_exact(entry_size)
                .map(|entry| match registry.decode(tag, game, entry) {
                    Some(decoded) => decoded.map(SectionEntry::Decoded),
                    None => Ok(SectionEntry::Raw { bytes: entry.to_vec() }),
                })
                .collect::<Result<Vec<_>>>()?
        }
    };

    Ok(Section { tag, version: word(8), info_index: word(20), entries })
}
