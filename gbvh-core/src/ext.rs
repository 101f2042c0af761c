//! Decoders for small fixed-layout level records, keyed by four-byte tag.
//!
//! The table is built once and then only read; callers hold it by reference.
//! Each game revision has its own set of decoders, so lookups are keyed by
//! `(tag, game)`.

use crate::error::{GbvhError, Result};
use crate::portable::format_identifier;
use serde::{Serialize, Serializer};
use std::collections::HashMap;

/// Game revision whose record layouts apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Game {
    /// Xenoblade Chronicles 2.
    Xc2,
    /// Xenoblade Chronicles 3.
    Xc3,
}

/// A decoded extension record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExtRecord {
    /// `INFO`: per-object info row.
    Info {
        /// Row in the object's data table.
        #[serde(serialize_with = "as_identifier")]
        bdat_id: u32,
        /// Index into the `XFRM` section.
        #[serde(skip_serializing)]
        xfrm_index: u32,
        /// Running object number.
        sequential_id: u16,
        /// Hashed object name.
        #[serde(serialize_with = "as_identifier")]
        hash_id: u32,
    },
    /// `INFO` in the older layout.
    InfoLegacy {
        /// Offset of the object's name in the `STRG` section.
        name_id: u32,
        /// Index into the `XFRM` section.
        xfrm_index: u32,
    },
    /// `XFRM`: a 4x4 transform, row-major.
    Transform {
        /// Matrix elements.
        matrix: [f32; 16],
    },
    /// `ENEW`: one enemy wave instance.
    EnemyWave {
        /// Whether the wave starts on its own.
        auto_start: bool,
        /// First wave index.
        start_wave: u16,
        /// One past the last wave index.
        end_wave: u16,
    },
    /// `ENWP`: spawn parameters of a wave.
    EnemyWavePop {
        /// Seconds before the next wave starts automatically.
        max_time: f32,
        /// Minimum enemy count.
        enemy_min: u16,
        /// Maximum enemy count.
        enemy_max: u16,
    },
}

/// Decoder for one record layout.
pub type Decoder = fn(&[u8]) -> Result<ExtRecord>;

/// Immutable `(tag, game) → decoder` table.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    decoders: HashMap<([u8; 4], Game), Decoder>,
}

impl Registry {
    /// Table with every built-in decoder.
    #[must_use]
    pub fn builtin() -> Self {
        let mut decoders: HashMap<([u8; 4], Game), Decoder> = HashMap::new();
        decoders.insert((*b"INFO", Game::Xc3), decode_info);
        decoders.insert((*b"INFO", Game::Xc2), decode_info_legacy);
        decoders.insert((*b"XFRM", Game::Xc3), decode_xfrm);
        decoders.insert((*b"XFRM", Game::Xc2), decode_xfrm);
        decoders.insert((*b"ENEW", Game::Xc3), decode_enew);
        decoders.insert((*b"ENWP", Game::Xc3), decode_enwp);
        Self { decoders }
    }

    /// Decoder registered for a tag, if any.
    #[must_use]
    pub fn get(&self, tag: [u8; 4], game: Game) -> Option<Decoder> {
        self.decoders.get(&(tag, game)).copied()
    }

    /// Decode `entry` with the decoder registered for `tag`.
    ///
    /// Returns `None` when no decoder is registered.
    #[must_use]
    pub fn decode(&self, tag: [u8; 4], game: Game, entry: &[u8]) -> Option<Result<ExtRecord>> {
        self.get(tag, game).map(|decode| decode(entry))
    }
}

pub(crate) fn field<const N: usize>(entry: &[u8], at: usize) -> Result<[u8; N]> {
    entry
        .get(at..at + N)
        .and_then(|b| b.try_into().ok())
        .ok_or(GbvhError::Truncated { offset: at, needed: N, available: entry.len().saturating_sub(at) })
}

fn as_identifier<S: Serializer>(value: &u32, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_identifier(*value))
}

fn decode_info(entry: &[u8]) -> Result<ExtRecord> {
    Ok(ExtRecord::Info {
        bdat_id: u32::from_le_bytes(field(entry, 0)?),
        xfrm_index: u32::from_le_bytes(field(entry, 4)?),
        sequential_id: u16::from_le_bytes(field(entry, 10)?),
        hash_id: u32::from_le_bytes(field(entry, 12)?),
    })
}

fn decode_info_legacy(entry: &[u8]) -> Result<ExtRecord> {
    Ok(ExtRecord::InfoLegacy {
        name_id: u32::from_le_bytes(field(entry, 0)?),
        xfrm_index: u32::from_le_bytes(field(entry, 8)?),
    })
}

fn decode_xfrm(entry: &[u8]) -> Result<ExtRecord> {
    let mut matrix = [0.0f32; 16];
    for (i, value) in matrix.iter_mut().enumerate() {
        *value = f32::from_le_bytes(field(entry, i * 4)?);
    }
    Ok(ExtRecord::Transform { matrix })
}

fn decode_enew(entry: &[u8]) -> Result<ExtRecord> {
    let [auto_start] = field::<1>(entry, 4)?;
    Ok(ExtRecord::EnemyWave {
        auto_start: auto_start != 0,
        start_wave: u16::from_le_bytes(field(entry, 8)?),
        end_wave: u16::from_le_bytes(field(entry, 10)?),
    })
}

fn decode_enwp(entry: &[u8]) -> Result<ExtRecord> {
    Ok(ExtRecord::EnemyWavePop {
        max_time: f32::from_le_bytes(field(entry, 4)?),
        enemy_min: u16::from_le_bytes(field(entry, 12)?),
        enemy_max: u16::from_le_bytes(field(entry, 14)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enew() {
        let mut entry = [0u8; 12];
        entry[4] = 1;
        entry[8..10].copy_from_slice(&2u16.to_le_bytes());
        entry[10..12].copy_from_slice(&6u16.to_le_bytes());

        let registry = Registry::builtin();
        let record = registry.decode(*b"ENEW", Game::Xc3, &entry).unwrap().unwrap();
        assert_eq!(record, ExtRecord::EnemyWave { auto_start: true, start_wave: 2, end_wave: 6 });
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            serde_json::json!({ "auto_start": true, "start_wave": 2, "end_wave": 6 })
        );
    }

    #[test]
    fn test_enwp() {
        let mut entry = [0u8; 16];
        entry[4..8].copy_from_slice(&30.0f32.to_le_bytes());
        entry[12..14].copy_from_slice(&3u16.to_le_bytes());
        entry[14..16].copy_from_slice(&5u16.to_le_bytes());

        let record = Registry::builtin().decode(*b"ENWP", Game::Xc3, &entry).unwrap().unwrap();
        assert_eq!(record, ExtRecord::EnemyWavePop { max_time: 30.0, enemy_min: 3, enemy_max: 5 });
    }

    #[test]
    fn test_info_renders_identifiers() {
        let mut entry = [0u8; 16];
        entry[0..4].copy_from_slice(&0xABCDu32.to_le_bytes());
        entry[4..8].copy_from_slice(&3u32.to_le_bytes());
        entry[10..12].copy_from_slice(&12u16.to_le_bytes());
        entry[12..16].copy_from_slice(&0xDEAD_BEEFu32.to_le_bytes());

        let record = Registry::builtin().decode(*b"INFO", Game::Xc3, &entry).unwrap().unwrap();
        assert!(matches!(record, ExtRecord::Info { xfrm_index: 3, .. }));
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            serde_json::json!({ "bdat_id": "<0000ABCD>", "sequential_id": 12, "hash_id": "<DEADBEEF>" })
        );
    }

    #[test]
    fn test_xfrm_reads_sixteen_floats() {
        let entry: Vec<u8> = (0..16).flat_map(|i| (i as f32).to_le_bytes()).collect();
        for game in [Game::Xc2, Game::Xc3] {
            let record = Registry::builtin().decode(*b"XFRM", game, &entry).unwrap().unwrap();
            let ExtRecord::Transform { matrix } = record else { panic!("unexpected {record:?}") };
            assert_eq!(matrix[15], 15.0);
        }
    }

    #[test]
    fn test_lookup_is_per_game() {
        let registry = Registry::builtin();
        assert!(registry.get(*b"ENEW", Game::Xc3).is_some());
        assert!(registry.get(*b"ENEW", Game::Xc2).is_none());
        assert!(registry.decode(*b"ZZZZ", Game::Xc3, &[]).is_none());
    }

    #[test]
    fn test_short_entry() {
        let result = Registry::builtin().decode(*b"ENWP", Game::Xc3, &[0; 13]).unwrap();
        assert!(matches!(result, Err(GbvhError::Truncated { offset: 12, needed: 2, available: 1 })));
    }
}
