//! Topology-free, hand-editable leaf lists.
//!
//! One *unit* per map: a JSON array of leaves, each an identifier token plus
//! per-axis `[min, max]` pairs. Units are named `<mapId>.json`.
//!
//! ```json
//! [
//!  {
//!   "id": "<0000ABCD>",
//!   "x": [0.0, 1.0],
//!   "y": [0.0, 1.0],
//!   "z": [0.0, 1.0]
//!  }
//! ]
//! ```

use crate::bounds::Aabb;
use crate::error::{GbvhError, Result};
use crate::storage::write_locked;
use crate::tree::Leaf;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File extension of leaf units.
pub const UNIT_EXTENSION: &str = "json";

/// One leaf in portable form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortableLeaf {
    /// Identifier token, `<XXXXXXXX>`.
    #[serde(alias = "identifier")]
    pub id: String,
    /// `[min, max]` on the x axis.
    pub x: [f32; 2],
    /// `[min, max]` on the y axis.
    pub y: [f32; 2],
    /// `[min, max]` on the z axis.
    pub z: [f32; 2],
}

/// Options for emitting units.
#[derive(Debug, Clone)]
pub struct PortableOptions {
    /// Indent output with one space per level instead of writing one line.
    pub pretty: bool,
}

impl Default for PortableOptions {
    fn default() -> Self {
        Self { pretty: true }
    }
}

/// Render a payload as an identifier token.
#[must_use]
pub fn format_identifier(payload: u32) -> String {
    format!("<{payload:08X}>")
}

/// Parse an identifier token. Surrounding angle brackets are optional.
///
/// # Errors
///
/// Returns an error if the token is not 1 to 8 hexadecimal digits once the
/// brackets are stripped.
pub fn parse_identifier(map_id: u16, token: &str) -> Result<u32> {
    let digits = token.trim().trim_matches(|c| c == '<' || c == '>');
    let invalid = || GbvhError::InvalidIdentifier { map_id, token: token.to_owned() };

    if digits.is_empty() || digits.len() > 8 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    u32::from_str_radix(digits, 16).map_err(|_| invalid())
}

/// Convert leaves to their portable form, preserving order.
#[must_use]
pub fn export(leaves: &[Leaf]) -> Vec<PortableLeaf> {
    leaves
        .iter()
        .map(|leaf| PortableLeaf {
            id: format_identifier(leaf.payload),
            x: leaf.bounds.axis(0),
            y: leaf.bounds.axis(1),
            z: leaf.bounds.axis(2),
        })
        .collect()
}

/// Convert portable leaves back to leaves, preserving order.
///
/// # Errors
///
/// Returns an error naming `map_id` if any identifier token is malformed.
pub fn import(map_id: u16, unit: &[PortableLeaf]) -> Result<Vec<Leaf>> {
    unit.iter()
        .map(|p| {
            Ok(Leaf {
                bounds: Aabb::from_axes(p.x, p.y, p.z),
                payload: parse_identifier(map_id, &p.id)?,
            })
        })
        .collect()
}

/// Serialize a unit to JSON text.
///
/// # Errors
///
/// Returns an error if a leaf box holds an infinity or NaN (JSON would
/// store it as `null`, which cannot be read back), or if serialization fails.
pub fn to_json(map_id: u16, leaves: &[Leaf], options: &PortableOptions) -> Result<String> {
    if let Some(leaf) = leaves.iter().find(|leaf| !leaf.bounds.is_finite()) {
        return Err(GbvhError::NonFiniteBounds { map_id, token: format_identifier(leaf.payload) });
    }

    write_json(&export(leaves), options.pretty)
        .map_err(|e| GbvhError::InvalidUnit { map_id, reason: e.to_string() })
}

/// JSON text of `value`, indented one space per level when `pretty`.
pub(crate) fn write_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> serde_json::Result<String> {
    if !pretty {
        return serde_json::to_string(value);
    }

    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut ser)?;
    // serde_json only emits UTF-8
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Parse a unit from JSON text.
///
/// # Errors
///
/// Returns an error naming `map_id` if the text is not a list of leaves, a
/// field is missing, or an identifier is malformed.
pub fn from_json(map_id: u16, text: &str) -> Result<Vec<Leaf>> {
    let unit: Vec<PortableLeaf> = serde_json::from_str(text)
        .map_err(|e| GbvhError::InvalidUnit { map_id, reason: e.to_string() })?;
    import(map_id, &unit)
}

/// File name of the unit for a map.
#[must_use]
pub fn unit_file_name(map_id: u16) -> String {
    format!("{map_id}.{UNIT_EXTENSION}")
}

/// Map identifier encoded in a unit's file name (`"12.json"` → 12).
///
/// # Errors
///
/// Returns an error if the name does not end in `.json` or its stem is not
/// a decimal `u16`.
pub fn map_id_from_unit_name(name: &str) -> Result<u16> {
    name.strip_suffix(UNIT_EXTENSION)
        .and_then(|stem| stem.strip_suffix('.'))
        .and_then(|stem| stem.parse().ok())
        .ok_or_else(|| GbvhError::InvalidUnitName { name: name.to_owned() })
}

/// Write one map's unit into `dir`, returning the path written.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn write_unit(dir: &Path, map_id: u16, leaves: &[Leaf], options: &PortableOptions) -> Result<PathBuf> {
    let path = dir.join(unit_file_name(map_id));
    write_locked(&path, to_json(map_id, leaves, options)?.as_bytes())?;
    Ok(path)
}

/// Read one unit file; its map identifier comes from the file name.
///
/// # Errors
///
/// Returns an error if the name carries no map identifier, the file cannot
/// be read, or its contents are not a valid unit.
pub fn read_unit(path: &Path) -> Result<(u16, Vec<Leaf>)> {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    let map_id = map_id_from_unit_name(name)?;
    let text = std::fs::read_to_string(path).map_err(|e| GbvhError::io(path, e))?;
    Ok((map_id, from_json(map_id, &text)?))
}

/// Read every `*.json` unit in `dir`, keyed by map identifier.
///
/// Other files and subdirectories are ignored.
///
/// # Errors
///
/// Returns an error if the directory cannot be listed or any unit fails to
/// read. Two files naming the same map (`7.json`, `07.json`) are rejected.
pub fn read_unit_dir(dir: &Path) -> Result<BTreeMap<u16, Vec<Leaf>>> {
    let io_err = |e| GbvhError::io(dir, e);
    let mut units = BTreeMap::new();

    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let is_unit = path.is_file()
            && path.extension().and_then(|e| e.to_str()) == Some(UNIT_EXTENSION);
        if !is_unit {
            continue;
        }

        let (map_id, leaves) = read_unit(&path)?;
        tracing::debug!(map_id, leaves = leaves.len(), path = %path.display(), "read unit");
        if units.insert(map_id, leaves).is_some() {
            return Err(GbvhError::DuplicateMap { map_id });
        }
    }

    Ok(units)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(payload: u32) -> Leaf {
        Leaf { bounds: Aabb::from_axes([1.0, 2.0], [-3.5, 4.0], [0.25, 8.0]), payload }
    }

    #[test]
    fn test_identifier_format() {
        assert_eq!(format_identifier(0xABCD), "<0000ABCD>");
        assert_eq!(format_identifier(u32::MAX), "<FFFFFFFF>");
    }

    #[test]
    fn test_identifier_parse() {
        assert_eq!(parse_identifier(0, "<0000ABCD>").unwrap(), 0xABCD);
        assert_eq!(parse_identifier(0, "0000abcd").unwrap(), 0xABCD);
        assert_eq!(parse_identifier(0, "<<12>>").unwrap(), 0x12);
    }

    #[test]
    fn test_identifier_rejects_malformed() {
        for token in ["", "<>", "<0000ABCG>", "<100000000>", "<+1>", "<0x12>"] {
            let err = parse_identifier(17, token).unwrap_err();
            assert!(
                matches!(&err, GbvhError::InvalidIdentifier { map_id: 17, .. }),
                "{token}: {err}"
            );
        }
    }

    #[test]
    fn test_export_layout() {
        let unit = export(&[leaf(0xABCD)]);
        assert_eq!(
            unit,
            vec![PortableLeaf {
                id: "<0000ABCD>".into(),
                x: [1.0, 2.0],
                y: [-3.5, 4.0],
                z: [0.25, 8.0],
            }]
        );
    }

    #[test]
    fn test_json_keys_and_order() {
        let text = to_json(1, &[leaf(0xABCD)], &PortableOptions { pretty: false }).unwrap();
        assert_eq!(text, r#"[{"id":"<0000ABCD>","x":[1.0,2.0],"y":[-3.5,4.0],"z":[0.25,8.0]}]"#);
    }

    #[test]
    fn test_pretty_json_parses_back() {
        let leaves = vec![leaf(1), leaf(0xFFFF_FFFF)];
        let text = to_json(3, &leaves, &PortableOptions::default()).unwrap();
        assert!(text.contains("\n "));
        assert_eq!(from_json(3, &text).unwrap(), leaves);
    }

    #[test]
    fn test_non_finite_bounds_rejected() {
        let bad = Leaf {
            bounds: Aabb::new([f32::NEG_INFINITY, 0.0, 0.0], [f32::INFINITY, 1.0, 1.0]),
            payload: 1,
        };
        for options in [PortableOptions::default(), PortableOptions { pretty: false }] {
            let err = to_json(3, &[leaf(2), bad], &options).unwrap_err();
            assert!(matches!(
                &err,
                GbvhError::NonFiniteBounds { map_id: 3, token } if token == "<00000001>"
            ));
            assert!(err.to_string().contains("map 3"));
        }

        let nan = Leaf { bounds: Aabb::new([0.0; 3], [1.0, f32::NAN, 1.0]), payload: 0xFF };
        assert!(to_json(4, &[nan], &PortableOptions::default()).is_err());
    }

    #[test]
    fn test_extreme_finite_bounds_survive() {
        let wide = Leaf { bounds: Aabb::new([f32::MIN; 3], [f32::MAX; 3]), payload: 5 };
        let text = to_json(1, &[wide], &PortableOptions::default()).unwrap();
        assert_eq!(from_json(1, &text).unwrap(), vec![wide]);
    }

    #[test]
    fn test_identifier_alias_accepted() {
        let text = r#"[{"identifier":"<00000010>","x":[0,1],"y":[0,1],"z":[0,1]}]"#;
        assert_eq!(from_json(0, text).unwrap()[0].payload, 0x10);
    }

    #[test]
    fn test_missing_field_names_map() {
        let text = r#"[{"id":"<00000010>","x":[0,1],"y":[0,1]}]"#;
        let err = from_json(42, text).unwrap_err();
        assert!(matches!(err, GbvhError::InvalidUnit { map_id: 42, .. }));
        assert!(err.to_string().contains("map 42"));
    }

    #[test]
    fn test_unit_names() {
        assert_eq!(unit_file_name(12), "12.json");
        assert_eq!(map_id_from_unit_name("12.json").unwrap(), 12);
        assert!(map_id_from_unit_name("12.txt").is_err());
        assert!(map_id_from_unit_name("abc.json").is_err());
        assert!(map_id_from_unit_name("70000.json").is_err());
        assert!(map_id_from_unit_name(".json").is_err());
    }
}
