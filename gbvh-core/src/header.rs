use crate::error::{GbvhError, Result};

/// Tag bytes opening every container entry
pub const MAGIC: &[u8; 4] = b"GBVH";

/// Version/kind marker of supported entries
pub const VERSION: [u8; 2] = [0x00, 0x01];

/// Size of an entry header in bytes
pub const HEADER_SIZE: usize = 16;

/// Header of one per-map container entry.
///
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       4     magic: "GBVH"
/// 4       4     size: u32 (header + record array)
/// 8       2     version: 00 01
/// 10      2     map_id: u16
/// 12      4     reserved (zero)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryHeader {
    /// Total entry size in bytes, header included
    pub size: u32,

    /// Map this entry's tree belongs to
    pub map_id: u16,
}

impl EntryHeader {
    /// Creates a header for a record array of `records_len` bytes
    ///
    /// # Errors
    ///
    /// Returns an error if the entry would not fit a `u32` size field.
    pub fn new(map_id: u16, records_len: usize) -> Result<Self> {
        let size = records_len
            .checked_add(HEADER_SIZE)
            .and_then(|s| u32::try_from(s).ok())
            .ok_or(GbvhError::BadEntrySize { offset: 0, size: u32::MAX })
            .map_err(|e| e.in_map(map_id))?;
        Ok(Self { size, map_id })
    }

    /// Byte length of the record array following the header
    #[must_use]
    pub fn records_len(&self) -> usize {
        (self.size as usize).saturating_sub(HEADER_SIZE)
    }

    /// Reads and validates a header starting at `offset` in `data`
    ///
    /// # Errors
    ///
    /// Returns an error if the header is truncated, the tag or version is
    /// wrong, or the declared size is smaller than the header.
    pub fn read(data: &[u8], offset: usize) -> Result<Self> {
        let bytes: &[u8; HEADER_SIZE] = data
            .get(offset..)
            .and_then(|rest| rest.get(..HEADER_SIZE))
            .and_then(|b| b.try_into().ok())
            .ok_or(GbvhError::Truncated {
                offset,
                needed: HEADER_SIZE,
                available: data.len().saturating_sub(offset),
            })?;

        let [m0, m1, m2, m3, s0, s1, s2, s3, v0, v1, i0, i1, ..] = *bytes;

        if [m0, m1, m2, m3] != *MAGIC {
            return Err(GbvhError::BadMagic { offset, found: [m0, m1, m2, m3] });
        }
        if [v0, v1] != VERSION {
            return Err(GbvhError::BadVersion { offset, found: [v0, v1] });
        }

        let header = Self {
            size: u32::from_le_bytes([s0, s1, s2, s3]),
            map_id: u16::from_le_bytes([i0, i1]),
        };
        if (header.size as usize) < HEADER_SIZE {
            return Err(GbvhError::BadEntrySize { offset, size: header.size }.in_map(header.map_id));
        }
        Ok(header)
    }

    /// Returns the header in its on-disk form
    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(MAGIC);
        bytes[4..8].copy_from_slice(&self.size.to_le_bytes());
        bytes[8..10].copy_from_slice(&VERSION);
        bytes[10..12].copy_from_slice(&self.map_id.to_le_bytes());
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let header = EntryHeader::new(0x1234, 128).unwrap();
        let bytes = header.to_bytes();
        assert_eq!(
            bytes,
            [0x47, 0x42, 0x56, 0x48, 144, 0, 0, 0, 0x00, 0x01, 0x34, 0x12, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_read_back() {
        let header = EntryHeader::new(7, 64).unwrap();
        let mut data = vec![0xAA; 3];
        data.extend_from_slice(&header.to_bytes());

        let read = EntryHeader::read(&data, 3).unwrap();
        assert_eq!(read, header);
        assert_eq!(read.records_len(), 64);
    }

    #[test]
    fn test_invalid_magic() {
        let mut bytes = EntryHeader::new(1, 0).unwrap().to_bytes();
        bytes[0] = b'X';
        assert!(matches!(EntryHeader::read(&bytes, 0), Err(GbvhError::BadMagic { offset: 0, .. })));
    }

    #[test]
    fn test_invalid_version() {
        let mut bytes = EntryHeader::new(1, 0).unwrap().to_bytes();
        bytes[9] = 0x02;
        assert!(matches!(
            EntryHeader::read(&bytes, 0),
            Err(GbvhError::BadVersion { found: [0x00, 0x02], .. })
        ));
    }

    #[test]
    fn test_size_smaller_than_header() {
        let mut bytes = EntryHeader::new(1, 0).unwrap().to_bytes();
        bytes[4] = 8;
        assert!(EntryHeader::read(&bytes, 0).unwrap_err().is_format_error());
    }

    #[test]
    fn test_truncated_header() {
        let bytes = EntryHeader::new(1, 0).unwrap().to_bytes();
        assert!(matches!(
            EntryHeader::read(&bytes[..10], 0),
            Err(GbvhError::Truncated { needed: 16, available: 10, .. })
        ));
    }
}
