//! The 7z signature header: the fixed 32-byte block at the start of every
//! archive volume, giving the CRC-protected location of the end header.

use std::io::Read;

use crate::error::{Error, Result};

use super::reader::{read_u32_le, read_u8};
use super::{SIGNATURE, SIGNATURE_HEADER_SIZE, VERSION_MAJOR, VERSION_MINOR};

/// The signature header of a 7z archive: the first 32 bytes of volume 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartHeader {
    /// Archive format version - major number.
    pub version_major: u8,
    /// Archive format version - minor number.
    pub version_minor: u8,
    /// CRC of the following 20 bytes (offset, size, crc).
    pub start_header_crc: u32,
    /// Offset from the end of the signature header to the next (end) header.
    pub next_header_offset: u64,
    /// Size in bytes of the next header (compressed, if it is encoded).
    pub next_header_size: u64,
    /// CRC of the next header's raw bytes.
    pub next_header_crc: u32,
}

impl StartHeader {
    /// Parses the signature and signature header from `r`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadSignature`] if the magic bytes don't match,
    /// [`Error::MalformedArchive`] if the version is newer than this engine
    /// understands, and [`Error::BadHeaderCrc`] if the 20-byte payload's CRC
    /// doesn't match the recorded value.
    pub fn parse<R: Read>(r: &mut R) -> Result<Self> {
        let mut sig = [0u8; 6];
        r.read_exact(&mut sig)?;
        if sig != *SIGNATURE {
            return Err(Error::BadSignature);
        }

        let version_major = read_u8(r)?;
        let version_minor = read_u8(r)?;
        if version_major > VERSION_MAJOR
            || (version_major == VERSION_MAJOR && version_minor > VERSION_MINOR)
        {
            return Err(Error::MalformedArchive(format!(
                "unsupported archive format version {version_major}.{version_minor}"
            )));
        }

        let start_header_crc = read_u32_le(r)?;

        let mut header_data = [0u8; 20];
        r.read_exact(&mut header_data)?;

        let calculated_crc = crc32fast::hash(&header_data);
        if calculated_crc != start_header_crc {
            return Err(Error::BadHeaderCrc {
                context: "signature header",
            });
        }

        let next_header_offset = u64::from_le_bytes(header_data[0..8].try_into().unwrap());
        let next_header_size = u64::from_le_bytes(header_data[8..16].try_into().unwrap());
        let next_header_crc = u32::from_le_bytes(header_data[16..20].try_into().unwrap());

        Ok(Self {
            version_major,
            version_minor,
            start_header_crc,
            next_header_offset,
            next_header_size,
            next_header_crc,
        })
    }

    /// Serializes the signature header to its 32-byte on-disk form.
    pub fn encode(&self) -> [u8; SIGNATURE_HEADER_SIZE as usize] {
        let mut header_data = [0u8; 20];
        header_data[0..8].copy_from_slice(&self.next_header_offset.to_le_bytes());
        header_data[8..16].copy_from_slice(&self.next_header_size.to_le_bytes());
        header_data[16..20].copy_from_slice(&self.next_header_crc.to_le_bytes());
        let crc = crc32fast::hash(&header_data);

        let mut out = [0u8; 32];
        out[0..6].copy_from_slice(SIGNATURE);
        out[6] = self.version_major;
        out[7] = self.version_minor;
        out[8..12].copy_from_slice(&crc.to_le_bytes());
        out[12..32].copy_from_slice(&header_data);
        out
    }

    /// Returns the byte position where the next (end) header starts,
    /// relative to the beginning of the volume.
    pub fn next_header_position(&self) -> u64 {
        SIGNATURE_HEADER_SIZE + self.next_header_offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn create_valid_header(offset: u64, size: u64, next_crc: u32) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&[0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C]);
        data.push(0x00);
        data.push(0x04);

        let mut header_data = Vec::new();
        header_data.extend_from_slice(&offset.to_le_bytes());
        header_data.extend_from_slice(&size.to_le_bytes());
        header_data.extend_from_slice(&next_crc.to_le_bytes());

        let crc = crc32fast::hash(&header_data);
        data.extend_from_slice(&crc.to_le_bytes());
        data.extend_from_slice(&header_data);

        data
    }

    #[test]
    fn test_valid_start_header() {
        let data = create_valid_header(100, 50, 0xDEADBEEF);
        let mut cursor = Cursor::new(&data);

        let header = StartHeader::parse(&mut cursor).unwrap();
        assert_eq!(header.version_major, 0);
        assert_eq!(header.version_minor, 4);
        assert_eq!(header.next_header_offset, 100);
        assert_eq!(header.next_header_size, 50);
        assert_eq!(header.next_header_crc, 0xDEADBEEF);
    }

    #[test]
    fn test_invalid_signature() {
        let mut data = create_valid_header(100, 50, 0);
        data[0] = 0x00;

        let mut cursor = Cursor::new(&data);
        let err = StartHeader::parse(&mut cursor).unwrap_err();
        assert!(matches!(err, Error::BadSignature));
    }

    #[test]
    fn test_crc_mismatch() {
        let mut data = create_valid_header(100, 50, 0);
        data[12] = 0xFF;

        let mut cursor = Cursor::new(&data);
        let err = StartHeader::parse(&mut cursor).unwrap_err();
        assert!(matches!(err, Error::BadHeaderCrc { .. }));
    }

    #[test]
    fn test_truncated_header() {
        let data = [0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C, 0x00];

        let mut cursor = Cursor::new(&data);
        let err = StartHeader::parse(&mut cursor).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_next_header_position() {
        let data = create_valid_header(100, 50, 0);
        let mut cursor = Cursor::new(&data);

        let header = StartHeader::parse(&mut cursor).unwrap();
        assert_eq!(header.next_header_position(), 32 + 100);
    }

    #[test]
    fn test_empty_archive() {
        let data = create_valid_header(0, 0, 0);
        let mut cursor = Cursor::new(&data);

        let header = StartHeader::parse(&mut cursor).unwrap();
        assert_eq!(header.next_header_size, 0);
    }

    #[test]
    fn test_roundtrip_encode_parse() {
        let header = StartHeader {
            version_major: 0,
            version_minor: 4,
            start_header_crc: 0, // recomputed by encode()
            next_header_offset: 12345,
            next_header_size: 678,
            next_header_crc: 0xABCDEF01,
        };
        let bytes = header.encode();
        let mut cursor = Cursor::new(bytes);
        let parsed = StartHeader::parse(&mut cursor).unwrap();
        assert_eq!(parsed.next_header_offset, 12345);
        assert_eq!(parsed.next_header_size, 678);
        assert_eq!(parsed.next_header_crc, 0xABCDEF01);
    }
}
