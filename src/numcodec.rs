//! 7z variable-length number encoding.
//!
//! 7z packs unsigned integers up to 64 bits into 1-9 bytes. The leading
//! 1-bits of the first byte (before the first 0-bit) count how many
//! additional little-endian bytes follow; the remaining low bits of the
//! first byte become the high bits of the value:
//!
//! - `0xxxxxxx` (1 byte): value 0-127
//! - `10xxxxxx` + 1 byte: value 0-16383
//! - `110xxxxx` + 2 bytes: value 0-2097151
//! - ...
//! - `11111110` + 7 bytes / `11111111` + 8 bytes: full `u64`
//!
//! Encoding always picks the shortest valid form, so `decode_7z_number(encode_7z_number(v))
//! == v` for every `v` and there is exactly one encoding for each value.

use std::io::{self, Read, Write};

use crate::error::{Error, Result};

/// Encodes `value` into its minimal 7z variable-length representation.
pub fn encode_7z_number(value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(9);
    write_7z_number(&mut out, value).expect("writing to a Vec cannot fail");
    out
}

/// Writes `value` to `w` using the 7z variable-length encoding.
pub fn write_7z_number<W: Write>(w: &mut W, value: u64) -> io::Result<()> {
    if value < 0x80 {
        return w.write_all(&[value as u8]);
    }
    if value < 0x4000 {
        let b0 = 0x80 | ((value >> 8) as u8 & 0x3F);
        return w.write_all(&[b0, value as u8]);
    }
    if value < 0x20_0000 {
        let b0 = 0xC0 | ((value >> 16) as u8 & 0x1F);
        return w.write_all(&[b0, value as u8, (value >> 8) as u8]);
    }
    if value < 0x1000_0000 {
        let b0 = 0xE0 | ((value >> 24) as u8 & 0x0F);
        return w.write_all(&[b0, value as u8, (value >> 8) as u8, (value >> 16) as u8]);
    }
    if value < 0x08_0000_0000 {
        let b0 = 0xF0 | ((value >> 32) as u8 & 0x07);
        return w.write_all(&[
            b0,
            value as u8,
            (value >> 8) as u8,
            (value >> 16) as u8,
            (value >> 24) as u8,
        ]);
    }
    if value < 0x0400_0000_0000 {
        let b0 = 0xF8 | ((value >> 40) as u8 & 0x03);
        return w.write_all(&[
            b0,
            value as u8,
            (value >> 8) as u8,
            (value >> 16) as u8,
            (value >> 24) as u8,
            (value >> 32) as u8,
        ]);
    }
    if value < 0x0002_0000_0000_0000 {
        let b0 = 0xFC | ((value >> 48) as u8 & 0x01);
        return w.write_all(&[
            b0,
            value as u8,
            (value >> 8) as u8,
            (value >> 16) as u8,
            (value >> 24) as u8,
            (value >> 32) as u8,
            (value >> 40) as u8,
        ]);
    }
    if value < 0x0100_0000_0000_0000 {
        return w.write_all(&[
            0xFE,
            value as u8,
            (value >> 8) as u8,
            (value >> 16) as u8,
            (value >> 24) as u8,
            (value >> 32) as u8,
            (value >> 40) as u8,
            (value >> 48) as u8,
        ]);
    }
    w.write_all(&[
        0xFF,
        value as u8,
        (value >> 8) as u8,
        (value >> 16) as u8,
        (value >> 24) as u8,
        (value >> 32) as u8,
        (value >> 40) as u8,
        (value >> 48) as u8,
        (value >> 56) as u8,
    ])
}

/// Decodes a 7z variable-length number from the front of `bytes`, returning
/// the value and the number of bytes consumed.
///
/// # Errors
///
/// Returns [`Error::MalformedNumber`] if `bytes` is empty or shorter than the
/// length the first byte promises.
pub fn decode_7z_number(bytes: &[u8]) -> Result<(u64, usize)> {
    let mut cursor = io::Cursor::new(bytes);
    let value = read_7z_number(&mut cursor)
        .map_err(|e| Error::MalformedNumber(format!("truncated number: {e}")))?;
    Ok((value, cursor.position() as usize))
}

/// Reads a 7z variable-length number from `r`.
pub fn read_7z_number<R: Read>(r: &mut R) -> io::Result<u64> {
    let mut first = [0u8; 1];
    r.read_exact(&mut first)?;
    let first = first[0] as u64;

    let mut mask = 0x80u64;
    let mut value = 0u64;

    for i in 0..8 {
        if (first & mask) == 0 {
            return Ok(value | ((first & (mask - 1)) << (8 * i)));
        }
        let mut byte = [0u8; 1];
        r.read_exact(&mut byte)?;
        value |= (byte[0] as u64) << (8 * i);
        mask >>= 1;
    }

    // All 8 high bits were set: the value occupies the full following 8 bytes.
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_boundary_values() {
        let values = [
            0u64,
            1,
            126,
            127,
            128,
            16383,
            16384,
            0x20_0000 - 1,
            0x20_0000,
            0x1000_0000 - 1,
            0x1000_0000,
            u32::MAX as u64,
            u64::MAX - 1,
            u64::MAX,
        ];
        for &v in &values {
            let encoded = encode_7z_number(v);
            let (decoded, consumed) = decode_7z_number(&encoded).unwrap();
            assert_eq!(decoded, v, "value {v}");
            assert_eq!(consumed, encoded.len(), "value {v}");
        }
    }

    #[test]
    fn encoding_is_minimal_length() {
        assert_eq!(encode_7z_number(0).len(), 1);
        assert_eq!(encode_7z_number(127).len(), 1);
        assert_eq!(encode_7z_number(128).len(), 2);
        assert_eq!(encode_7z_number(16383).len(), 2);
        assert_eq!(encode_7z_number(16384).len(), 3);
        assert_eq!(encode_7z_number(u64::MAX).len(), 9);
    }

    #[test]
    fn decode_rejects_truncated_input() {
        // First byte says one extra byte follows (10xxxxxx), but none is given.
        let err = decode_7z_number(&[0x80]).unwrap_err();
        assert!(matches!(err, Error::MalformedNumber(_)));

        let err = decode_7z_number(&[]).unwrap_err();
        assert!(matches!(err, Error::MalformedNumber(_)));
    }

    #[test]
    fn decode_consumes_only_its_own_bytes() {
        let mut buf = encode_7z_number(300);
        buf.extend_from_slice(&[0xAA, 0xBB]);
        let (value, consumed) = decode_7z_number(&buf).unwrap();
        assert_eq!(value, 300);
        assert_eq!(consumed, buf.len() - 2);
    }
}
