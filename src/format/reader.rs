//! Low-level binary reading utilities for 7z format parsing.
//!
//! Variable-length integer encoding lives in [`crate::numcodec`]; this module
//! covers the fixed-width and bit-vector primitives used around it in 7z
//! header parsing.

use std::io::{self, Read};

/// Reads an unsigned 32-bit little-endian integer.
pub fn read_u32_le<R: Read>(r: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Reads an unsigned 64-bit little-endian integer.
pub fn read_u64_le<R: Read>(r: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Reads a single byte.
pub fn read_u8<R: Read>(r: &mut R) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

/// Reads a boolean vector (bit array) of the specified length.
///
/// Each bit in the input bytes represents one boolean value.
/// Bits are read from MSB to LSB within each byte.
///
/// # Arguments
///
/// * `r` - The reader
/// * `count` - Number of boolean values to read
pub fn read_bool_vector<R: Read>(r: &mut R, count: usize) -> io::Result<Vec<bool>> {
    let byte_count = count.div_ceil(8);
    let mut bytes = vec![0u8; byte_count];
    r.read_exact(&mut bytes)?;

    let mut result = Vec::with_capacity(count);
    for i in 0..count {
        let byte_idx = i / 8;
        let bit_idx = 7 - (i % 8);
        result.push((bytes[byte_idx] >> bit_idx) & 1 != 0);
    }

    Ok(result)
}

/// Reads either an all-true vector or a bit vector based on a marker byte.
///
/// If the first byte is non-zero, returns a vector of all `true` values.
/// Otherwise, reads a bit vector from the remaining bytes.
///
/// This is used for optional property presence markers in 7z headers.
pub fn read_all_or_bits<R: Read>(r: &mut R, count: usize) -> io::Result<Vec<bool>> {
    let all_defined = read_u8(r)?;
    if all_defined != 0 {
        Ok(vec![true; count])
    } else {
        read_bool_vector(r, count)
    }
}

/// Reads exact number of bytes into a new vector.
pub fn read_bytes<R: Read>(r: &mut R, count: usize) -> io::Result<Vec<u8>> {
    let mut buf = vec![0u8; count];
    r.read_exact(&mut buf)?;
    Ok(buf)
}
