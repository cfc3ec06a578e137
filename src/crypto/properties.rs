//! Wire encoding for the AES coder-chain properties block.
//!
//! This is the bit-packed layout the canonical 7z AES-256-SHA256 coder uses
//! for its properties bytes. This engine reuses the layout (so the archive
//! remains parseable by tooling that understands the AES coder property
//! format) while deriving the key differently — see [`super::derive_key`].

use crate::error::{Error, Result};

/// Parsed AES coder properties: iteration count exponent, salt, and IV.
#[derive(Debug, Clone)]
pub struct AesProperties {
    /// log2 of the PBKDF2 iteration count. This engine always writes
    /// [`super::NUM_CYCLES_POWER`] (18, i.e. 262,144 iterations).
    pub num_cycles_power: u8,
    /// Salt for key derivation (0-16 bytes).
    pub salt: Vec<u8>,
    /// Initialization vector, zero-padded to 16 bytes.
    pub iv: Vec<u8>,
}

impl AesProperties {
    /// Parses AES properties from the coder property bytes.
    ///
    /// Layout:
    /// - Byte 0: `(salt_flag << 7) | (iv_flag << 6) | num_cycles_power`
    /// - Byte 1: `(salt_size_extra << 4) | iv_size_extra`
    /// - Remaining bytes: salt followed by IV
    ///
    /// where `salt_size = salt_flag + salt_size_extra` (0 if `salt_flag` is
    /// unset), and likewise for `iv_size`.
    pub fn parse(properties: &[u8]) -> Result<Self> {
        if properties.len() < 2 {
            return Err(Error::MalformedArchive(
                "AES properties too short (need at least 2 bytes)".into(),
            ));
        }

        let first_byte = properties[0];
        let second_byte = properties[1];

        let num_cycles_power = first_byte & 0x3F;
        let salt_flag = (first_byte >> 7) & 1;
        let iv_flag = (first_byte >> 6) & 1;

        let salt_size_extra = (second_byte >> 4) & 0x0F;
        let iv_size_extra = second_byte & 0x0F;

        let salt_size = if salt_flag == 1 {
            (1 + salt_size_extra) as usize
        } else {
            0
        };
        let iv_size = if iv_flag == 1 {
            (1 + iv_size_extra) as usize
        } else {
            0
        };

        let data_start = 2;
        let salt_end = data_start + salt_size;
        let iv_end = salt_end + iv_size;

        if properties.len() < iv_end {
            return Err(Error::MalformedArchive(format!(
                "AES properties too short: expected {iv_end} bytes, got {}",
                properties.len()
            )));
        }

        let salt = properties[data_start..salt_end].to_vec();

        let mut iv = vec![0u8; 16];
        let iv_data = &properties[salt_end..iv_end];
        iv[..iv_data.len()].copy_from_slice(iv_data);

        Ok(Self {
            num_cycles_power,
            salt,
            iv,
        })
    }

    /// Encodes AES properties to their on-disk byte form.
    pub fn encode(num_cycles_power: u8, salt: &[u8], iv: &[u8]) -> Vec<u8> {
        let salt_size = salt.len().min(16);
        let iv_size = iv.len().min(16);

        let salt_flag = u8::from(salt_size > 0);
        let iv_flag = u8::from(iv_size > 0);

        let salt_size_extra = if salt_size > 0 { (salt_size - 1) as u8 } else { 0 };
        let iv_size_extra = if iv_size > 0 { (iv_size - 1) as u8 } else { 0 };

        let first_byte = (salt_flag << 7) | (iv_flag << 6) | (num_cycles_power & 0x3F);
        let second_byte = (salt_size_extra << 4) | iv_size_extra;

        let mut result = vec![first_byte, second_byte];
        result.extend_from_slice(&salt[..salt_size]);
        result.extend_from_slice(&iv[..iv_size]);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_properties() {
        let props = vec![0x12, 0x00]; // num_cycles_power = 18, no salt/IV
        let parsed = AesProperties::parse(&props).unwrap();
        assert_eq!(parsed.num_cycles_power, 18);
        assert!(parsed.salt.is_empty());
        assert_eq!(parsed.iv, vec![0u8; 16]);
    }

    #[test]
    fn parse_with_salt_and_iv() {
        let mut props = vec![0xD2, 0x7F]; // salt_flag=1, iv_flag=1, power=18
        props.extend_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]); // 8-byte salt
        props.extend_from_slice(&[
            9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24,
        ]); // 16-byte IV

        let parsed = AesProperties::parse(&props).unwrap();
        assert_eq!(parsed.num_cycles_power, 18);
        assert_eq!(parsed.salt, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(
            parsed.iv,
            vec![9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24]
        );
    }

    #[test]
    fn parse_too_short() {
        let props = vec![0x12];
        assert!(AesProperties::parse(&props).is_err());
    }

    #[test]
    fn encode_decode_roundtrip() {
        let salt = vec![1, 2, 3, 4];
        let iv = vec![5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16];
        let num_cycles_power = 18;

        let encoded = AesProperties::encode(num_cycles_power, &salt, &iv);
        let decoded = AesProperties::parse(&encoded).unwrap();

        assert_eq!(decoded.num_cycles_power, num_cycles_power);
        assert_eq!(decoded.salt, salt);
        let mut expected_iv = iv.clone();
        expected_iv.resize(16, 0);
        assert_eq!(decoded.iv, expected_iv);
    }
}
