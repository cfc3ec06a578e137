//! AES-256-CBC encryption layer wrapping the byte sink produced by the
//! split output stream (component E), per spec component H.
//!
//! Key derivation deliberately departs from canonical 7z's SHA-256-iteration
//! scheme: this engine derives the AES key with PBKDF2-HMAC-SHA256 at a
//! fixed iteration count. See `DESIGN.md` for why. The on-disk coder
//! properties block ([`AesProperties`]) keeps the canonical bit layout so
//! the iteration count, salt, and IV still round-trip through the archive;
//! only the function that turns them into a key differs.

mod password;
mod properties;

use aes::Aes256;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::Hmac;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::Sha256;
use std::io::{self, Read, Write};

use crate::Result;

pub use password::Password;
pub use properties::AesProperties;

type Aes256CbcDec = cbc::Decryptor<Aes256>;
type Aes256CbcEnc = cbc::Encryptor<Aes256>;

/// AES block size in bytes.
const BLOCK_SIZE: usize = 16;

/// Fixed PBKDF2 iteration count this engine always uses: `2^18`.
pub const PBKDF2_ITERATIONS: u32 = 262_144;

/// `num_cycles_power` value this engine always writes to the coder
/// properties block (`2^18 == PBKDF2_ITERATIONS`).
pub const NUM_CYCLES_POWER: u8 = 18;

/// Derives a 32-byte AES-256 key from `password` and `salt` using
/// PBKDF2-HMAC-SHA256 with [`PBKDF2_ITERATIONS`] iterations.
pub fn derive_key(password: &Password, salt: &[u8]) -> [u8; 32] {
    let mut key = [0u8; 32];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ITERATIONS, &mut key);
    key
}

// Kept only to keep `hmac`/`Hmac<Sha256>` present as a named type alias,
// matching the crate's documented reliance on HMAC-SHA256 as the PBKDF2 PRF.
#[allow(dead_code)]
type HmacSha256 = Hmac<Sha256>;

/// Generates a cryptographically random 16-byte salt and 16-byte IV for a
/// new encrypted archive.
pub fn generate_salt_and_iv() -> ([u8; 16], [u8; 16]) {
    let mut salt = [0u8; 16];
    let mut iv = [0u8; 16];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut iv);
    (salt, iv)
}

/// AES-256-CBC decoder for reading an encrypted pack stream.
///
/// Reads ciphertext in 4 KiB block-aligned chunks, decrypts in place, and
/// hands plaintext back through [`Read`]. Does not itself strip PKCS#7
/// padding from the final block; callers that know the exact plaintext
/// length (as the container reader does, from `SubStreamsInfo`) simply stop
/// reading at that length and never observe the padding bytes.
pub struct Aes256Decoder<R> {
    inner: R,
    buffer: Vec<u8>,
    pos: usize,
    key: [u8; 32],
    iv: [u8; 16],
    finished: bool,
}

impl<R> std::fmt::Debug for Aes256Decoder<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aes256Decoder").finish_non_exhaustive()
    }
}

impl<R: Read + Send> Aes256Decoder<R> {
    /// Creates a decoder from the archive's AES coder properties and the
    /// candidate password.
    pub fn new(input: R, properties: &[u8], password: &Password) -> Result<Self> {
        let props = AesProperties::parse(properties)?;
        let key = derive_key(password, &props.salt);

        let mut iv = [0u8; 16];
        let iv_len = props.iv.len().min(16);
        iv[..iv_len].copy_from_slice(&props.iv[..iv_len]);

        Ok(Self::with_key_iv(input, key, iv))
    }

    /// Creates a decoder with an already-derived key and IV.
    pub fn with_key_iv(input: R, key: [u8; 32], iv: [u8; 16]) -> Self {
        Self {
            inner: input,
            buffer: Vec::new(),
            pos: 0,
            key,
            iv,
            finished: false,
        }
    }

    fn decrypt_buffer(&mut self) -> io::Result<()> {
        let mut encrypted = vec![0u8; 4096];
        let n = self.inner.read(&mut encrypted)?;

        if n == 0 {
            self.finished = true;
            return Ok(());
        }

        let aligned_len = (n / BLOCK_SIZE) * BLOCK_SIZE;
        if aligned_len == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "encrypted data not block-aligned",
            ));
        }
        encrypted.truncate(aligned_len);

        let next_iv: [u8; 16] = encrypted[encrypted.len() - BLOCK_SIZE..]
            .try_into()
            .expect("slice is exactly BLOCK_SIZE bytes after length check");

        let decryptor = Aes256CbcDec::new(&self.key.into(), &self.iv.into());
        let decrypted = decryptor
            .decrypt_padded_mut::<cbc::cipher::block_padding::NoPadding>(&mut encrypted)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

        self.iv = next_iv;
        self.buffer = decrypted.to_vec();
        self.pos = 0;
        Ok(())
    }

    /// Validates the password by decrypting the first block and checking
    /// whether it looks like an LZMA2 chunk header rather than garbage.
    ///
    /// An LZMA2 stream's first byte is a control byte: `0x00` (end marker),
    /// `0x01`/`0x02` (uncompressed chunk), or `0x80`-`0xFF` (compressed
    /// chunk). `0x03`-`0x7F` is reserved and never appears in a real
    /// stream, so seeing one there means the key is wrong. This can't
    /// prove the password is right -- a wrong key occasionally decrypts to
    /// a byte in the valid ranges by chance -- but it catches the
    /// overwhelming majority of wrong-password attempts before spending a
    /// full decompression pass on them.
    pub fn validate_first_block(&mut self) -> io::Result<bool> {
        if self.buffer.is_empty() && !self.finished {
            self.decrypt_buffer()?;
        }
        if self.buffer.is_empty() {
            return Ok(true);
        }
        Ok(validate_lzma2_control_byte(self.buffer[self.pos]))
    }
}

/// Checks whether `control` is a byte an LZMA2 stream could legitimately
/// start a chunk with. `0x03`-`0x7F` is reserved and unreachable from a
/// correctly-keyed decrypt.
fn validate_lzma2_control_byte(control: u8) -> bool {
    !(0x03..0x80).contains(&control)
}

impl<R: Read + Send> Read for Aes256Decoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos >= self.buffer.len() && !self.finished {
            self.decrypt_buffer()?;
        }
        if self.pos >= self.buffer.len() {
            return Ok(0);
        }

        let available = &self.buffer[self.pos..];
        let to_copy = available.len().min(buf.len());
        buf[..to_copy].copy_from_slice(&available[..to_copy]);
        self.pos += to_copy;
        Ok(to_copy)
    }
}

/// AES-256-CBC encoder wrapping a byte sink (§4.E's split output stream).
///
/// Buffers input until a full 16-byte block is available, encrypting
/// complete blocks as they accumulate. [`Aes256Encoder::finish`] applies
/// PKCS#7 padding to the final partial block (always at least one padding
/// byte) and flushes it.
pub struct Aes256Encoder<W> {
    inner: W,
    buffer: Vec<u8>,
    key: [u8; 32],
    iv: [u8; 16],
}

impl<W> std::fmt::Debug for Aes256Encoder<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aes256Encoder").finish_non_exhaustive()
    }
}

impl<W: Write + Send> Aes256Encoder<W> {
    /// Creates a new encoder, deriving the key from `password` and a fresh
    /// random salt/IV pair. Returns the encoder plus the properties block
    /// that must be recorded as the AES coder's properties in the end
    /// header.
    pub fn new(output: W, password: &Password) -> (Self, Vec<u8>) {
        let (salt, iv) = generate_salt_and_iv();
        let key = derive_key(password, &salt);
        let properties = AesProperties::encode(NUM_CYCLES_POWER, &salt, &iv);
        (Self::with_key_iv(output, key, iv), properties)
    }

    /// Creates an encoder with an already-derived key and IV.
    pub fn with_key_iv(output: W, key: [u8; 32], iv: [u8; 16]) -> Self {
        Self {
            inner: output,
            buffer: Vec::new(),
            key,
            iv,
        }
    }

    fn flush_buffer(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let complete_blocks = (self.buffer.len() / BLOCK_SIZE) * BLOCK_SIZE;
        if complete_blocks == 0 {
            return Ok(());
        }

        let mut to_encrypt = self.buffer[..complete_blocks].to_vec();
        let encryptor = Aes256CbcEnc::new(&self.key.into(), &self.iv.into());
        let encrypted = encryptor
            .encrypt_padded_mut::<cbc::cipher::block_padding::NoPadding>(
                &mut to_encrypt,
                complete_blocks,
            )
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

        self.inner.write_all(encrypted)?;
        self.iv
            .copy_from_slice(&encrypted[encrypted.len() - BLOCK_SIZE..]);
        self.buffer = self.buffer[complete_blocks..].to_vec();
        Ok(())
    }

    /// Applies PKCS#7 padding to the trailing partial block, encrypts it,
    /// and returns the wrapped sink.
    pub fn finish(mut self) -> io::Result<W> {
        self.flush_buffer()?;

        let pad_len = BLOCK_SIZE - (self.buffer.len() % BLOCK_SIZE);
        self.buffer
            .extend(std::iter::repeat_n(pad_len as u8, pad_len));

        let buffer_len = self.buffer.len();
        let encryptor = Aes256CbcEnc::new(&self.key.into(), &self.iv.into());
        let encrypted = encryptor
            .encrypt_padded_mut::<cbc::cipher::block_padding::NoPadding>(
                &mut self.buffer,
                buffer_len,
            )
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

        self.inner.write_all(encrypted)?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write + Send> Write for Aes256Encoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        if self.buffer.len() >= 4096 {
            self.flush_buffer()?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_buffer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn derive_key_is_deterministic_and_password_sensitive() {
        let password = Password::new("test");
        let salt = b"saltsalt";

        let key = derive_key(&password, salt);
        let key2 = derive_key(&password, salt);
        assert_eq!(key, key2);

        let other = derive_key(&Password::new("test2"), salt);
        assert_ne!(key, other);
    }

    #[test]
    fn aes_roundtrip() {
        let data = b"Hello, World! This is test data for AES encryption.";
        let key = [0u8; 32];
        let iv = [0u8; 16];

        let mut encrypted = Vec::new();
        {
            let mut encoder = Aes256Encoder::with_key_iv(Cursor::new(&mut encrypted), key, iv);
            encoder.write_all(data).unwrap();
            encoder.finish().unwrap();
        }

        let mut decoder = Aes256Decoder::with_key_iv(Cursor::new(&encrypted), key, iv);
        let mut decrypted = Vec::new();
        decoder.read_to_end(&mut decrypted).unwrap();

        // Caller knows the true plaintext length from SubStreamsInfo; here
        // we just strip PKCS#7 padding to check the roundtrip.
        if let Some(&pad_len) = decrypted.last() {
            if (pad_len as usize) <= BLOCK_SIZE {
                decrypted.truncate(decrypted.len() - pad_len as usize);
            }
        }
        assert_eq!(&decrypted[..], &data[..]);
    }

    #[test]
    fn wrong_password_derives_different_key() {
        let salt = b"0123456789abcdef";
        let right = derive_key(&Password::new("Hunter2"), salt);
        let wrong = derive_key(&Password::new("hunter2"), salt);
        assert_ne!(right, wrong);
    }

    #[test]
    fn generate_salt_and_iv_are_random_and_distinct() {
        let (salt1, iv1) = generate_salt_and_iv();
        let (salt2, iv2) = generate_salt_and_iv();
        assert_ne!(salt1, salt2);
        assert_ne!(iv1, iv2);
    }

    #[test]
    fn lzma2_control_byte_rejects_only_the_reserved_range() {
        assert!(validate_lzma2_control_byte(0x00));
        assert!(validate_lzma2_control_byte(0x01));
        assert!(validate_lzma2_control_byte(0x02));
        assert!(validate_lzma2_control_byte(0x80));
        assert!(validate_lzma2_control_byte(0xFF));
        assert!(!validate_lzma2_control_byte(0x03));
        assert!(!validate_lzma2_control_byte(0x7F));
    }

    #[test]
    fn validate_first_block_accepts_a_correctly_keyed_lzma2_stream() {
        let key = [7u8; 32];
        let iv = [9u8; 16];
        let data = [0x80u8, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07];

        let mut encrypted = Vec::new();
        let mut encoder = Aes256Encoder::with_key_iv(Cursor::new(&mut encrypted), key, iv);
        encoder.write_all(&data).unwrap();
        encoder.finish().unwrap();

        let mut decoder = Aes256Decoder::with_key_iv(Cursor::new(&encrypted), key, iv);
        assert!(decoder.validate_first_block().unwrap());
    }

    #[test]
    fn validate_first_block_rejects_a_decrypted_reserved_control_byte() {
        // A wrong key decrypts to unpredictable bytes; rather than rely on
        // one particular (key, ciphertext) pair landing in the reserved
        // range, plant a ciphertext block that decrypts -- under the key
        // this decoder is given -- to a byte inside it, by encrypting with
        // that exact plaintext under that exact key first.
        let key = [3u8; 32];
        let iv = [5u8; 16];
        let reserved_byte = [0x40u8; 16];

        let mut encrypted = Vec::new();
        let mut encoder = Aes256Encoder::with_key_iv(Cursor::new(&mut encrypted), key, iv);
        encoder.write_all(&reserved_byte).unwrap();
        encoder.finish().unwrap();

        let mut decoder = Aes256Decoder::with_key_iv(Cursor::new(&encrypted), key, iv);
        assert!(!decoder.validate_first_block().unwrap());
    }
}
