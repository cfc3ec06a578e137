//! Uncompressed ("store") LZMA2 chunk framing.
//!
//! At compression level 0 the driver bypasses LZMA2's range coder entirely:
//! bytes are copied into the archive unmodified, but they still have to be
//! wrapped in valid LZMA2 chunks so that any conforming 7z reader can
//! decode them with its ordinary LZMA2 decoder. This is LZMA2's own
//! uncompressed-chunk type (control bytes `0x01`/`0x02`), not a distinct
//! Copy coder -- see [`crate::format::method_id`].
//!
//! Chunk layout: a control byte, a 2-byte big-endian `size - 1` field (so a
//! chunk holds 1-65536 bytes), then the raw bytes. The stream is terminated
//! by a single `0x00` byte.

use std::io::{self, Write};

use crate::codec::{method, Encoder};

/// Largest number of bytes an LZMA2 uncompressed chunk can hold.
const MAX_CHUNK_SIZE: usize = 1 << 16;

/// Writes raw bytes as a sequence of LZMA2 uncompressed chunks.
///
/// Used at compression level 0, where the driver wants LZMA2 framing
/// without LZMA2 compression.
pub struct Lzma2StoreEncoder<W: Write> {
    inner: W,
    dict_reset_pending: bool,
    finished: bool,
}

impl<W: Write> Lzma2StoreEncoder<W> {
    /// Wraps `inner`, ready to accept uncompressed bytes.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            dict_reset_pending: true,
            finished: false,
        }
    }

    /// The LZMA2 properties byte a decoder needs for this stream.
    ///
    /// Store chunks never reference the dictionary, but 7z still records a
    /// dictionary-size property for the folder's LZMA2 coder; any size is
    /// valid, so this reuses the smallest preset's encoding for a
    /// consistent, legible value.
    pub fn properties() -> Vec<u8> {
        crate::codec::lzma::Lzma2EncoderOptions::with_preset(0).properties()
    }

    fn write_chunk(&mut self, data: &[u8]) -> io::Result<()> {
        debug_assert!(!data.is_empty() && data.len() <= MAX_CHUNK_SIZE);
        let control = if self.dict_reset_pending { 0x01 } else { 0x02 };
        self.dict_reset_pending = false;
        let size_minus_one = (data.len() - 1) as u16;
        self.inner.write_all(&[control])?;
        self.inner.write_all(&size_minus_one.to_be_bytes())?;
        self.inner.write_all(data)?;
        Ok(())
    }

    /// Flushes any remaining chunk framing and the end-of-stream marker,
    /// returning the wrapped writer.
    pub fn finish(mut self) -> io::Result<W> {
        if !self.finished {
            self.inner.write_all(&[0x00])?;
            self.finished = true;
        }
        Ok(self.inner)
    }
}

impl<W: Write> Write for Lzma2StoreEncoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut remaining = buf;
        while !remaining.is_empty() {
            let take = remaining.len().min(MAX_CHUNK_SIZE);
            self.write_chunk(&remaining[..take])?;
            remaining = &remaining[take..];
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: Write + Send> Encoder for Lzma2StoreEncoder<W> {
    fn method_id(&self) -> &'static [u8] {
        method::LZMA2
    }

    fn finish(self: Box<Self>) -> io::Result<()> {
        (*self).finish().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::lzma::Lzma2Decoder;
    use std::io::Read;

    #[test]
    fn roundtrips_through_the_real_lzma2_decoder() {
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();

        let mut encoder = Lzma2StoreEncoder::new(Vec::new());
        encoder.write_all(&data).unwrap();
        let encoded = encoder.finish().unwrap();

        let properties = Lzma2StoreEncoder::<Vec<u8>>::properties();
        let mut decoder = Lzma2Decoder::new(&encoded[..], &properties).unwrap();
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).unwrap();

        assert_eq!(out, data);
    }

    #[test]
    fn empty_input_is_just_the_end_marker() {
        let encoder = Lzma2StoreEncoder::new(Vec::new());
        let encoded = encoder.finish().unwrap();
        assert_eq!(encoded, vec![0x00]);
    }
}
