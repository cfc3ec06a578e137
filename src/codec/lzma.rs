//! LZMA2 codec: the only compression method this engine speaks, streaming
//! through the `lzma-rust2` crate rather than buffering a folder's bytes.

use crate::error::{Error, Result};
use std::io::{self, Read, Write};

use super::{Decoder, Encoder, method};

/// Decodes an LZMA2 dictionary-size property byte (0-40) into bytes.
///
/// Property `p` (even) means `2^(p/2 + 12)`; odd means `3 * 2^((p-1)/2 + 11)`;
/// 40 is the special case `0xFFFF_FFFF` (4 GiB - 1).
fn decode_lzma2_dict_size(prop: u8) -> Result<u32> {
    if prop > 40 {
        return Err(Error::MalformedArchive(format!(
            "invalid LZMA2 dictionary size property: {prop}"
        )));
    }
    if prop == 40 {
        return Ok(0xFFFF_FFFF);
    }
    let base_log = (prop as u32) / 2 + 12;
    let dict_size = if prop % 2 == 0 {
        1u32 << base_log
    } else {
        3u32 << (base_log - 1)
    };
    Ok(dict_size)
}

/// Encodes a dictionary size into its LZMA2 property byte, rounding up to
/// the nearest representable size.
pub fn encode_lzma2_dict_size(dict_size: u32) -> u8 {
    if dict_size == u32::MAX {
        return 40;
    }
    for prop in 0..=40u8 {
        if decode_lzma2_dict_size(prop).unwrap() >= dict_size {
            return prop;
        }
    }
    40
}

/// LZMA2 encoder options, derived from the compression level (0-9) chosen
/// by the caller or recommended by the entropy probe.
#[derive(Debug, Clone)]
pub struct Lzma2EncoderOptions {
    /// Compression preset level (0-9).
    pub preset: u32,
    /// Dictionary size in bytes; `None` uses the preset's default.
    pub dict_size: Option<u32>,
}

impl Default for Lzma2EncoderOptions {
    fn default() -> Self {
        Self {
            preset: 6,
            dict_size: None,
        }
    }
}

impl Lzma2EncoderOptions {
    /// Creates options at the given preset level, clamped to 0-9.
    pub fn with_preset(preset: u32) -> Self {
        Self {
            preset: preset.min(9),
            dict_size: None,
        }
    }

    /// Overrides the dictionary size.
    pub fn with_dict_size(mut self, dict_size: u32) -> Self {
        self.dict_size = Some(dict_size);
        self
    }

    fn to_lzma2_options(&self) -> lzma_rust2::Lzma2Options {
        let mut opts = lzma_rust2::Lzma2Options::with_preset(self.preset);
        if let Some(dict_size) = self.dict_size {
            opts.lzma_options.dict_size = dict_size;
        }
        opts
    }

    /// Returns the 1-byte LZMA2 coder properties (encoded dictionary size).
    pub fn properties(&self) -> Vec<u8> {
        let opts = self.to_lzma2_options();
        vec![encode_lzma2_dict_size(opts.lzma_options.dict_size)]
    }
}

/// Streaming LZMA2 decoder.
pub struct Lzma2Decoder<R> {
    inner: lzma_rust2::Lzma2Reader<R>,
}

impl<R> std::fmt::Debug for Lzma2Decoder<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lzma2Decoder").finish_non_exhaustive()
    }
}

impl<R: Read + Send> Lzma2Decoder<R> {
    /// Creates a decoder from the 1-byte LZMA2 coder properties recorded in
    /// the folder's coder definition.
    pub fn new(input: R, properties: &[u8]) -> Result<Self> {
        if properties.is_empty() {
            return Err(Error::MalformedArchive("LZMA2 properties missing".into()));
        }
        let dict_size = decode_lzma2_dict_size(properties[0])?;
        Ok(Self {
            inner: lzma_rust2::Lzma2Reader::new(input, dict_size, None),
        })
    }
}

impl<R: Read + Send> Read for Lzma2Decoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R: Read + Send> Decoder for Lzma2Decoder<R> {
    fn method_id(&self) -> &'static [u8] {
        method::LZMA2
    }
}

/// Streaming LZMA2 encoder: the codec the compression driver (component G)
/// feeds one solid, concatenated byte stream through.
pub struct Lzma2Encoder<W: Write> {
    inner: lzma_rust2::Lzma2Writer<W>,
}

impl<W: Write> std::fmt::Debug for Lzma2Encoder<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lzma2Encoder").finish_non_exhaustive()
    }
}

impl<W: Write + Send> Lzma2Encoder<W> {
    /// Creates a new LZMA2 encoder writing to `output`.
    pub fn new(output: W, options: &Lzma2EncoderOptions) -> Self {
        let lzma2_opts = options.to_lzma2_options();
        Self {
            inner: lzma_rust2::Lzma2Writer::new(output, lzma2_opts),
        }
    }

    /// Returns the 1-byte LZMA2 coder properties for `options`, the value
    /// the container writer records as the folder's coder attribute.
    pub fn properties(options: &Lzma2EncoderOptions) -> Vec<u8> {
        options.properties()
    }

    /// Finishes encoding, flushing any buffered input.
    pub fn try_finish(self) -> io::Result<()> {
        self.inner
            .finish()
            .map_err(|e| io::Error::other(e.to_string()))?;
        Ok(())
    }

    /// Finishes encoding and returns the wrapped writer, for callers (such
    /// as the compression driver) that need to keep writing to it
    /// afterward.
    pub fn finish_into_inner(self) -> io::Result<W> {
        self.inner
            .finish()
            .map_err(|e| io::Error::other(e.to_string()))
    }
}

impl<W: Write + Send> Write for Lzma2Encoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: Write + Send> Encoder for Lzma2Encoder<W> {
    fn method_id(&self) -> &'static [u8] {
        method::LZMA2
    }

    fn finish(self: Box<Self>) -> io::Result<()> {
        self.inner
            .finish()
            .map_err(|e| io::Error::other(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_lzma2_dict_size() {
        assert_eq!(decode_lzma2_dict_size(0).unwrap(), 4096);
        assert_eq!(decode_lzma2_dict_size(1).unwrap(), 6144);
        assert_eq!(decode_lzma2_dict_size(2).unwrap(), 8192);
        assert_eq!(decode_lzma2_dict_size(3).unwrap(), 12288);
        assert_eq!(decode_lzma2_dict_size(18).unwrap(), 2 * 1024 * 1024);
        assert_eq!(decode_lzma2_dict_size(40).unwrap(), 0xFFFF_FFFF);
    }

    #[test]
    fn test_decode_lzma2_dict_size_invalid() {
        assert!(decode_lzma2_dict_size(41).is_err());
        assert!(decode_lzma2_dict_size(255).is_err());
    }

    #[test]
    fn test_encode_lzma2_dict_size() {
        assert_eq!(encode_lzma2_dict_size(4096), 0);
        assert_eq!(encode_lzma2_dict_size(8192), 2);
        assert_eq!(encode_lzma2_dict_size(5000), 1);
        assert_eq!(encode_lzma2_dict_size(7000), 2);
        assert_eq!(encode_lzma2_dict_size(0xFFFF_FFFF), 40);
    }

    #[test]
    fn test_encode_decode_lzma2_roundtrip() {
        for dict_size in [4096u32, 8192, 1 << 20, 1 << 24] {
            let prop = encode_lzma2_dict_size(dict_size);
            let decoded = decode_lzma2_dict_size(prop).unwrap();
            assert!(decoded >= dict_size);
        }
    }

    #[test]
    fn test_lzma2_decoder_properties_missing() {
        use std::io::Cursor;
        let input = Cursor::new(Vec::<u8>::new());
        let err = Lzma2Decoder::new(input, &[]).unwrap_err();
        assert!(matches!(err, Error::MalformedArchive(_)));
    }

    #[test]
    fn test_lzma2_roundtrip_small_buffer() {
        use std::io::Cursor;

        let data = b"the quick brown fox jumps over the lazy dog, repeated. ".repeat(200);
        let options = Lzma2EncoderOptions::with_preset(1);
        let properties = Lzma2Encoder::<Vec<u8>>::properties(&options);

        let mut compressed = Vec::new();
        {
            let mut encoder = Lzma2Encoder::new(&mut compressed, &options);
            encoder.write_all(&data).unwrap();
            encoder.try_finish().unwrap();
        }

        let mut decoder = Lzma2Decoder::new(Cursor::new(compressed), &properties).unwrap();
        let mut decoded = Vec::new();
        decoder.read_to_end(&mut decoded).unwrap();
        assert_eq!(decoded, data);
    }
}
