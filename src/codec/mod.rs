//! Compression codec layer: the LZMA2 encoder/decoder this engine drives,
//! plus the [`Encoder`]/[`Decoder`] trait seams the compression driver
//! (component G) and container reader (component J) are built against.

pub mod lzma;
pub mod lzma2_store;

#[cfg(feature = "parallel")]
pub mod lzma2_parallel;

use std::io::{self, Read, Write};

/// A decoder that reads compressed data and produces uncompressed output.
pub trait Decoder: Read + Send {
    /// Returns the method ID for this decoder.
    fn method_id(&self) -> &'static [u8];
}

/// An encoder that takes uncompressed data and produces compressed output.
pub trait Encoder: Write + Send {
    /// Returns the method ID for this encoder.
    fn method_id(&self) -> &'static [u8];

    /// Finishes encoding and flushes any remaining data.
    fn finish(self: Box<Self>) -> io::Result<()>;
}

pub use lzma::{Lzma2Decoder, Lzma2Encoder, Lzma2EncoderOptions};
pub use lzma2_store::Lzma2StoreEncoder;

#[cfg(feature = "parallel")]
pub use lzma2_parallel::{
    Lzma2CompressionResult, ParallelLzma2Encoder, ParallelLzma2Options, StreamingParallelLzma2Encoder,
};

/// Method IDs this engine writes and recognizes on the codec boundary.
///
/// Mirrors [`crate::format::method_id`]; kept as a short byte-slice form
/// since that's what the [`Decoder`]/[`Encoder`] traits return.
pub mod method {
    /// LZMA2.
    pub const LZMA2: &[u8] = &[0x21];
}
