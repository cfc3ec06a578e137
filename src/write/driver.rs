//! Compression driver (component G): feeds a solid, concatenated run of
//! files through one LZMA2 (or Store) coder, optionally chained behind
//! AES-256-CBC, tracking per-file and folder-level CRCs over the plaintext
//! bytes as they go in.
//!
//! The driver never buffers a whole file in memory -- the container writer
//! streams each file's bytes through [`CompressionDriver::write_file_bytes`]
//! a chunk at a time (see [`crate::chunked::ChunkedInputStream`]).

use std::io::{self, Write};

use crate::checksum::{Crc32, Crc32Writer};
use crate::codec::{Lzma2Encoder, Lzma2EncoderOptions, Lzma2StoreEncoder};
#[cfg(feature = "parallel")]
use crate::codec::{ParallelLzma2Options, StreamingParallelLzma2Encoder};
use crate::crypto::{Aes256Encoder, Password};
use crate::error::Result;

/// Picks block-thread count from total input size, per the size table this
/// engine's threading policy is grounded on. Values are indicative, not
/// exact, and are capped by the number of available cores.
///
/// | Total input  | Block threads |
/// |--------------|---------------|
/// | < 1 MiB      | 1             |
/// | 1–10 MiB     | 2             |
/// | 10–50 MiB    | 4             |
/// | 50–500 MiB   | 8             |
/// | > 500 MiB    | 16            |
///
/// `lzma-rust2`'s LZMA2 encoder has no internal per-block multithreading,
/// so only the block-thread dimension of the table is realized here; the
/// "LZMA threads/block" column has no effect on a single-threaded coder.
pub fn threads_for_size(total_size: u64) -> usize {
    const MIB: u64 = 1024 * 1024;
    let table = if total_size < MIB {
        1
    } else if total_size < 10 * MIB {
        2
    } else if total_size < 50 * MIB {
        4
    } else if total_size < 500 * MIB {
        8
    } else {
        16
    };

    let available = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    table.min(available)
}

/// The byte sink the codec writes into: either the plain pack stream or an
/// AES-256-CBC-encrypted one. Either way, bytes flowing through here are
/// already compressed (or Store-framed); [`Crc32Writer`] is reused purely
/// for its running byte count, not its CRC.
///
/// The encrypted variant counts bytes twice: the outer [`Crc32Writer`] sees
/// the codec's raw compressed output (what the AES coder's bind pair in
/// the folder definition calls its unpack size), the inner one sees the
/// padded ciphertext that actually lands in the pack stream. The two
/// differ by up to 16 bytes of PKCS#7 padding.
pub enum DriverSink<W: Write + Send> {
    /// Unencrypted: compressed bytes go straight to the pack stream.
    Plain(Crc32Writer<W>),
    /// Encrypted: compressed bytes are AES-256-CBC encrypted before
    /// reaching the pack stream.
    Encrypted(Crc32Writer<Aes256Encoder<Crc32Writer<W>>>),
}

impl<W: Write + Send> DriverSink<W> {
    /// Finishes the sink (flushing any pending AES padding) and returns the
    /// wrapped writer, the number of compressed (pre-encryption) bytes
    /// produced, and the number of bytes actually written to the pack
    /// stream (equal to the former unless encrypted).
    fn finish(self) -> io::Result<(W, u64, u64)> {
        match self {
            DriverSink::Plain(w) => {
                let n = w.bytes_written();
                Ok((w.into_inner(), n, n))
            }
            DriverSink::Encrypted(outer) => {
                let compressed_len = outer.bytes_written();
                let inner = outer.into_inner().finish()?;
                let pack_stream_size = inner.bytes_written();
                Ok((inner.into_inner(), compressed_len, pack_stream_size))
            }
        }
    }
}

impl<W: Write + Send> Write for DriverSink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            DriverSink::Plain(w) => w.write(buf),
            DriverSink::Encrypted(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            DriverSink::Plain(w) => w.flush(),
            DriverSink::Encrypted(w) => w.flush(),
        }
    }
}

/// The codec wrapping [`DriverSink`]: a real LZMA2 encoder (serial or
/// block-parallel), or the Store-equivalent LZMA2 framing used at level 0.
enum Codec<W: Write + Send> {
    Compress(Lzma2Encoder<DriverSink<W>>),
    #[cfg(feature = "parallel")]
    CompressParallel(StreamingParallelLzma2Encoder<DriverSink<W>>),
    Store(Lzma2StoreEncoder<DriverSink<W>>),
}

impl<W: Write + Send> Write for Codec<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Codec::Compress(enc) => enc.write(buf),
            #[cfg(feature = "parallel")]
            Codec::CompressParallel(enc) => enc.write(buf),
            Codec::Store(enc) => enc.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Codec::Compress(enc) => enc.flush(),
            #[cfg(feature = "parallel")]
            Codec::CompressParallel(enc) => enc.flush(),
            Codec::Store(enc) => enc.flush(),
        }
    }
}

/// Final accounting for one folder's worth of compressed, concatenated
/// files: everything the container writer needs to build the folder's
/// [`crate::format::streams_info::Folder`]/`SubStreamsInfo` records.
pub struct FolderAccounting<W> {
    /// The sink, handed back so the container writer can keep writing to
    /// it (the next folder, the end header, ...).
    pub sink: W,
    /// Total uncompressed bytes across every file in the folder.
    pub folder_unpack_total: u64,
    /// CRC-32 of the folder's concatenated uncompressed bytes.
    pub folder_unpack_crc: u32,
    /// Size, in bytes, of the pack stream this folder produced (after
    /// compression and, if applicable, encryption).
    pub pack_stream_size: u64,
    /// Size, in bytes, of the codec's raw compressed output, before any
    /// encryption padding. Equal to `pack_stream_size` unless the folder
    /// is encrypted; this is the AES coder's unpack size in the folder's
    /// bind pair.
    pub compressed_len: u64,
    /// Per-file uncompressed sizes, in the order files were written.
    pub per_file_sizes: Vec<u64>,
    /// Per-file CRC-32s, in the order files were written.
    pub per_file_crcs: Vec<u32>,
    /// The LZMA2 coder's properties byte.
    pub lzma2_properties: Vec<u8>,
    /// The AES coder's properties block, if the folder is encrypted.
    pub aes_properties: Option<Vec<u8>>,
}

/// Drives one folder's worth of compression: a solid run of files, each
/// delimited by [`CompressionDriver::begin_file`]/[`CompressionDriver::end_file`],
/// compressed (and optionally encrypted) into a single pack stream.
pub struct CompressionDriver<W: Write + Send> {
    codec: Codec<W>,
    file_crc: Crc32,
    file_bytes: u64,
    folder_crc: Crc32,
    folder_bytes: u64,
    per_file_sizes: Vec<u64>,
    per_file_crcs: Vec<u32>,
    lzma2_properties: Vec<u8>,
    aes_properties: Option<Vec<u8>>,
}

impl<W: Write + Send> CompressionDriver<W> {
    /// Starts a new folder: `sink` is the destination the pack stream is
    /// written to, `level` is the LZMA2 preset (0 selects Store framing),
    /// `password` encrypts the pack stream with AES-256-CBC when given, and
    /// `threads` is the block-thread count (see [`threads_for_size`]) the
    /// block-parallel encoder should use; `1` keeps the serial encoder.
    pub fn new(sink: W, level: u32, password: Option<&Password>, threads: usize) -> Self {
        let crc_writer = Crc32Writer::new(sink);
        let (driver_sink, aes_properties) = match password {
            Some(password) => {
                let (encoder, properties) = Aes256Encoder::new(crc_writer, password);
                (DriverSink::Encrypted(Crc32Writer::new(encoder)), Some(properties))
            }
            None => (DriverSink::Plain(crc_writer), None),
        };

        let (codec, lzma2_properties) = if level == 0 {
            let properties = Lzma2StoreEncoder::<DriverSink<W>>::properties();
            (Codec::Store(Lzma2StoreEncoder::new(driver_sink)), properties)
        } else {
            #[cfg(feature = "parallel")]
            if threads > 1 {
                let options = ParallelLzma2Options::new().level(level).threads(threads);
                let properties = options.properties();
                let encoder = StreamingParallelLzma2Encoder::new(driver_sink, options);
                return Self::with_codec(Codec::CompressParallel(encoder), properties, aes_properties);
            }
            let _ = threads;

            let options = Lzma2EncoderOptions::with_preset(level);
            let properties = options.properties();
            (Codec::Compress(Lzma2Encoder::new(driver_sink, &options)), properties)
        };

        Self::with_codec(codec, lzma2_properties, aes_properties)
    }

    fn with_codec(codec: Codec<W>, lzma2_properties: Vec<u8>, aes_properties: Option<Vec<u8>>) -> Self {
        Self {
            codec,
            file_crc: Crc32::new(),
            file_bytes: 0,
            folder_crc: Crc32::new(),
            folder_bytes: 0,
            per_file_sizes: Vec::new(),
            per_file_crcs: Vec::new(),
            lzma2_properties,
            aes_properties,
        }
    }

    /// Starts a new file within the folder, resetting the per-file CRC and
    /// byte counter. The folder-level accounting is left untouched.
    pub fn begin_file(&mut self) {
        self.file_crc.reset();
        self.file_bytes = 0;
    }

    /// Feeds one chunk of a file's uncompressed bytes through the codec,
    /// updating both the per-file and folder-level CRC trackers.
    pub fn write_file_bytes(&mut self, buf: &[u8]) -> io::Result<()> {
        self.file_crc.update(buf);
        self.folder_crc.update(buf);
        self.file_bytes += buf.len() as u64;
        self.folder_bytes += buf.len() as u64;
        self.codec.write_all(buf)
    }

    /// Closes out the current file, recording its size and CRC into the
    /// folder's per-file accounting and returning them to the caller.
    pub fn end_file(&mut self) -> (u64, u32) {
        let size = self.file_bytes;
        let crc = self.file_crc.finalize();
        self.per_file_sizes.push(size);
        self.per_file_crcs.push(crc);
        (size, crc)
    }

    /// Finishes the folder: flushes the codec and, if encrypted, the AES
    /// padding, then returns the complete accounting plus the sink so the
    /// container writer can continue writing after the pack stream.
    pub fn finish(self) -> Result<FolderAccounting<W>> {
        let driver_sink = match self.codec {
            Codec::Compress(enc) => enc.finish_into_inner()?,
            #[cfg(feature = "parallel")]
            Codec::CompressParallel(enc) => enc.finish()?,
            Codec::Store(enc) => enc.finish()?,
        };
        let (sink, compressed_len, pack_stream_size) = driver_sink.finish()?;

        Ok(FolderAccounting {
            sink,
            folder_unpack_total: self.folder_bytes,
            folder_unpack_crc: self.folder_crc.finalize(),
            pack_stream_size,
            compressed_len,
            per_file_sizes: self.per_file_sizes,
            per_file_crcs: self.per_file_crcs,
            lzma2_properties: self.lzma2_properties,
            aes_properties: self.aes_properties,
        })
    }
}
