//! Error types for archive operations.
//!
//! All fallible operations in this crate return [`Result<T>`]. The [`Error`]
//! enum groups the failure taxonomy laid out for the engine: caller-side
//! mistakes, I/O failures, structural parse errors on the read path, codec
//! failures, and the internal-invariant category that should never actually
//! trigger outside of a programming error.

use std::io;
use std::path::PathBuf;

/// The result type returned by all fallible operations in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for archive read, write, and volume operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Caller-side contract violation: a null path, an empty input list, a
    /// negative split size, or similar.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// An OS-level read/write/open failure, with the path at fault attached
    /// where one is known.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The path associated with the failing operation, if any.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A structural parse error encountered while reading or testing an
    /// archive. The concrete subtypes below are folded into this variant so
    /// callers can match on `reason` when they need the detail, while still
    /// treating the archive as unreadable.
    #[error("malformed archive: {0}")]
    MalformedArchive(String),

    /// A 7z variable-length number claimed more trailing bytes than were
    /// available.
    #[error("malformed variable-length number: {0}")]
    MalformedNumber(String),

    /// The 6-byte 7z magic was missing or did not match.
    #[error("bad signature: not a 7z archive")]
    BadSignature,

    /// A header CRC (start header or end header) did not match its recorded
    /// value.
    #[error("bad header CRC at {context}")]
    BadHeaderCrc {
        /// Which header failed verification.
        context: &'static str,
    },

    /// A per-file CRC recorded in SubStreamsInfo did not match the CRC
    /// recomputed from the decompressed bytes.
    #[error("bad CRC for file {index} ({name}): expected {expected:#010x}, got {actual:#010x}")]
    BadPerFileCrc {
        /// Index of the file within the file list.
        index: usize,
        /// Name of the file as recorded in the archive.
        name: String,
        /// CRC recorded in the archive.
        expected: u32,
        /// CRC recomputed from the decompressed bytes.
        actual: u32,
    },

    /// The archive ended before all the bytes its own header promised were
    /// available.
    #[error("truncated archive: {0}")]
    TruncatedArchive(String),

    /// A multi-volume input is missing one of the volumes its own signature
    /// header implies must exist.
    #[error("missing volume {index} for archive {base}")]
    MissingVolume {
        /// 1-based index of the missing volume.
        index: u32,
        /// Base path of the archive (without the `.NNN` suffix).
        base: PathBuf,
    },

    /// A read at an absolute offset past the end of a multi-volume input
    /// stream.
    #[error("offset {offset} is out of range (stream length {len})")]
    OffsetOutOfRange {
        /// The requested offset.
        offset: u64,
        /// Total length of the stream.
        len: u64,
    },

    /// The LZMA2 encoder failed during compression.
    #[error("compression failed: {0}")]
    CompressionFailed(String),

    /// The LZMA2 decoder failed during decompression.
    #[error("decompression failed: {0}")]
    DecompressionFailed(String),

    /// The archive is encrypted and a password was supplied, but the first
    /// decrypted block doesn't look like a valid LZMA2 chunk header. A
    /// correctly-keyed decrypt always starts with a byte in LZMA2's valid
    /// control-byte ranges; seeing a reserved byte there means the key
    /// derived from the password was wrong.
    #[error("wrong password")]
    WrongPassword,

    /// An internal invariant the container writer relies on did not hold
    /// (e.g. accounting returned by the compression driver disagreed with
    /// itself). This should be unreachable; if it fires, it is a bug in this
    /// crate, not a malformed input.
    #[error("inconsistent internal accounting: {0}")]
    InconsistentAccounting(String),

    /// The checkpoint file exists but could not be parsed, or does not match
    /// the archive path it was found next to.
    #[error("malformed checkpoint: {0}")]
    MalformedCheckpoint(String),

    /// An archive-supplied path failed [`crate::ArchivePath`] validation:
    /// absolute, containing `..`, a NUL byte, or otherwise unsafe to extract.
    #[error("invalid archive path: {0}")]
    InvalidArchivePath(String),

    /// A path-safety check rejected an entry's resolved extraction target as
    /// escaping the destination directory.
    #[error("entry {entry_index} would extract outside the destination directory: {path}")]
    PathTraversal {
        /// Index of the offending entry.
        entry_index: usize,
        /// The archive-recorded path that failed validation.
        path: String,
    },

    /// A symlink entry's target would resolve outside the destination
    /// directory.
    #[error("entry {entry_index} ({path}) has a symlink target that escapes the destination: {target}")]
    SymlinkTargetEscape {
        /// Index of the offending entry.
        entry_index: usize,
        /// The archive-recorded path of the symlink itself.
        path: String,
        /// The symlink's target, as recorded in the archive.
        target: String,
    },

    /// Extraction exceeded a configured resource limit (per-entry size,
    /// compression ratio, or total extracted bytes) -- a compression-bomb
    /// guard tripping, not a malformed archive.
    #[error("resource limit exceeded: {0}")]
    ResourceLimitExceeded(String),

    /// A requested capability (e.g. symlinks on an unsupported platform) is
    /// not available.
    #[error("unsupported: {feature}")]
    UnsupportedFeature {
        /// Description of the unavailable feature.
        feature: &'static str,
    },
}

impl Error {
    /// Wraps an [`io::Error`] with the path that was being operated on.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<io::Error> for Error {
    fn from(source: io::Error) -> Self {
        Error::Io {
            path: PathBuf::new(),
            source,
        }
    }
}
