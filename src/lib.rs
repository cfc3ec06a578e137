//! # sevenz-forensic
//!
//! A streaming 7z archival engine built for forensic-scale datasets: millions
//! of files, terabyte-class volumes, and the need to verify -- not just
//! produce -- an archive's integrity.
//!
//! The format surface is deliberately narrow. This engine reads and writes a
//! single compression method (LZMA2, including an uncompressed "Store" mode
//! framed as LZMA2), optional AES-256-CBC encryption of the pack stream, and
//! 7z's multi-volume splitting. It does not implement the rest of the 7z
//! codec zoo (LZMA1, PPMd, BZip2, Deflate) or encoded headers -- see each
//! module's documentation for the exact boundary.
//!
//! ## Quick Start
//!
//! ### Extracting an archive
//!
//! ```rust,no_run
//! use sevenz_forensic::{Archive, ExtractOptions, Result};
//!
//! fn main() -> Result<()> {
//!     let mut archive = Archive::open("archive.7z")?;
//!     for entry in archive.entries() {
//!         println!("{}: {} bytes", entry.name, entry.size);
//!     }
//!     archive.extract("./output", &ExtractOptions::new())?;
//!     Ok(())
//! }
//! ```
//!
//! ### Creating an archive
//!
//! ```rust,no_run
//! use sevenz_forensic::{ArchivePath, WriteOptions, Writer, Result};
//!
//! fn main() -> Result<()> {
//!     let mut writer = Writer::create_path("new.7z")?;
//!     writer.add_path("file.txt", ArchivePath::new("file.txt")?)?;
//!     writer.add_bytes(ArchivePath::new("hello.txt")?, b"Hello, World!")?;
//!     let result = writer.finish()?;
//!     println!("wrote {} entries", result.entries_written);
//!     Ok(())
//! }
//! ```
//!
//! ### Password-protected archives
//!
//! ```rust,no_run
//! # #[cfg(feature = "aes")]
//! # fn run() -> sevenz_forensic::Result<()> {
//! use sevenz_forensic::{Archive, ExtractOptions, Password};
//!
//! let mut archive = Archive::open("encrypted.7z")?;
//! let options = ExtractOptions::new().with_password(Password::new("secret"));
//! archive.extract("./output", &options)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error handling
//!
//! Every fallible operation returns [`Result<T>`], an alias for
//! `std::result::Result<T, Error>`. [`Error`] is `#[non_exhaustive]`: match
//! on the variants you handle and fall through to a catch-all arm for the
//! rest, since new variants may be added in a minor release.
//!
//! ## Safety and resource limits
//!
//! Extraction never trusts the archive's own paths: [`safety::PathSafety`]
//! governs how strictly entry paths are validated against the destination
//! directory, and [`ExtractOptions`] exposes per-entry and total byte caps as
//! a guard against decompression bombs.
//!
//! ## Feature flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `aes` | Yes | AES-256-CBC encryption support |
//! | `parallel` | Yes | Splits large inputs into independent blocks compressed across a Rayon thread pool |
//! | `cli` | Yes | Builds the `sevenz-forensic` command-line tool |
//!
//! ## Minimum Supported Rust Version (MSRV)
//!
//! This crate requires **Rust 1.85** or later.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]

/// Default buffer size for read operations (8 KiB).
pub(crate) const READ_BUFFER_SIZE: usize = 8192;

pub mod archive_path;
pub mod checkpoint;
pub mod checksum;
pub mod chunked;
pub mod codec;
pub mod entropy;
pub mod error;
pub mod format;
pub mod numcodec;
pub mod progress;
pub mod read;
pub mod safety;
pub mod timestamp;
pub mod volume;
pub mod write;

#[cfg(feature = "aes")]
#[cfg_attr(docsrs, doc(cfg(feature = "aes")))]
pub mod crypto;

pub use archive_path::ArchivePath;
pub use checkpoint::{CheckpointManager, CheckpointRecord};
pub use error::{Error, Result};
pub use timestamp::Timestamp;

#[cfg(feature = "aes")]
pub use crypto::Password;

pub use read::{Archive, Entry, ExtractOptions, ExtractResult, TestFailure, TestOptions, TestResult};

pub use write::{WriteOptions, WriteResult, Writer};

pub use volume::{MultiVolumeReader, MultiVolumeWriter, VolumeConfig, VolumeReader};

pub use safety::{LimitedReader, PathSafety, validate_extract_path};

pub use progress::{
    AtomicProgress, NoProgress, ProgressReporter, ProgressState, StatisticsProgress,
    ThrottledProgress, progress_fn,
};

pub use entropy::{Recommendation, probe_bytes, probe_file};
