//! Archive-creation options: the builder the container writer (component
//! I) is configured with.

use crate::crypto::Password;

/// Default read-ceiling chunk size used while streaming file contents into
/// the compression driver.
pub const DEFAULT_CHUNK_SIZE: usize = crate::chunked::DEFAULT_CHUNK_CEILING;

/// Configuration for creating a new archive.
///
/// Every field has a sensible default via [`WriteOptions::new`]; use the
/// builder methods to override one at a time.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// LZMA2 preset level, 0 (Store) through 9 (Maximum). `None` means "let
    /// the entropy probe recommend one per file".
    pub level: Option<u32>,
    /// Split each volume at this many bytes; 0 means a single unsplit file.
    pub split_size: u64,
    /// Ceiling on a single read from an input file, in bytes.
    pub chunk_size: usize,
    /// Number of worker threads the parallel LZMA2 encoder may use. `None`
    /// defers to the size-based thread table.
    pub threads: Option<usize>,
    /// Password to encrypt the archive with, if any.
    pub password: Option<Password>,
    /// Whether to write (and honor, on restart) a checkpoint file so an
    /// interrupted run can resume.
    pub resumable: bool,
    /// Whether to store Unix permission bits / Windows attributes on each
    /// entry.
    pub preserve_attributes: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            level: None,
            split_size: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
            threads: None,
            password: None,
            resumable: false,
            preserve_attributes: true,
        }
    }
}

impl WriteOptions {
    /// Starts from the defaults: auto level, unsplit, not resumable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixes the compression level for every file, bypassing the entropy
    /// probe.
    pub fn with_level(mut self, level: u32) -> Self {
        self.level = Some(level.min(9));
        self
    }

    /// Splits the archive into volumes of at most `split_size` bytes.
    pub fn with_split_size(mut self, split_size: u64) -> Self {
        self.split_size = split_size;
        self
    }

    /// Overrides the per-read chunk ceiling.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Overrides the worker thread count.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads.max(1));
        self
    }

    /// Encrypts the archive with the given password.
    pub fn with_password(mut self, password: impl Into<Password>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Enables checkpoint-based resumability.
    pub fn resumable(mut self, resumable: bool) -> Self {
        self.resumable = resumable;
        self
    }

    /// Controls whether file attributes/permissions are recorded.
    pub fn preserve_attributes(mut self, preserve: bool) -> Self {
        self.preserve_attributes = preserve;
        self
    }
}
