//! Chunked input stream: a lazy, read-ceilinged byte sequence over one
//! file, with a progress tap on every call.
//!
//! The compression driver (component G) reads each input file through one
//! of these rather than `File` directly, so that a single file larger than
//! the configured ceiling never produces an oversized read into the
//! encoder, and so that progress reporting has a single choke point.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::progress::ProgressReporter;

/// Default read ceiling: no single `read()` call returns more than this
/// many bytes, regardless of the caller's buffer size.
pub const DEFAULT_CHUNK_CEILING: usize = 64 * 1024 * 1024;

/// A lazy byte sequence over one file, capped at a fixed read ceiling.
///
/// `Read::read` never returns more than `min(ceiling, buf.len())` bytes per
/// call. EOF is reported as a zero-length read. Not restartable once
/// exhausted; reopen the underlying file to read again.
pub struct ChunkedInputStream {
    file: File,
    path: PathBuf,
    ceiling: usize,
    total_size: u64,
    delivered: u64,
}

impl ChunkedInputStream {
    /// Opens `path` for chunked reading with the default 64 MiB ceiling.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_ceiling(path, DEFAULT_CHUNK_CEILING)
    }

    /// Opens `path` for chunked reading with an explicit read ceiling.
    pub fn with_ceiling(path: impl AsRef<Path>, ceiling: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| Error::io(&path, e))?;
        let total_size = file.metadata().map_err(|e| Error::io(&path, e))?.len();
        Ok(Self {
            file,
            path,
            ceiling: ceiling.max(1),
            total_size,
            delivered: 0,
        })
    }

    /// The file's total size, known up front from metadata.
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Cumulative bytes delivered so far.
    pub fn bytes_delivered(&self) -> u64 {
        self.delivered
    }

    /// The path this stream reads from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads up to `min(ceiling, buf.len())` bytes, reporting progress to
    /// `progress` on every call (including the terminal zero-length read).
    pub fn read_chunk(
        &mut self,
        buf: &mut [u8],
        progress: &mut dyn ProgressReporter,
    ) -> io::Result<usize> {
        let limit = buf.len().min(self.ceiling);
        let n = self.file.read(&mut buf[..limit])?;
        self.delivered += n as u64;
        progress.on_progress(self.delivered, self.total_size);
        Ok(n)
    }
}

impl Read for ChunkedInputStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let limit = buf.len().min(self.ceiling);
        let n = self.file.read(&mut buf[..limit])?;
        self.delivered += n as u64;
        Ok(n)
    }
}
