//! Extraction and verification options: the builder the container reader
//! (component J) is configured with.

use crate::crypto::Password;
use crate::safety::PathSafety;

/// Configuration for extracting an archive to disk.
///
/// Every field has a sensible default via [`ExtractOptions::new`]; use the
/// builder methods to override one at a time.
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Password to decrypt the archive with, if it is encrypted.
    pub password: Option<Password>,
    /// How strictly entry paths are validated against the destination
    /// directory before extraction.
    pub path_safety: PathSafety,
    /// Refuses to extract any single entry whose declared uncompressed
    /// size exceeds this many bytes.
    pub max_entry_bytes: u64,
    /// Refuses to extract an entry whose uncompressed size exceeds this
    /// multiple of the pack stream's size, guarding against compression
    /// bombs. `None` disables the check.
    pub max_ratio: Option<u32>,
    /// Refuses to extract once the running total of bytes written across
    /// the whole call exceeds this many bytes.
    pub max_total_bytes: u64,
}

impl ExtractOptions {
    /// Starts from the defaults: no password, strict path safety, no
    /// resource limits.
    pub fn new() -> Self {
        Self {
            password: None,
            path_safety: PathSafety::default(),
            max_entry_bytes: u64::MAX,
            max_ratio: None,
            max_total_bytes: u64::MAX,
        }
    }

    /// Decrypts the archive with the given password.
    pub fn with_password(mut self, password: impl Into<Password>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Overrides the path safety policy.
    pub fn path_safety(mut self, policy: PathSafety) -> Self {
        self.path_safety = policy;
        self
    }

    /// Caps the uncompressed size of any single extracted entry.
    pub fn max_entry_bytes(mut self, max: u64) -> Self {
        self.max_entry_bytes = max;
        self
    }

    /// Caps the uncompressed-to-packed size ratio tolerated for any entry.
    pub fn max_ratio(mut self, ratio: u32) -> Self {
        self.max_ratio = Some(ratio);
        self
    }

    /// Caps the total uncompressed bytes written across the whole call.
    pub fn max_total_bytes(mut self, max: u64) -> Self {
        self.max_total_bytes = max;
        self
    }
}

/// Configuration for testing an archive's integrity without writing any
/// file to disk.
#[derive(Debug, Clone, Default)]
pub struct TestOptions {
    /// Password to decrypt the archive with, if it is encrypted.
    pub password: Option<Password>,
}

impl TestOptions {
    /// Starts from the defaults: no password.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decrypts the archive with the given password while testing it.
    pub fn with_password(mut self, password: impl Into<Password>) -> Self {
        self.password = Some(password.into());
        self
    }
}
