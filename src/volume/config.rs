//! Configuration for the split output stream (component E).

use std::path::{Path, PathBuf};

/// Configuration for a (possibly split) output archive.
///
/// A `split_size` of `0` means "never split": [`VolumeConfig::volume_path`]
/// then returns `base_path` unsuffixed instead of the usual `.NNN` form.
///
/// # Example
///
/// ```rust
/// use sevenz_forensic::volume::VolumeConfig;
///
/// // Create config for 100 MB volumes
/// let config = VolumeConfig::new("archive.7z", 100 * 1024 * 1024);
///
/// // Get paths for each volume
/// assert_eq!(config.volume_path(1).to_str().unwrap(), "archive.7z.001");
/// assert_eq!(config.volume_path(2).to_str().unwrap(), "archive.7z.002");
///
/// // split_size = 0 means a single unsuffixed file
/// let single = VolumeConfig::new("archive.7z", 0);
/// assert_eq!(single.volume_path(1).to_str().unwrap(), "archive.7z");
/// ```
#[derive(Debug, Clone)]
pub struct VolumeConfig {
    /// Maximum size of each volume in bytes; `0` means never split.
    pub split_size: u64,
    /// Base path for volume files (without volume extension).
    base_path: PathBuf,
}

impl VolumeConfig {
    /// Creates a new volume configuration.
    ///
    /// # Arguments
    ///
    /// * `base_path` - Base path for the archive (e.g., "archive.7z")
    /// * `split_size` - Maximum size of each volume in bytes; `0` disables
    ///   splitting and always produces a single unsuffixed file
    ///
    /// # Example
    ///
    /// ```rust
    /// use sevenz_forensic::volume::VolumeConfig;
    ///
    /// // 50 MB volumes
    /// let config = VolumeConfig::new("backup.7z", 50 * 1024 * 1024);
    /// ```
    pub fn new(base_path: impl AsRef<Path>, split_size: u64) -> Self {
        Self {
            split_size,
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// Returns the base path for the archive.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Returns `true` if this configuration never splits (`split_size == 0`).
    pub fn is_unsplit(&self) -> bool {
        self.split_size == 0
    }

    /// Generates the path for a specific volume number.
    ///
    /// Volume numbers are 1-indexed and formatted with 3 digits (e.g., 001, 002),
    /// unless `split_size` is `0`, in which case every volume number maps to
    /// the bare `base_path`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use sevenz_forensic::volume::VolumeConfig;
    ///
    /// let config = VolumeConfig::new("data.7z", 1024 * 1024);
    /// assert_eq!(config.volume_path(1).to_str().unwrap(), "data.7z.001");
    /// assert_eq!(config.volume_path(10).to_str().unwrap(), "data.7z.010");
    /// assert_eq!(config.volume_path(100).to_str().unwrap(), "data.7z.100");
    /// ```
    pub fn volume_path(&self, volume_number: u32) -> PathBuf {
        if self.is_unsplit() {
            return self.base_path.clone();
        }
        let base_str = self.base_path.to_string_lossy();
        PathBuf::from(format!("{}.{:03}", base_str, volume_number))
    }

    /// Returns the split size in bytes (`0` means unsplit).
    pub fn split_size(&self) -> u64 {
        self.split_size
    }

    /// Creates a config with the default volume size (100 MB).
    pub fn with_default_size(base_path: impl AsRef<Path>) -> Self {
        Self::new(base_path, 100 * 1024 * 1024)
    }

    /// Creates a config that never splits, producing one unsuffixed file.
    pub fn unsplit(base_path: impl AsRef<Path>) -> Self {
        Self::new(base_path, 0)
    }

    /// Creates a config for DVD-sized volumes (~4.7 GB).
    pub fn dvd(base_path: impl AsRef<Path>) -> Self {
        Self::new(base_path, 4700 * 1024 * 1024) // 4700 MiB
    }

    /// Creates a config for CD-sized volumes (~700 MB).
    pub fn cd(base_path: impl AsRef<Path>) -> Self {
        Self::new(base_path, 700 * 1024 * 1024)
    }

    /// Creates a config for FAT32-compatible volumes (~4 GB).
    pub fn fat32(base_path: impl AsRef<Path>) -> Self {
        // FAT32 max file size is 4 GB - 1 byte
        Self::new(base_path, 4 * 1024 * 1024 * 1024 - 1)
    }
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            split_size: 0,
            base_path: PathBuf::from("archive.7z"),
        }
    }
}
