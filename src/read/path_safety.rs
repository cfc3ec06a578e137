//! Symlink-specific extraction safety.
//!
//! Entry path validation against the destination directory lives in
//! [`crate::safety::validate_extract_path`]; this module covers the one
//! thing specific to symlink entries: checking that the link's *target*
//! (not its own archive path) can't walk out of the extraction root, and
//! creating the link once validated.

use std::path::Path;

use crate::{Error, Result};

/// Validates that a symlink target doesn't escape the extraction directory.
///
/// This checks for:
/// - Absolute paths (always rejected)
/// - Path traversal sequences (..)
/// - Targets that would resolve outside the extraction directory
///
/// The validation uses `entry_path` (the path within the archive) to determine
/// how deep the symlink is within the extraction directory. This avoids issues
/// with absolute filesystem paths that could mask traversal attempts.
pub(crate) fn validate_symlink_target(
    entry_idx: usize,
    entry_path: &str,
    target: &str,
) -> Result<()> {
    // Reject absolute paths
    if target.starts_with('/') || target.starts_with('\\') {
        return Err(Error::SymlinkTargetEscape {
            entry_index: entry_idx,
            path: entry_path.to_string(),
            target: target.to_string(),
        });
    }

    // Reject Windows absolute paths (C:\, D:\, etc.)
    if target.len() >= 2 && target.chars().nth(1) == Some(':') {
        return Err(Error::SymlinkTargetEscape {
            entry_index: entry_idx,
            path: entry_path.to_string(),
            target: target.to_string(),
        });
    }

    // Calculate the depth of the symlink's parent directory within the archive.
    // For example, if entry_path is "subdir/link.txt", the parent is "subdir" at depth 1.
    // A symlink at the root level (entry_path = "link.txt") has depth 0.
    let entry_parent = Path::new(entry_path).parent().unwrap_or(Path::new(""));
    let initial_depth = entry_parent
        .components()
        .filter(|c| matches!(c, std::path::Component::Normal(_)))
        .count() as i32;

    // Trace through the target path, tracking depth relative to extraction root.
    // If depth goes negative, the target would escape the extraction directory.
    let mut depth = initial_depth;
    for component in Path::new(target).components() {
        match component {
            std::path::Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return Err(Error::SymlinkTargetEscape {
                        entry_index: entry_idx,
                        path: entry_path.to_string(),
                        target: target.to_string(),
                    });
                }
            }
            std::path::Component::Normal(_) => {
                depth += 1;
            }
            _ => {}
        }
    }

    Ok(())
}

/// Creates a symbolic link at the specified path pointing to the target.
#[cfg(unix)]
pub(crate) fn create_symlink(link_path: &Path, target: &str) -> Result<u64> {
    std::os::unix::fs::symlink(target, link_path)
        .map_err(|e| Error::io(link_path, e))?;
    Ok(0)
}

/// Creates a symbolic link at the specified path pointing to the target.
#[cfg(windows)]
pub(crate) fn create_symlink(link_path: &Path, target: &str) -> Result<u64> {
    // On Windows, we need to know if the target is a file or directory
    // Since we can't reliably determine this, try file symlink first
    // (which is more common), then fall back to directory symlink
    let target_path = link_path.parent().map(|p| p.join(target));

    // If target exists and is a directory, create a directory symlink
    if let Some(ref tp) = target_path {
        if tp.is_dir() {
            std::os::windows::fs::symlink_dir(target, link_path)
                .map_err(|e| Error::io(link_path, e))?;
            return Ok(0);
        }
    }

    // Default to file symlink
    std::os::windows::fs::symlink_file(target, link_path)
        .map_err(|e| Error::io(link_path, e))?;
    Ok(0)
}

/// Creates a symbolic link at the specified path pointing to the target.
#[cfg(not(any(unix, windows)))]
pub(crate) fn create_symlink(_link_path: &Path, _target: &str) -> Result<u64> {
    Err(Error::UnsupportedFeature {
        feature: "symbolic links on this platform",
    })
}
