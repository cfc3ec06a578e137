//! Shared test utilities for integration tests.
//!
//! Each integration test file compiles as a separate crate and may only use
//! a subset of these helpers.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use sevenz_forensic::{ArchivePath, ExtractOptions, TestOptions, WriteOptions, WriteResult, Writer};
use tempfile::TempDir;

/// Creates a new archive at `dir/name` from `(archive_path, data)` pairs and
/// returns the archive path plus the writer's statistics.
pub fn create_archive_with_result(
    dir: &Path,
    name: &str,
    options: WriteOptions,
    entries: &[(&str, &[u8])],
) -> sevenz_forensic::Result<(PathBuf, WriteResult)> {
    let archive_path = dir.join(name);
    let mut writer = Writer::create(&archive_path, options)?;
    for (path, data) in entries {
        writer.add_bytes(ArchivePath::new(path)?, data)?;
    }
    let result = writer.finish()?;
    Ok((archive_path, result))
}

/// Convenience wrapper that discards the [`WriteResult`].
pub fn create_archive(
    dir: &Path,
    name: &str,
    entries: &[(&str, &[u8])],
) -> sevenz_forensic::Result<PathBuf> {
    create_archive_with_result(dir, name, WriteOptions::new(), entries).map(|(path, _)| path)
}

/// Extracts the error from a `Result`, panicking if it's `Ok`.
pub fn expect_err<T, E>(result: Result<T, E>) -> E {
    match result {
        Ok(_) => panic!("expected an error but got Ok"),
        Err(e) => e,
    }
}

/// Opens `archive_path`, tests every entry's CRC, extracts into a fresh
/// temporary directory, and compares each extracted file against
/// `expected_entries` byte-for-byte.
pub fn verify_archive_contents(archive_path: &Path, expected_entries: &[(&str, &[u8])]) {
    let mut archive =
        sevenz_forensic::Archive::open(archive_path).expect("failed to open archive");

    let test_result = archive
        .test(&TestOptions::new())
        .expect("archive test failed");
    assert!(
        test_result.is_ok(),
        "CRC verification failed: {:?}",
        test_result.failures
    );

    let file_count = expected_entries.len();
    let archive_file_count = archive.entries().iter().filter(|e| !e.is_directory()).count();
    assert_eq!(
        archive_file_count, file_count,
        "entry count mismatch: expected {file_count}, got {archive_file_count}"
    );

    let out_dir = TempDir::new().expect("failed to create temp dir");
    archive
        .extract(out_dir.path(), &ExtractOptions::new())
        .expect("extraction failed");

    for (name, expected_data) in expected_entries {
        let extracted_path = out_dir.path().join(name);
        let extracted = std::fs::read(&extracted_path)
            .unwrap_or_else(|e| panic!("failed to read extracted '{name}': {e}"));
        assert_eq!(&extracted[..], *expected_data, "content mismatch for '{name}'");
    }
}

/// Same as [`verify_archive_contents`] but decrypts with `password`.
#[cfg(feature = "aes")]
pub fn verify_encrypted_archive(archive_path: &Path, password: &str, expected_entries: &[(&str, &[u8])]) {
    let mut archive =
        sevenz_forensic::Archive::open(archive_path).expect("failed to open encrypted archive");

    let test_result = archive
        .test(&TestOptions::new().with_password(password.to_string()))
        .expect("archive test failed");
    assert!(
        test_result.is_ok(),
        "decryption failed with correct password: {:?}",
        test_result.failures
    );

    let out_dir = TempDir::new().expect("failed to create temp dir");
    archive
        .extract(
            out_dir.path(),
            &ExtractOptions::new().with_password(password.to_string()),
        )
        .expect("extraction failed");

    for (name, expected_data) in expected_entries {
        let extracted = std::fs::read(out_dir.path().join(name))
            .unwrap_or_else(|e| panic!("failed to read extracted '{name}': {e}"));
        assert_eq!(
            &extracted[..], *expected_data,
            "content mismatch for '{name}' after decryption"
        );
    }
}
