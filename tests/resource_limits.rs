//! Tests for the extraction-time resource limits that guard against
//! decompression-bomb archives: per-entry size, compression ratio, and
//! running total bytes written.

mod common;

use sevenz_forensic::{ArchivePath, ExtractOptions, WriteOptions, Writer};
use tempfile::tempdir;

fn archive_with_one_file(dir: &std::path::Path, size: usize) -> std::path::PathBuf {
    let archive_path = dir.join("bomb.7z");
    let mut writer = Writer::create(&archive_path, WriteOptions::new()).unwrap();
    let data = vec![0u8; size];
    writer.add_bytes(ArchivePath::new("big.bin").unwrap(), &data).unwrap();
    writer.finish().unwrap();
    archive_path
}

#[test]
fn max_entry_bytes_rejects_an_oversized_entry() {
    let dir = tempdir().unwrap();
    let archive_path = archive_with_one_file(dir.path(), 100_000);

    let mut archive = sevenz_forensic::Archive::open(&archive_path).unwrap();
    let out_dir = tempdir().unwrap();
    let options = ExtractOptions::new().max_entry_bytes(1_000);

    let err = common::expect_err(archive.extract(out_dir.path(), &options));
    assert!(err.to_string().contains("resource limit"));
}

#[test]
fn max_total_bytes_rejects_once_the_running_total_is_exceeded() {
    let dir = tempdir().unwrap();
    let archive_path = dir.join("multi.7z");
    let mut writer = Writer::create(&archive_path, WriteOptions::new()).unwrap();
    writer.add_bytes(ArchivePath::new("a.bin").unwrap(), &vec![1u8; 5_000]).unwrap();
    writer.add_bytes(ArchivePath::new("b.bin").unwrap(), &vec![2u8; 5_000]).unwrap();
    writer.finish().unwrap();

    let mut archive = sevenz_forensic::Archive::open(&archive_path).unwrap();
    let out_dir = tempdir().unwrap();
    let options = ExtractOptions::new().max_total_bytes(6_000);

    let err = common::expect_err(archive.extract(out_dir.path(), &options));
    assert!(err.to_string().contains("resource limit"));
}

#[test]
fn default_options_have_no_resource_limits() {
    let dir = tempdir().unwrap();
    let archive_path = archive_with_one_file(dir.path(), 1_000_000);

    let mut archive = sevenz_forensic::Archive::open(&archive_path).unwrap();
    let out_dir = tempdir().unwrap();
    let result = archive.extract(out_dir.path(), &ExtractOptions::new()).unwrap();
    assert_eq!(result.bytes_written, 1_000_000);
}

#[test]
fn strict_path_safety_is_the_default() {
    assert_eq!(
        ExtractOptions::new().path_safety,
        sevenz_forensic::PathSafety::Strict
    );
}
