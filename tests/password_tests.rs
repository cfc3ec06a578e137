//! Tests for AES-256-CBC encrypted archives: correct passwords must open and
//! decrypt cleanly, wrong or missing passwords must fail, never panic.

#![cfg(feature = "aes")]

mod common;

use sevenz_forensic::{ArchivePath, Error, ExtractOptions, TestOptions, WriteOptions, Writer};
use tempfile::tempdir;

fn secret_entries() -> Vec<(&'static str, &'static [u8])> {
    vec![
        ("secret.txt", b"this is secret content for encryption testing"),
        ("dir/nested_secret.bin", &[0xAB; 512]),
    ]
}

fn create_encrypted_archive(dir: &std::path::Path, name: &str, password: &str) -> std::path::PathBuf {
    let owned = secret_entries();
    let archive_path = dir.join(name);
    let options = WriteOptions::new().with_password(password.to_string());
    let mut writer = Writer::create(&archive_path, options).unwrap();
    for (path, data) in &owned {
        writer.add_bytes(ArchivePath::new(path).unwrap(), data).unwrap();
    }
    writer.finish().unwrap();
    archive_path
}

#[test]
fn correct_password_opens_and_verifies() {
    let dir = tempdir().unwrap();
    let archive_path = create_encrypted_archive(dir.path(), "enc.7z", "correct horse battery staple");
    common::verify_encrypted_archive(&archive_path, "correct horse battery staple", &secret_entries());
}

#[test]
fn wrong_password_is_rejected() {
    let dir = tempdir().unwrap();
    let archive_path = create_encrypted_archive(dir.path(), "enc.7z", "right-password");

    let mut archive = sevenz_forensic::Archive::open(&archive_path).unwrap();
    assert!(archive.is_encrypted());

    let err = common::expect_err(
        archive.test(&TestOptions::new().with_password("wrong-password".to_string())),
    );
    assert!(matches!(err, Error::WrongPassword));
}

#[test]
fn missing_password_on_encrypted_archive_is_rejected() {
    let dir = tempdir().unwrap();
    let archive_path = create_encrypted_archive(dir.path(), "enc.7z", "a-password");

    let mut archive = sevenz_forensic::Archive::open(&archive_path).unwrap();
    let out_dir = tempdir().unwrap();
    let err = common::expect_err(archive.extract(out_dir.path(), &ExtractOptions::new()));
    assert!(matches!(err, Error::InvalidParameter(_)));
}

#[test]
fn is_encrypted_is_false_for_plain_archives() {
    let dir = tempdir().unwrap();
    let archive_path = common::create_archive(dir.path(), "plain.7z", &[("file.txt", b"not secret")])
        .unwrap();
    let archive = sevenz_forensic::Archive::open(&archive_path).unwrap();
    assert!(!archive.is_encrypted());
}

#[test]
fn different_passwords_produce_different_pack_bytes() {
    let dir = tempdir().unwrap();
    let a = create_encrypted_archive(dir.path(), "a.7z", "password-one");
    let b = create_encrypted_archive(dir.path(), "b.7z", "password-two");

    let bytes_a = std::fs::read(&a).unwrap();
    let bytes_b = std::fs::read(&b).unwrap();
    assert_ne!(bytes_a, bytes_b);
}
