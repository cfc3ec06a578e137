//! Fuzz target for Archive::open with arbitrary byte input.
//!
//! Exercises the archive parsing code with potentially malformed or
//! adversarial input. The goal is to find panics, hangs, or memory issues
//! in the parsing logic -- not to get a successful open.
//!
//! Run with: cargo +nightly fuzz run archive_open

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Write;

fuzz_target!(|data: &[u8]| {
    let mut file = match tempfile::NamedTempFile::new() {
        Ok(f) => f,
        Err(_) => return,
    };
    if file.write_all(data).is_err() {
        return;
    }

    // We don't care about the result -- we're looking for panics or hangs.
    if let Ok(archive) = sevenz_forensic::Archive::open(file.path()) {
        for entry in archive.entries() {
            let _ = entry.name.as_str();
            let _ = entry.size;
            let _ = entry.crc;
            let _ = entry.is_directory();
            let _ = entry.is_empty_file();
        }
        let _ = archive.is_encrypted();
    }
});
