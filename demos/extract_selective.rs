//! Inspect an archive's entries and extract subsets of it by name.
//!
//! Extraction always writes every entry in one pass; this demonstrates
//! building filtered views of an archive's contents by extracting once to a
//! scratch directory and then copying out entries that match a predicate.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example extract_selective -- archive.7z ./output
//! ```

use std::env;
use std::path::Path;
use sevenz_forensic::{Archive, ExtractOptions, Result};

fn copy_matching(
    scratch: &Path,
    dest: &Path,
    entries: &[sevenz_forensic::Entry],
    mut matches: impl FnMut(&sevenz_forensic::Entry) -> bool,
) -> std::io::Result<usize> {
    let mut copied = 0;
    for entry in entries {
        if entry.is_directory() || !matches(entry) {
            continue;
        }
        let src = scratch.join(&entry.name);
        let dst = dest.join(&entry.name);
        if let Some(parent) = dst.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(&src, &dst)?;
        copied += 1;
    }
    Ok(copied)
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: {} <archive.7z> <output_dir>", args[0]);
        std::process::exit(1);
    }

    let archive_path = &args[1];
    let output_dir = Path::new(&args[2]);

    println!("Opening archive: {}", archive_path);
    let mut archive = Archive::open(archive_path)?;

    println!("Archive contains {} entries:", archive.entries().len());
    for entry in archive.entries() {
        let type_indicator = if entry.is_directory() { "DIR " } else { "FILE" };
        println!("  [{}] {} ({} bytes)", type_indicator, entry.name, entry.size);
    }
    println!();

    let scratch = output_dir.join(".full");
    let result = archive.extract(&scratch, &ExtractOptions::new())?;
    println!(
        "Extracted {} files ({} bytes) to a scratch directory.",
        result.files_extracted, result.bytes_written
    );
    println!();

    let entries = archive.entries().to_vec();

    println!("Building view: only .txt files...");
    let txt_output = output_dir.join("txt_only");
    let count = copy_matching(&scratch, &txt_output, &entries, |e| e.name.ends_with(".txt"))?;
    println!("  {} .txt files copied to {}", count, txt_output.display());
    println!();

    println!("Building view: files larger than 100 bytes...");
    let large_output = output_dir.join("large_files");
    let count = copy_matching(&scratch, &large_output, &entries, |e| e.size > 100)?;
    println!("  {} large files copied to {}", count, large_output.display());
    println!();

    println!("Building view: all files except temporary-looking names...");
    let filtered_output = output_dir.join("filtered");
    let count = copy_matching(&scratch, &filtered_output, &entries, |e| {
        !e.name.ends_with(".tmp") && !e.name.ends_with(".bak") && !e.name.starts_with('.')
    })?;
    println!("  {} files copied to {}", count, filtered_output.display());

    println!();
    println!("Selective views complete!");

    Ok(())
}
