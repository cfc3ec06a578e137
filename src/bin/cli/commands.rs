//! Command implementations for the CLI tool.

use std::path::{Component, Path, PathBuf};

use sevenz_forensic::{
    Archive, ArchivePath, ExtractOptions, Password, TestOptions, WriteOptions, Writer,
};
use walkdir::WalkDir;

use crate::exit_codes::{error_to_exit_code, ExitCode};
use crate::output::format_entry_table;
use crate::progress::LineProgress;

/// Options parsed out of the `compress` subcommand.
pub struct CompressArgs {
    pub archive_path: PathBuf,
    pub inputs: Vec<PathBuf>,
    pub level: Option<u32>,
    pub split_size: u64,
    pub chunk_size: Option<usize>,
    pub threads: Option<usize>,
    pub password: Option<String>,
    pub resume: bool,
    pub quiet: bool,
}

/// Turns a filesystem path into the `/`-separated form 7z archive paths use,
/// regardless of the host platform's native separator.
fn to_archive_path_string(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Walks one command-line input (a file or a directory tree) and returns
/// `(disk_path, archive_relative_path)` pairs in a stable order. Directory
/// inputs keep their own top-level name in the archive, matching how 7z's
/// own CLI roots a recursive add.
fn collect_inputs(input: &Path) -> std::io::Result<Vec<(PathBuf, PathBuf)>> {
    let mut out = Vec::new();
    let root_name = input
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    if input.is_dir() {
        for entry in WalkDir::new(input).sort_by_file_name() {
            let entry = entry?;
            if entry.file_type().is_dir() {
                continue;
            }
            let rel = entry.path().strip_prefix(input).unwrap_or(entry.path());
            out.push((entry.path().to_path_buf(), root_name.join(rel)));
        }
    } else {
        out.push((input.to_path_buf(), root_name));
    }
    Ok(out)
}

/// `compress` subcommand: streams every input file/directory into a new
/// archive at `archive_path`.
pub fn compress(args: &CompressArgs) -> ExitCode {
    let password = if args.password.is_some() {
        crate::password::resolve_password_with_confirmation(args.password.clone())
    } else {
        None
    };

    let mut options = WriteOptions::new()
        .with_split_size(args.split_size)
        .resumable(args.resume);
    if let Some(level) = args.level {
        options = options.with_level(level);
    }
    if let Some(chunk_size) = args.chunk_size {
        options = options.with_chunk_size(chunk_size);
    }
    if let Some(threads) = args.threads {
        options = options.with_threads(threads);
    }
    if let Some(password) = password.clone() {
        options = options.with_password(password);
    }

    let mut writer = match Writer::create(&args.archive_path, options) {
        Ok(w) => w,
        Err(e) => {
            eprintln!("error: creating {}: {e}", args.archive_path.display());
            return error_to_exit_code(&e);
        }
    };
    writer.set_progress(LineProgress::new(args.quiet));

    let mut any_added = false;
    for input in &args.inputs {
        let pairs = match collect_inputs(input) {
            Ok(pairs) => pairs,
            Err(e) => {
                eprintln!("error: reading {}: {e}", input.display());
                return ExitCode::IoError;
            }
        };

        for (disk_path, archive_rel) in pairs {
            let archive_path = match ArchivePath::new(&to_archive_path_string(&archive_rel)) {
                Ok(p) => p,
                Err(e) => {
                    eprintln!("warning: skipping {}: {e}", disk_path.display());
                    continue;
                }
            };
            if let Err(e) = writer.add_path(&disk_path, archive_path) {
                eprintln!("error: adding {}: {e}", disk_path.display());
                return error_to_exit_code(&e);
            }
            any_added = true;
        }
    }

    if !any_added {
        eprintln!("error: no files found among the given inputs");
        return ExitCode::BadArgs;
    }

    let result = match writer.finish() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: finishing archive: {e}");
            return error_to_exit_code(&e);
        }
    };

    if !args.quiet {
        println!(
            "wrote {} entries, {} -> {} ({:.1}% saved) across {} volume(s)",
            result.entries_written,
            sevenz_forensic::progress::format_bytes_iec(result.uncompressed_size),
            sevenz_forensic::progress::format_bytes_iec(result.compressed_size),
            result.space_savings() * 100.0,
            result.volume_sizes.len(),
        );
    }

    ExitCode::Success
}

/// `extract` subcommand.
pub fn extract(archive_path: &Path, out_dir: &Path, password: Option<String>, quiet: bool) -> ExitCode {
    let mut archive = match open_archive(archive_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let needs_password = archive.is_encrypted();
    let password = resolve_password(password, needs_password);

    let mut options = ExtractOptions::new();
    if let Some(password) = password {
        options = options.with_password(password);
    }

    archive.set_progress(LineProgress::new(quiet));

    match archive.extract(out_dir, &options) {
        Ok(result) => {
            if !quiet {
                println!(
                    "extracted {} files, {} written ({} directories created)",
                    result.files_extracted, result.bytes_written, result.directories_created
                );
            }
            ExitCode::Success
        }
        Err(e) => {
            eprintln!("error: {e}");
            error_to_exit_code(&e)
        }
    }
}

/// `test` subcommand: verifies every entry's CRC without writing to disk.
pub fn test(archive_path: &Path, password: Option<String>, quiet: bool) -> ExitCode {
    let mut archive = match open_archive(archive_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if !quiet {
        print!("{}", format_entry_table(archive.entries()));
    }

    let needs_password = archive.is_encrypted();
    let password = resolve_password(password, needs_password);

    let mut options = TestOptions::new();
    if let Some(password) = password {
        options = options.with_password(password);
    }

    match archive.test(&options) {
        Ok(result) => {
            if result.is_ok() {
                println!(
                    "OK: {} files tested, {} verified",
                    result.files_tested,
                    sevenz_forensic::progress::format_bytes_iec(result.bytes_verified)
                );
                ExitCode::Success
            } else {
                println!("FAILED: {} of {} files failed CRC verification", result.failures.len(), result.files_tested);
                for failure in &result.failures {
                    println!(
                        "  {} (index {}): expected {:08x}, got {:08x}",
                        failure.name, failure.index, failure.expected, failure.actual
                    );
                }
                ExitCode::BadArchive
            }
        }
        Err(e) => {
            eprintln!("error: {e}");
            error_to_exit_code(&e)
        }
    }
}

fn resolve_password(provided: Option<String>, needed: bool) -> Option<Password> {
    if provided.is_none() && !needed {
        return None;
    }
    crate::password::resolve_password(provided)
}

fn open_archive(path: &Path) -> Result<Archive, ExitCode> {
    Archive::open(path).map_err(|e| {
        eprintln!("error: opening {}: {e}", path.display());
        error_to_exit_code(&e)
    })
}
