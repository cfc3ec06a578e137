//! Command-line front end for the forensic 7z archival engine.

mod commands;
mod exit_codes;
mod output;
mod password;
mod progress;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::CompressArgs;
use exit_codes::ExitCode;

/// A streaming 7z archival engine built for forensic-scale datasets.
#[derive(Parser)]
#[command(name = "sevenz-forensic")]
#[command(author, version, about = "Streaming 7z archival engine for forensic-scale workloads", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Creates a new archive from one or more files/directories.
    Compress {
        /// Path of the archive to create.
        archive: PathBuf,
        /// Files or directories to add.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// LZMA2 preset level, 0 (Store) through 9 (Maximum). Defaults to a
        /// per-archive entropy probe.
        #[arg(short = 'l', long)]
        level: Option<u32>,
        /// Splits the archive into volumes of this many bytes (0 disables
        /// splitting).
        #[arg(long, default_value_t = 0)]
        split_size: u64,
        /// Caps any single read from an input file to this many bytes.
        #[arg(long)]
        chunk_size: Option<usize>,
        /// Number of worker threads for the parallel LZMA2 encoder.
        #[arg(short = 't', long)]
        threads: Option<usize>,
        /// Encrypts the archive with this password.
        #[arg(short = 'p', long)]
        password: Option<String>,
        /// Encrypts the archive, prompting for a password if `--password`
        /// was not given.
        #[arg(long)]
        encrypt: bool,
        /// Writes a checkpoint file at each entry boundary so an
        /// interrupted run leaves a diagnosable progress record.
        #[arg(long)]
        resume: bool,
        /// Suppresses per-entry progress output.
        #[arg(short, long)]
        quiet: bool,
    },
    /// Extracts an archive to a destination directory.
    #[command(alias = "x")]
    Extract {
        /// Archive to extract.
        archive: PathBuf,
        /// Destination directory (created if missing).
        #[arg(default_value = ".")]
        out_dir: PathBuf,
        /// Password, if the archive is encrypted (prompted if omitted).
        #[arg(short = 'p', long)]
        password: Option<String>,
        /// Suppresses per-entry progress output.
        #[arg(short, long)]
        quiet: bool,
    },
    /// Verifies every entry's CRC without writing any file to disk.
    Test {
        /// Archive to test.
        archive: PathBuf,
        /// Password, if the archive is encrypted (prompted if omitted).
        #[arg(short = 'p', long)]
        password: Option<String>,
        /// Suppresses the entry listing before the test runs.
        #[arg(short, long)]
        quiet: bool,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let exit_code = match cli.command {
        Command::Compress {
            archive,
            inputs,
            level,
            split_size,
            chunk_size,
            threads,
            password,
            encrypt,
            resume,
            quiet,
        } => {
            let password = if encrypt {
                Some(password.unwrap_or_default())
            } else {
                password
            };
            commands::compress(&CompressArgs {
                archive_path: archive,
                inputs,
                level,
                split_size,
                chunk_size,
                threads,
                password,
                resume,
                quiet,
            })
        }
        Command::Extract {
            archive,
            out_dir,
            password,
            quiet,
        } => commands::extract(&archive, &out_dir, password, quiet),
        Command::Test {
            archive,
            password,
            quiet,
        } => commands::test(&archive, password, quiet),
    };

    std::process::exit(exit_code.code());
}
