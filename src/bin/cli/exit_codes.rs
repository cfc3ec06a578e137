//! Exit codes for the CLI tool.

use sevenz_forensic::Error;

/// Exit code constants.
pub const SUCCESS: i32 = 0;
/// Archive format error (corrupt/unreadable archive).
pub const BAD_ARCHIVE: i32 = 2;
/// Wrong password, or a password was required but none was supplied.
pub const WRONG_PASSWORD: i32 = 3;
/// I/O error (missing file, permission denied, missing volume, ...).
pub const IO_ERROR: i32 = 4;
/// A resource limit (entry size, ratio, total bytes) or a path-safety check
/// rejected the operation.
pub const REFUSED: i32 = 5;
/// Invalid command-line arguments.
pub const BAD_ARGS: i32 = 64;
/// Internal invariant violation -- a bug in this crate, not a bad input.
pub const INTERNAL_ERROR: i32 = 70;

/// Exit code enum for structured handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    BadArchive,
    WrongPassword,
    IoError,
    Refused,
    BadArgs,
    InternalError,
}

impl ExitCode {
    /// Returns the numeric process exit code.
    pub fn code(self) -> i32 {
        match self {
            Self::Success => SUCCESS,
            Self::BadArchive => BAD_ARCHIVE,
            Self::WrongPassword => WRONG_PASSWORD,
            Self::IoError => IO_ERROR,
            Self::Refused => REFUSED,
            Self::BadArgs => BAD_ARGS,
            Self::InternalError => INTERNAL_ERROR,
        }
    }
}

/// Maps a library error onto the exit code a script should see.
pub fn error_to_exit_code(error: &Error) -> ExitCode {
    match error {
        Error::Io { .. } | Error::MissingVolume { .. } | Error::OffsetOutOfRange { .. } => {
            ExitCode::IoError
        }
        Error::WrongPassword => ExitCode::WrongPassword,
        Error::BadSignature
        | Error::BadHeaderCrc { .. }
        | Error::BadPerFileCrc { .. }
        | Error::TruncatedArchive(_)
        | Error::MalformedArchive(_)
        | Error::MalformedNumber(_)
        | Error::MalformedCheckpoint(_)
        | Error::CompressionFailed(_)
        | Error::DecompressionFailed(_) => ExitCode::BadArchive,
        Error::PathTraversal { .. }
        | Error::SymlinkTargetEscape { .. }
        | Error::ResourceLimitExceeded(_) => ExitCode::Refused,
        Error::InvalidParameter(_) | Error::InvalidArchivePath(_) | Error::UnsupportedFeature { .. } => {
            ExitCode::BadArgs
        }
        Error::InconsistentAccounting(_) => ExitCode::InternalError,
        // Future variants -- required by #[non_exhaustive].
        _ => ExitCode::InternalError,
    }
}
