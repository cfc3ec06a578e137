//! Text progress reporting for CLI operations.
//!
//! No terminal-graphics dependency is pulled in for this -- the reporter
//! prints one line per entry as it starts, which is all a forensic batch
//! job piping output to a log file actually wants.

use sevenz_forensic::progress::{format_bytes_iec, ProgressReporter};

/// Prints one line per entry as it starts, and tracks a running total.
pub struct LineProgress {
    quiet: bool,
    entries_done: u64,
    bytes_done: u64,
}

impl LineProgress {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            entries_done: 0,
            bytes_done: 0,
        }
    }

    /// Entries and bytes seen so far, for a caller that wants a final tally.
    pub fn progress(&self) -> (u64, u64) {
        (self.entries_done, self.bytes_done)
    }
}

impl ProgressReporter for LineProgress {
    fn on_entry_start(&mut self, entry_name: &str, size: u64) {
        if !self.quiet {
            println!("  {entry_name} ({})", format_bytes_iec(size));
        }
    }

    fn on_entry_complete(&mut self, _entry_name: &str, success: bool) {
        if success {
            self.entries_done += 1;
        }
    }

    fn on_progress(&mut self, bytes_processed: u64, _total_bytes: u64) -> bool {
        self.bytes_done = bytes_processed;
        true
    }

    fn on_warning(&mut self, message: &str) {
        eprintln!("warning: {message}");
    }
}
