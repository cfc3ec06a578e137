//! Human-readable output formatting for the `list`-style parts of the CLI.

use sevenz_forensic::progress::format_bytes_iec;
use sevenz_forensic::read::Entry;

/// Renders the entry table printed after a successful `extract`/`test`, and
/// by `compress --verbose` while streaming files in.
pub fn format_entry_table(entries: &[Entry]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:>12}  {:>19}  {:>10}  NAME\n", "SIZE", "MODIFIED", "CRC32"));

    let mut total_size = 0u64;
    let mut file_count = 0usize;
    let mut dir_count = 0usize;

    for entry in entries {
        if entry.is_directory() {
            dir_count += 1;
        } else {
            file_count += 1;
            total_size += entry.size;
        }

        let size_str = if entry.is_directory() {
            String::new()
        } else {
            format_bytes_iec(entry.size)
        };
        let mtime_str = entry
            .mtime
            .map(|ts| format_unix_secs(ts.as_unix_secs()))
            .unwrap_or_else(|| "-".to_string());
        let crc_str = entry
            .crc
            .map(|c| format!("{c:08x}"))
            .unwrap_or_else(|| "-".to_string());
        let suffix = if entry.is_directory() {
            "/"
        } else if entry.is_symlink() {
            " ->"
        } else {
            ""
        };

        out.push_str(&format!(
            "{:>12}  {:>19}  {:>10}  {}{}\n",
            size_str, mtime_str, crc_str, entry.name, suffix
        ));
    }

    out.push_str(&format!(
        "\n{file_count} files, {dir_count} directories, {} total\n",
        format_bytes_iec(total_size)
    ));
    out
}

fn format_unix_secs(secs: i64) -> String {
    if secs < 0 {
        return "-".to_string();
    }
    let secs = secs as u64;
    let days_since_epoch = secs / 86400;
    let time_of_day = secs % 86400;
    let (hours, minutes, seconds) = (time_of_day / 3600, (time_of_day % 3600) / 60, time_of_day % 60);

    let mut year = 1970i64;
    let mut remaining_days = days_since_epoch as i64;
    loop {
        let days_in_year = if is_leap_year(year) { 366 } else { 365 };
        if remaining_days < days_in_year {
            break;
        }
        remaining_days -= days_in_year;
        year += 1;
    }
    let (month, day) = day_of_year_to_month_day(remaining_days as u32, is_leap_year(year));

    format!("{year:04}-{month:02}-{day:02} {hours:02}:{minutes:02}:{seconds:02}")
}

fn is_leap_year(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

fn day_of_year_to_month_day(day_of_year: u32, leap: bool) -> (u32, u32) {
    const DAYS: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
    let mut remaining = day_of_year;
    for (i, &days) in DAYS.iter().enumerate() {
        let days = if leap && i == 1 { days + 1 } else { days };
        if remaining < days {
            return (i as u32 + 1, remaining + 1);
        }
        remaining -= days;
    }
    (12, 31)
}
