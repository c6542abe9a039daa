//! Human-readable byte formatting.
//!
//! Sizes use binary multiples (1 KB = 1024 bytes) and are printed with two
//! decimal places, e.g. `1.50 KB`, `3.00 GB`.

/// Bytes in one kilobyte (binary).
pub const BYTES_PER_KB: u64 = 1024;
/// Bytes in one megabyte (binary).
pub const BYTES_PER_MB: u64 = 1024 * BYTES_PER_KB;
/// Bytes in one gigabyte (binary).
pub const BYTES_PER_GB: u64 = 1024 * BYTES_PER_MB;
/// Bytes in one terabyte (binary).
pub const BYTES_PER_TB: u64 = 1024 * BYTES_PER_GB;

/// Format a byte count, e.g. `512 B`, `1.50 KB`, `2.00 GB`.
pub fn format_bytes(bytes: u64) -> String {
    if bytes >= BYTES_PER_TB {
        format!("{:.2} TB", bytes as f64 / BYTES_PER_TB as f64)
    } else if bytes >= BYTES_PER_GB {
        format!("{:.2} GB", bytes as f64 / BYTES_PER_GB as f64)
    } else if bytes >= BYTES_PER_MB {
        format!("{:.2} MB", bytes as f64 / BYTES_PER_MB as f64)
    } else if bytes >= BYTES_PER_KB {
        format!("{:.2} KB", bytes as f64 / BYTES_PER_KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Format a transfer rate in bytes per second, e.g. `5.20 MB/s`.
///
/// Fractional and negative rates are truncated towards zero.
pub fn format_speed(bytes_per_sec: f64) -> String {
    let whole = if bytes_per_sec.is_finite() && bytes_per_sec > 0.0 {
        bytes_per_sec as u64
    } else {
        0
    };
    format!("{}/s", format_bytes(whole))
}
