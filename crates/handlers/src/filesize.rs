//! Human-readable byte counts.

const UNITS: [&str; 7] = ["B", "KB", "MB", "GB", "TB", "PB", "EB"];

/// Formats `bytes` with binary multiples and at most two decimals.
///
/// ```rust
/// use handlers::filesize;
///
/// assert_eq!(filesize(512), "512 B");
/// assert_eq!(filesize(1536), "1.5 KB");
/// assert_eq!(filesize(4_831_838_208), "4.5 GB");
/// ```
pub fn filesize(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded} {}", UNITS[unit])
}
