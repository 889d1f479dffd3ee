//! Text helpers shared by every handler.

/// Substituted for absent or empty text.
pub const PLACEHOLDER: &str = "(n/a)";

/// Formatting bytes that chat clients render as noise when they arrive in
/// user-supplied text: NUL, STX (bold), ETX (color), SI (reset), US
/// (underline), BEL and CR.
const STRIPPED: [char; 7] = ['\x00', '\x02', '\x03', '\x0F', '\x1F', '\x07', '\r'];

/// Cuts `text` down to a single chat line of at most `max_len` characters.
///
/// Absent or empty input becomes [`PLACEHOLDER`]. After stripping the
/// formatting bytes, multi-line text or text longer than `max_len` is reduced
/// to its first line, cut at `max_len - 2` characters (never below zero) and
/// suffixed with `...`.
///
/// Lengths count Unicode scalar values (`char`s), not UTF-16 code units.
///
/// ```rust
/// use dispatch::trim_text;
///
/// assert_eq!(trim_text(Some("line one\nline two"), 50), "line one...");
/// assert_eq!(trim_text(Some("short"), 50), "short");
/// assert_eq!(trim_text(None, 10), "(n/a)");
/// ```
pub fn trim_text(text: Option<&str>, max_len: usize) -> String {
    let source = match text {
        Some(t) if !t.is_empty() => t,
        _ => PLACEHOLDER,
    };
    let cleaned: String = source.chars().filter(|c| !STRIPPED.contains(c)).collect();

    let mut lines = cleaned.split('\n');
    let first_line = lines.next().unwrap_or_default();
    let multi_line = lines.next().is_some();

    if multi_line || cleaned.chars().count() > max_len {
        let keep = max_len.saturating_sub(2);
        let mut out: String = first_line.chars().take(keep).collect();
        out.push_str("...");
        return out;
    }
    first_line.to_string()
}
