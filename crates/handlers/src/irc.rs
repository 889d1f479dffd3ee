//! mIRC formatting codes.
//!
//! Color codes are always written with two digits so a following digit in
//! the text is never read as part of the code.

pub const BOLD: &str = "\x02";
pub const RESET: &str = "\x0F";
pub const UNDERLINE: &str = "\x1F";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Blue = 2,
    Green = 3,
    Red = 4,
    Maroon = 5,
    Purple = 6,
    Orange = 7,
    Yellow = 8,
    LightGreen = 9,
    Teal = 10,
    Cyan = 11,
    Pink = 13,
    Grey = 14,
    LightGrey = 15,
}

impl Color {
    /// The bare color code, without a trailing reset.
    pub fn code(self) -> String {
        format!("\x03{:02}", self as u8)
    }
}

/// `text` in `color`, followed by a reset.
pub fn paint(color: Color, text: impl std::fmt::Display) -> String {
    format!("{}{text}{RESET}", color.code())
}

/// Colored and bold, both ended by a single reset. Used for status words.
pub fn loud(color: Color, text: impl std::fmt::Display) -> String {
    format!("{}{BOLD}{text}{RESET}", color.code())
}

/// Bold on and off around `text`.
pub fn bold(text: impl std::fmt::Display) -> String {
    format!("{BOLD}{text}{BOLD}")
}

/// Blue underlined link.
pub fn link(url: &str) -> String {
    format!("{}{UNDERLINE}{url}{RESET}", Color::Blue.code())
}

/// `[service]` prefix in the given color.
pub fn tag(color: Color, service: &str) -> String {
    format!("[{}] ", paint(color, service))
}
