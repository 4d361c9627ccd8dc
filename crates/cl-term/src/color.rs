// SPDX-License-Identifier: MIT
//
// Terminal colors.
//
// The chat front-end only ever emits foreground colors, and only in the
// three encodings every ANSI terminal understands: the default color,
// a 256-color palette index, and 24-bit RGB. Colors arrive from two
// places (the built-in style palette and the user's config file), so
// this module also owns the textual forms accepted in config:
//
//   "default"      → Color::Default
//   "212"          → Color::Ansi256(212)
//   "#ff87d7"      → Color::Rgb(255, 135, 215)
//   "pink"         → looked up in the named palette (cl-style)

use std::fmt;
use std::str::FromStr;

/// A terminal foreground color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    /// The terminal's default foreground (SGR 39).
    #[default]
    Default,
    /// A 256-color palette index (0–255).
    Ansi256(u8),
    /// 24-bit `TrueColor`.
    Rgb(u8, u8, u8),
}

impl Color {
    /// Parse a `#rrggbb` hex string.
    #[must_use]
    pub fn hex(s: &str) -> Option<Self> {
        let digits = s.strip_prefix('#')?;
        if digits.len() != 6 || !digits.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
        Some(Self::Rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

/// Error returned when a color string is not `default`, an index, or hex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseColorError(pub String);

impl fmt::Display for ParseColorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid color `{}`", self.0)
    }
}

impl std::error::Error for ParseColorError {}

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("default") {
            return Ok(Self::Default);
        }
        if s.starts_with('#') {
            return Self::hex(s).ok_or_else(|| ParseColorError(s.to_owned()));
        }
        s.parse::<u8>()
            .map(Self::Ansi256)
            .map_err(|_| ParseColorError(s.to_owned()))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
