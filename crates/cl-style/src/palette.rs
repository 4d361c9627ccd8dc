//! Named colors for chat output.
//!
//! A small fixed palette of 256-color indices chosen to read well on both
//! dark and light terminals. Config files may name one of these, or give
//! any form [`Color`]'s `FromStr` accepts.

use cl_term::color::{Color, ParseColorError};

pub const GREEN: Color = Color::Ansi256(47);
pub const PINK: Color = Color::Ansi256(212);
pub const BLUE: Color = Color::Ansi256(75);
pub const GRAY: Color = Color::Ansi256(245);
pub const YELLOW: Color = Color::Ansi256(227);
pub const WHITE: Color = Color::Ansi256(255);

const NAMED: [(&str, Color); 6] = [
    ("green", GREEN),
    ("pink", PINK),
    ("blue", BLUE),
    ("gray", GRAY),
    ("yellow", YELLOW),
    ("white", WHITE),
];

/// Look up a palette color by name, case-insensitively.
#[must_use]
pub fn named(name: &str) -> Option<Color> {
    let name = name.trim();
    let name = if name.eq_ignore_ascii_case("grey") { "gray" } else { name };
    NAMED
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|&(_, c)| c)
}

/// Parse a color from config: a palette name, `default`, an index, or hex.
///
/// # Errors
///
/// Returns [`ParseColorError`] if `s` is none of those.
pub fn parse(s: &str) -> Result<Color, ParseColorError> {
    named(s).map_or_else(|| s.parse(), Ok)
}
