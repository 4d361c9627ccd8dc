//! Visible length of styled text.
//!
//! What the reader sees: every character except ANSI CSI sequences and the
//! box-drawing characters used for framed panels. Box characters are
//! excluded because panels are emitted verbatim and never take part in word
//! wrapping.
//!
//! Two measures exist. [`visible_length`] counts characters;
//! [`visible_width`] counts terminal cells, so a CJK ideograph is two.
//! Wrapping decisions use the width.

use std::borrow::Cow;
use std::sync::LazyLock;

use cl_term::width::char_width;
use regex::Regex;

/// Box-drawing characters passed through unstyled and never counted.
pub const BOX_CHARS: [char; 6] = ['─', '│', '╭', '╮', '╯', '╰'];

static CSI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-?]*[ -/]*[@-~]").unwrap_or_else(|e| unreachable!("{e}"))
});

/// A piece of styled text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// One complete CSI sequence.
    Escape(&'a str),
    /// Text between sequences. Never empty.
    Text(&'a str),
}

/// Split `s` into escape sequences and the text between them.
///
/// ```
/// use cl_style::visible::{Segment, segments};
///
/// assert_eq!(
///     segments("a\x1b[1mb"),
///     [Segment::Text("a"), Segment::Escape("\x1b[1m"), Segment::Text("b")]
/// );
/// ```
#[must_use]
pub fn segments(s: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut last = 0;
    for m in CSI.find_iter(s) {
        if m.start() > last {
            out.push(Segment::Text(&s[last..m.start()]));
        }
        out.push(Segment::Escape(m.as_str()));
        last = m.end();
    }
    if last < s.len() {
        out.push(Segment::Text(&s[last..]));
    }
    out
}

/// `s` with every CSI sequence removed.
#[must_use]
pub fn strip_ansi(s: &str) -> Cow<'_, str> {
    CSI.replace_all(s, "")
}

/// Whether `ch` is one of [`BOX_CHARS`].
#[must_use]
pub fn is_box_char(ch: char) -> bool {
    BOX_CHARS.contains(&ch)
}

/// Whether `s` contains any box-drawing character.
#[must_use]
pub fn has_box_chars(s: &str) -> bool {
    s.chars().any(is_box_char)
}

/// Number of visible characters in `s`.
///
/// ```
/// use cl_style::visible_length;
///
/// assert_eq!(visible_length("\x1b[38;5;212mhi\x1b[0m"), 2);
/// assert_eq!(visible_length("╭──╮"), 0);
/// ```
#[must_use]
pub fn visible_length(s: &str) -> usize {
    strip_ansi(s).chars().filter(|&c| !is_box_char(c)).count()
}

/// Terminal cells `s` occupies, escapes and box characters excluded.
#[must_use]
pub fn visible_width(s: &str) -> usize {
    strip_ansi(s)
        .chars()
        .filter(|&c| !is_box_char(c))
        .map(char_width)
        .sum()
}
