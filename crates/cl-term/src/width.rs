// SPDX-License-Identifier: MIT
//
// Display width of edited text.
//
// The line editor positions the cursor by arithmetic alone: it never asks
// the terminal where the cursor ended up. Every character therefore needs
// a definite width. Wide characters (CJK ideographs, fullwidth forms,
// most emoji) take two cells; everything else, including zero-width
// combining marks and control characters, takes one. Counting a combining
// mark as one cell over-estimates by a column, but it keeps the cursor
// index and the cell count in lockstep, which the editor relies on.

use unicode_width::UnicodeWidthChar;

/// Cells occupied by `ch` in the input line: 2 for wide characters, else 1.
#[inline]
#[must_use]
pub fn char_width(ch: char) -> usize {
    ch.width().unwrap_or(1).clamp(1, 2)
}

/// Total cells occupied by `chars`.
#[must_use]
pub fn str_width<I>(chars: I) -> usize
where
    I: IntoIterator<Item = char>,
{
    chars.into_iter().map(char_width).sum()
}

/// Row, counting from 0, that holds the last cell of `chars` once they are
/// written from column 0 of a terminal `width` columns wide.
///
/// A cell that would overflow a row starts the next one. Filling a row
/// exactly leaves the cursor on that row, as terminals defer the wrap
/// until the next character.
#[must_use]
pub fn last_row<I>(chars: I, width: usize) -> usize
where
    I: IntoIterator<Item = char>,
{
    let width = width.max(1);
    let (mut row, mut col) = (0, 0);
    for w in chars.into_iter().map(char_width) {
        if col > 0 && col + w > width {
            row += 1;
            col = 0;
        }
        col += w;
    }
    row
}

// ─── Tests ───────────────────────────────────────────────────────────────────
