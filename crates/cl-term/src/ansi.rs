// SPDX-License-Identifier: MIT
//
// ANSI escape sequence generation.
//
// Pure functions that write escape sequences to any `impl Write`. No state,
// no decisions about when to emit; that's the line editor's and the
// display's job. This module just knows the byte-level encoding of every
// terminal command the chat front-end needs.
//
// Cursor movement is strictly relative (CUU/CUD/CUF/CUB). The line editor
// never knows its absolute row: it lives wherever the shell left the
// cursor, so every redraw is expressed as "up N, right M" from where the
// previous redraw ended.
//
// All functions return `io::Result` propagated from the underlying writer.
// In practice they never fail when writing to `OutputBuffer` (backed by a Vec).
use std::io::{self, Write};

use crate::color::Color;

/// SGR 0 as a string, for callers that build styled `String`s.
pub const RESET: &str = "\x1b[0m";

/// SGR 22;23 — bold off, italic off, color untouched.
pub const STYLE_OFF: &str = "\x1b[22;23m";

/// SGR 1 — bold on.
pub const BOLD: &str = "\x1b[1m";

/// SGR 3 — italic on.
pub const ITALIC: &str = "\x1b[3m";

// ─── Cursor ──────────────────────────────────────────────────────────────────

/// Hide the cursor (DECTCEM reset).
#[inline]
pub fn cursor_hide(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25l")
}

/// Show the cursor (DECTCEM set).
#[inline]
pub fn cursor_show(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25h")
}

/// Move the cursor to the top-left corner (CUP with no parameters).
#[inline]
pub fn cursor_home(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[H")
}

/// Move the cursor up `n` rows (CUU). `n == 0` writes nothing.
///
/// Most terminals treat `CSI 0 A` as `CSI 1 A`, so zero must be skipped
/// rather than encoded.
#[inline]
pub fn cursor_up(w: &mut impl Write, n: usize) -> io::Result<()> {
    if n == 0 {
        return Ok(());
    }
    write!(w, "\x1b[{n}A")
}

/// Move the cursor down `n` rows (CUD). `n == 0` writes nothing.
#[inline]
pub fn cursor_down(w: &mut impl Write, n: usize) -> io::Result<()> {
    if n == 0 {
        return Ok(());
    }
    write!(w, "\x1b[{n}B")
}

/// Move the cursor right `n` columns (CUF). `n == 0` writes nothing.
#[inline]
pub fn cursor_forward(w: &mut impl Write, n: usize) -> io::Result<()> {
    if n == 0 {
        return Ok(());
    }
    write!(w, "\x1b[{n}C")
}

/// Move the cursor left `n` columns (CUB). `n == 0` writes nothing.
#[inline]
pub fn cursor_back(w: &mut impl Write, n: usize) -> io::Result<()> {
    if n == 0 {
        return Ok(());
    }
    write!(w, "\x1b[{n}D")
}

// ─── Screen ──────────────────────────────────────────────────────────────────

/// Clear the entire screen (ED 2). Does not move the cursor.
#[inline]
pub fn clear_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[2J")
}

/// Erase from the cursor to the end of the screen (ED 0).
#[inline]
pub fn erase_below(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[0J")
}

/// Erase the whole current line (EL 2). Does not move the cursor.
#[inline]
pub fn erase_line(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[2K")
}

/// Reset all SGR attributes to terminal defaults (SGR 0).
#[inline]
pub fn reset(w: &mut impl Write) -> io::Result<()> {
    w.write_all(RESET.as_bytes())
}

// ─── Foreground Color ────────────────────────────────────────────────────────

/// Set the foreground (text) color.
///
/// Uses compact SGR codes for standard colors (30-37, 90-97), the 256-color
/// extended format for palette indices 16-255, and 24-bit `TrueColor` for RGB.
pub fn fg(w: &mut impl Write, color: Color) -> io::Result<()> {
    match color {
        Color::Default => w.write_all(b"\x1b[39m"),
        Color::Ansi256(idx) => {
            if idx < 8 {
                write!(w, "\x1b[{}m", 30 + u16::from(idx))
            } else if idx < 16 {
                write!(w, "\x1b[{}m", 82 + u16::from(idx))
            } else {
                write!(w, "\x1b[38;5;{idx}m")
            }
        }
        Color::Rgb(r, g, b) => write!(w, "\x1b[38;2;{r};{g};{b}m"),
    }
}

/// The foreground SGR sequence for `color` as an owned string.
#[must_use]
pub fn fg_string(color: Color) -> String {
    let mut buf = Vec::with_capacity(20);
    // Writing into a Vec cannot fail.
    let _ = fg(&mut buf, color);
    String::from_utf8(buf).unwrap_or_default()
}

// ─── Tests ───────────────────────────────────────────────────────────────────
