// SPDX-License-Identifier: MIT
//
// Output buffering.
//
// OutputBuffer accumulates all ANSI bytes of one redraw in memory so the
// whole update reaches the terminal in a single write. A line-editor redraw
// is a carriage return, a cursor-up, an erase, the prompt, the buffer and a
// final reposition: emitted piecemeal, the terminal can paint the erased
// state between two writes and the input line flickers. Emitted as one
// write, the user only ever sees the finished line.

use std::io::{self, Write};

use crate::console::Console;

/// A byte buffer that accumulates ANSI output for a single write.
///
/// Default capacity: 1 KB, enough for a prompt plus a few wrapped lines of input.
pub struct OutputBuffer {
    buf: Vec<u8>,
}

const DEFAULT_CAPACITY: usize = 1024;

impl OutputBuffer {
    /// Create an empty buffer with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(DEFAULT_CAPACITY),
        }
    }

    /// Number of bytes accumulated.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether the buffer is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The accumulated bytes (for testing and debugging).
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Append a string slice.
    #[inline]
    pub fn push_str(&mut self, s: &str) {
        self.buf.extend_from_slice(s.as_bytes());
    }

    /// Append a single character as UTF-8.
    #[inline]
    pub fn push_char(&mut self, ch: char) {
        let mut enc = [0u8; 4];
        self.buf.extend_from_slice(ch.encode_utf8(&mut enc).as_bytes());
    }

    /// Clear the buffer for reuse (keeps allocated capacity).
    #[inline]
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Write accumulated output to a console in one call and clear the buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the console write fails.
    pub fn flush_to(&mut self, console: &mut dyn Console) -> io::Result<()> {
        if !self.buf.is_empty() {
            console.write_bytes(&self.buf)?;
            self.buf.clear();
        }
        Ok(())
    }
}

impl Write for OutputBuffer {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        // Intentionally a no-op. Real flushing via flush_to().
        Ok(())
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
