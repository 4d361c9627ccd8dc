//! The shared terminal writer.
//!
//! Every animation frame and every styled chunk goes through one
//! [`Display`]. Each call builds its whole frame in an [`OutputBuffer`]
//! and writes it while holding the display's lock, so a loader frame and a
//! content chunk can never interleave half-written escape sequences.
//!
//! The display also owns the cursor-visibility flag. [`CursorGuard`] hides
//! the cursor for a scope and shows it again when dropped, whether the
//! scope ends normally, with an error, or because its future was dropped.
//!
//! A loading frame rewrites a line that may have wrapped onto several
//! rows. The display remembers how many rows the last loading (or scroll)
//! frame left the cursor below that line's start, measured at the width of
//! the moment, so the next frame can climb back up before erasing. Every
//! other write ends that line and forgets the count.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cl_term::ansi;
use cl_term::console::{Console, StdoutConsole};
use cl_term::output::OutputBuffer;
use cl_term::width::last_row;

struct Inner {
    console: Box<dyn Console>,
    cursor_hidden: bool,
    out: OutputBuffer,
    /// Rows between the start of the open line and the cursor.
    line_up: usize,
}

/// A cloneable handle to the locked console.
#[derive(Clone)]
pub struct Display {
    inner: Arc<Mutex<Inner>>,
}

impl Display {
    #[must_use]
    pub fn new(console: impl Console + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                console: Box::new(console),
                cursor_hidden: false,
                out: OutputBuffer::new(),
                line_up: 0,
            })),
        }
    }

    /// A display on standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(StdoutConsole)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Build a frame with `f` and write it in one call.
    fn frame(&self, f: impl FnOnce(&mut OutputBuffer) -> io::Result<()>) -> io::Result<()> {
        self.draw("", |out, _| f(out))
    }

    /// Build a frame with `f`, which is told how far the cursor sits below
    /// the start of the open line. `open_line` is the visible text the
    /// frame leaves unterminated at its end.
    fn draw(
        &self,
        open_line: &str,
        f: impl FnOnce(&mut OutputBuffer, usize) -> io::Result<()>,
    ) -> io::Result<()> {
        let mut guard = self.lock();
        let width = usize::from(guard.console.size().cols);
        let Inner {
            console,
            out,
            line_up,
            ..
        } = &mut *guard;
        out.clear();
        f(out, *line_up)?;
        out.flush_to(console.as_mut())?;
        *line_up = last_row(open_line.chars(), width);
        Ok(())
    }

    /// Write `s` as-is.
    ///
    /// # Errors
    ///
    /// Returns an error if the console write fails.
    pub fn write(&self, s: &str) -> io::Result<()> {
        if s.is_empty() {
            return Ok(());
        }
        self.frame(|out| {
            out.push_str(s);
            Ok(())
        })
    }

    /// Terminal width in columns.
    #[must_use]
    pub fn width(&self) -> u16 {
        self.lock().console.size().cols
    }

    /// Terminal height in rows.
    #[must_use]
    pub fn height(&self) -> u16 {
        self.lock().console.size().rows
    }

    #[must_use]
    pub fn cursor_hidden(&self) -> bool {
        self.lock().cursor_hidden
    }

    /// Hide the cursor. A no-op if already hidden or not a terminal.
    ///
    /// # Errors
    ///
    /// Returns an error if the console write fails.
    pub fn hide_cursor(&self) -> io::Result<()> {
        self.set_cursor_hidden(true)
    }

    /// Show the cursor. A no-op if already visible or not a terminal.
    ///
    /// # Errors
    ///
    /// Returns an error if the console write fails.
    pub fn show_cursor(&self) -> io::Result<()> {
        self.set_cursor_hidden(false)
    }

    fn set_cursor_hidden(&self, hidden: bool) -> io::Result<()> {
        let mut guard = self.lock();
        if guard.cursor_hidden == hidden || !guard.console.is_tty() {
            return Ok(());
        }
        let Inner { console, out, .. } = &mut *guard;
        out.clear();
        if hidden {
            ansi::cursor_hide(out)?;
        } else {
            ansi::cursor_show(out)?;
        }
        out.flush_to(console.as_mut())?;
        guard.cursor_hidden = hidden;
        Ok(())
    }

    /// Hide the cursor until the returned guard is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if hiding the cursor fails.
    pub fn hide_cursor_guard(&self) -> io::Result<CursorGuard> {
        self.hide_cursor()?;
        Ok(CursorGuard {
            display: self.clone(),
        })
    }

    /// Rewrite the loading line as `prompt` followed by `dots`.
    ///
    /// A line that fits on one row is erased in place. One that wrapped is
    /// climbed back to its first row and everything below is erased.
    ///
    /// # Errors
    ///
    /// Returns an error if the console write fails.
    pub fn loading_frame(&self, prompt: &str, dots: &str) -> io::Result<()> {
        let line = format!("{prompt}{dots}");
        self.draw(&line, |out, up| {
            out.push_str("\r");
            if up == 0 {
                ansi::erase_line(out)?;
            } else {
                ansi::cursor_up(out, up)?;
                ansi::erase_below(out)?;
            }
            out.push_str(&line);
            Ok(())
        })
    }

    /// Redraw the whole screen, top to bottom: `prefix` (if any) and a
    /// blank line, the preserved message (if any), then `content` and a
    /// style reset. The preserved message is followed by a blank line only
    /// when there is content after it.
    ///
    /// # Errors
    ///
    /// Returns an error if the console write fails.
    pub fn animated_update(
        &self,
        content: &str,
        preserved: Option<&str>,
        prefix: Option<&str>,
    ) -> io::Result<()> {
        self.frame(|out| {
            ansi::clear_screen(out)?;
            ansi::cursor_home(out)?;
            if let Some(prefix) = prefix {
                out.push_str(prefix.trim_end());
                out.push_str("\n\n");
            }
            if let Some(message) = preserved {
                out.push_str(message);
                if !content.is_empty() {
                    out.push_str("\n\n");
                }
            }
            out.push_str(content);
            ansi::reset(out)
        })
    }

    /// Redraw the screen as `lines`, one per row, followed by `prompt` on
    /// an open line. The next loading frame rewrites that prompt.
    ///
    /// # Errors
    ///
    /// Returns an error if the console write fails.
    pub fn scroll_frame(&self, lines: &[String], prompt: &str) -> io::Result<()> {
        self.draw(prompt, |out, _| {
            ansi::clear_screen(out)?;
            ansi::cursor_home(out)?;
            for line in lines {
                out.push_str(line);
                out.push_str("\n");
            }
            ansi::reset(out)?;
            out.push_str(prompt);
            Ok(())
        })
    }
}

/// Shows the cursor again when dropped.
#[must_use = "the cursor is shown again as soon as the guard is dropped"]
pub struct CursorGuard {
    display: Display,
}

impl Drop for CursorGuard {
    fn drop(&mut self) {
        if let Err(e) = self.display.show_cursor() {
            log::warn!("failed to restore cursor: {e}");
        }
    }
}
