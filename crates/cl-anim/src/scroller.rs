//! Scrolling the previous screen away.
//!
//! When a message is submitted, what was on screen moves up one row per
//! frame until only the submitted prompt is left at the top, where the
//! loading dots then take over. Lines that are already above the visible
//! area are not animated.
//!
//! Text containing box-drawing characters is split on newlines as is:
//! panels carry their own layout. Other lines are kept whole when they fit
//! and re-wrapped at word boundaries when they don't (after a resize, say),
//! with escape sequences travelling inside the word they precede.

use std::time::Duration;

use cl_style::visible::{has_box_chars, strip_ansi, visible_width};

use crate::AnimError;
use crate::display::Display;

/// The scroll-up animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scroller {
    /// Pause between frames.
    pub delay: Duration,
}

impl Default for Scroller {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(60),
        }
    }
}

impl Scroller {
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// `text` as screen rows `width` columns wide, trailing blank rows
    /// dropped.
    #[must_use]
    pub fn lines(text: &str, width: usize) -> Vec<String> {
        let mut lines: Vec<String> = if has_box_chars(text) {
            text.split('\n').map(str::to_owned).collect()
        } else {
            text.split('\n').flat_map(|line| rewrap(line, width)).collect()
        };
        while lines.last().is_some_and(|l| strip_ansi(l).trim().is_empty()) {
            lines.pop();
        }
        lines
    }

    /// Scroll `text` off the top of `display`, leaving `prompt` on an open
    /// line at the top.
    ///
    /// # Errors
    ///
    /// [`AnimError::Io`] if a frame cannot be written.
    pub async fn run(&self, display: &Display, text: &str, prompt: &str) -> Result<(), AnimError> {
        let _cursor = display.hide_cursor_guard()?;

        let lines = Self::lines(text, usize::from(display.width()));
        // One row stays free for the prompt.
        let visible = usize::from(display.height()).saturating_sub(1).max(1);
        let lines = &lines[lines.len().saturating_sub(visible)..];
        log::trace!("scrolling {} lines", lines.len());

        for first in 0..=lines.len() {
            if first > 0 {
                tokio::time::sleep(self.delay).await;
            }
            display.scroll_frame(&lines[first..], prompt)?;
        }
        Ok(())
    }
}

/// Split one line into rows of at most `width` cells at spaces. A word
/// wider than a row gets a row of its own.
fn rewrap(line: &str, width: usize) -> Vec<String> {
    if visible_width(line) <= width {
        return vec![line.to_owned()];
    }
    let mut rows = Vec::new();
    let mut row = String::new();
    let mut used = 0;
    let mut started = false;
    for word in line.split(' ') {
        let w = visible_width(word);
        if started && used + 1 + w > width {
            rows.push(std::mem::take(&mut row));
            used = 0;
            started = false;
        }
        if started {
            row.push(' ');
            used += 1;
        }
        row.push_str(word);
        used += w;
        started = true;
    }
    rows.push(row);
    rows
}
