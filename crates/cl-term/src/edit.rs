// SPDX-License-Identifier: MIT
//
// Single-line input buffer with cursor and selection.
//
// The buffer is a `Vec<char>` indexed by Unicode scalar value, not by
// byte: the cursor moves one character per keypress regardless of how many
// UTF-8 bytes the character takes, and the display-width arithmetic in the
// line editor walks the same indices.
//
// Selection is an anchor plus the cursor. The anchor is set by the first
// extending motion (Shift+arrow, Shift+Home, Ctrl+Shift+arrow) and dropped
// by any plain motion. The selected span is whatever lies between anchor
// and cursor, in either direction.

use std::ops::Range;

// ─── Character classification ───────────────────────────────────────────────

/// Character class for word-jump boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    /// Letters, digits, underscore.
    Word,
    /// Non-blank, non-word characters.
    Punctuation,
    /// Whitespace.
    Blank,
}

fn classify(ch: char) -> CharClass {
    if ch.is_whitespace() {
        CharClass::Blank
    } else if ch.is_alphanumeric() || ch == '_' {
        CharClass::Word
    } else {
        CharClass::Punctuation
    }
}

// ─── InputBuffer ────────────────────────────────────────────────────────────

/// The text being edited, a cursor in `0..=len`, and an optional anchor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputBuffer {
    chars: Vec<char>,
    cursor: usize,
    anchor: Option<usize>,
}

impl InputBuffer {
    /// An empty buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            chars: Vec::new(),
            cursor: 0,
            anchor: None,
        }
    }

    /// A buffer pre-filled with `text`, cursor at the end.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let cursor = chars.len();
        Self {
            chars,
            cursor,
            anchor: None,
        }
    }

    // ── Queries ─────────────────────────────────────────────────────────

    /// The buffer contents as a `String`.
    #[must_use]
    pub fn text(&self) -> String {
        self.chars.iter().collect()
    }

    /// The buffer contents as characters.
    #[must_use]
    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    /// Number of characters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    /// Whether the buffer holds no characters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Cursor index, `0..=len()`.
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// The selected character range, if a non-empty selection exists.
    #[must_use]
    pub fn selection(&self) -> Option<Range<usize>> {
        let anchor = self.anchor?;
        let range = anchor.min(self.cursor)..anchor.max(self.cursor);
        (!range.is_empty()).then_some(range)
    }

    /// Whether a non-empty selection exists.
    #[must_use]
    pub fn has_selection(&self) -> bool {
        self.selection().is_some()
    }

    // ── Editing ─────────────────────────────────────────────────────────

    /// Insert `ch` at the cursor, replacing the selection if there is one.
    pub fn insert(&mut self, ch: char) {
        self.delete_selection();
        self.chars.insert(self.cursor, ch);
        self.cursor += 1;
    }

    /// Delete the selection, or the character before the cursor.
    ///
    /// Returns whether anything changed.
    pub fn backspace(&mut self) -> bool {
        if self.delete_selection() {
            return true;
        }
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        self.chars.remove(self.cursor);
        true
    }

    /// Delete the selection, or the character under the cursor.
    ///
    /// Returns whether anything changed.
    pub fn delete(&mut self) -> bool {
        if self.delete_selection() {
            return true;
        }
        if self.cursor >= self.chars.len() {
            return false;
        }
        self.chars.remove(self.cursor);
        true
    }

    /// Remove the selected span and put the cursor where it began.
    ///
    /// Returns `false` (and only drops the anchor) when nothing is selected.
    pub fn delete_selection(&mut self) -> bool {
        let Some(range) = self.selection() else {
            self.anchor = None;
            return false;
        };
        self.cursor = range.start;
        self.chars.drain(range);
        self.anchor = None;
        true
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.chars.clear();
        self.cursor = 0;
        self.anchor = None;
    }

    /// Select the whole buffer, cursor at the end.
    pub fn select_all(&mut self) {
        self.anchor = Some(0);
        self.cursor = self.chars.len();
    }

    /// Drop the selection without moving the cursor.
    pub const fn clear_selection(&mut self) {
        self.anchor = None;
    }

    // ── Motion ──────────────────────────────────────────────────────────
    //
    // Every motion takes `extend`: when true the selection grows from the
    // current anchor (set here if absent); when false the selection is
    // dropped.

    /// Move the cursor to `pos` (clamped to the buffer).
    pub fn move_to(&mut self, pos: usize, extend: bool) {
        if extend {
            self.anchor.get_or_insert(self.cursor);
        } else {
            self.anchor = None;
        }
        self.cursor = pos.min(self.chars.len());
    }

    /// One character left.
    pub fn move_left(&mut self, extend: bool) {
        self.move_to(self.cursor.saturating_sub(1), extend);
    }

    /// One character right.
    pub fn move_right(&mut self, extend: bool) {
        self.move_to(self.cursor + 1, extend);
    }

    /// Start of the buffer.
    pub fn move_home(&mut self, extend: bool) {
        self.move_to(0, extend);
    }

    /// End of the buffer.
    pub fn move_end(&mut self, extend: bool) {
        self.move_to(self.chars.len(), extend);
    }

    /// Start of the previous word.
    pub fn word_left(&mut self, extend: bool) {
        self.move_to(self.prev_word_start(), extend);
    }

    /// End of the next word.
    pub fn word_right(&mut self, extend: bool) {
        self.move_to(self.next_word_end(), extend);
    }

    /// Skip blanks backward, then the run of same-class characters.
    fn prev_word_start(&self) -> usize {
        let mut idx = self.cursor;
        while idx > 0 && classify(self.chars[idx - 1]) == CharClass::Blank {
            idx -= 1;
        }
        if idx == 0 {
            return 0;
        }
        let class = classify(self.chars[idx - 1]);
        while idx > 0 && classify(self.chars[idx - 1]) == class {
            idx -= 1;
        }
        idx
    }

    /// Skip blanks forward, then the run of same-class characters.
    fn next_word_end(&self) -> usize {
        let total = self.chars.len();
        let mut idx = self.cursor;
        while idx < total && classify(self.chars[idx]) == CharClass::Blank {
            idx += 1;
        }
        if idx == total {
            return total;
        }
        let class = classify(self.chars[idx]);
        while idx < total && classify(self.chars[idx]) == class {
            idx += 1;
        }
        idx
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
