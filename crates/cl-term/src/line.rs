// SPDX-License-Identifier: MIT
//
// Raw-mode line editor.
//
// `LineEditor::read_line` shows a prompt, edits one logical line that may
// soft-wrap across several terminal rows, and returns either the entered
// text or a sentinel bound to a control key.
//
// The editor owns no screen model. It remembers a single number between
// redraws: which wrapped row (relative to the prompt's row) the terminal
// cursor was left on. A full redraw is then:
//
//   CR, up <row>, erase to end of screen, prompt, content, reposition
//
// all accumulated in one `OutputBuffer` and sent as a single write. The
// terminal width is asked for on every redraw, so a resize between two
// keystrokes is absorbed by the next one.
//
// Two fast paths skip the full redraw when the whole input fits on one row
// and nothing is selected: inserting a character writes only the tail of
// the line, and a plain Left/Right writes only a relative cursor move.

use std::io::Read;
use std::ops::Range;

use thiserror::Error;

use crate::ansi;
use crate::console::Console;
use crate::edit::InputBuffer;
use crate::input::{KeyCode, KeyDecoder, KeyEvent, Modifiers};
use crate::output::OutputBuffer;
use crate::terminal::RawMode;
use crate::width::{char_width, str_width};

// ─── Results and errors ─────────────────────────────────────────────────────

/// What `read_line` produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineResult {
    /// Enter on a non-blank buffer. The text is trimmed.
    Line(String),
    /// Ctrl-E: edit the previous message.
    Edit,
    /// Ctrl-R: regenerate the previous reply.
    Retry,
    /// Ctrl-P on an empty buffer: continue without new input.
    Continue,
    /// Ctrl-D on an empty buffer: leave the session.
    Exit,
}

/// Why `read_line` did not produce a result.
#[derive(Debug, Error)]
pub enum LineError {
    /// Ctrl-C. `^C` and a newline have already been written.
    #[error("interrupted")]
    Interrupted,
    /// The input source reached end of file.
    #[error("input closed")]
    Eof,
    /// Reading input or writing the terminal failed.
    #[error("terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Configuration ──────────────────────────────────────────────────────────

/// Appearance of the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorConfig {
    /// Emitted before the selected span.
    pub selection_start: String,
    /// Emitted after the selected span.
    pub selection_end: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            selection_start: "\x1b[7m".to_owned(),
            selection_end: "\x1b[27m".to_owned(),
        }
    }
}

// ─── Layout ─────────────────────────────────────────────────────────────────

/// Where things land once prompt + content are laid out at a given width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Layout {
    /// (row, col) of the cursor, relative to the prompt's first cell.
    cursor: (usize, usize),
    /// (row, col) just past the last cell.
    end: (usize, usize),
    /// The last row is filled to the edge. The terminal holds the cursor in
    /// the last column until the next character, so the redraw writes an
    /// explicit CR LF to make `end` true.
    exact_fill: bool,
}

/// Lay out cells of the given widths, `cursor` being an index into them.
///
/// A cell that would overflow the row moves to the start of the next one,
/// which is also what terminals do with a wide character in the last column.
fn layout<I>(widths: I, cursor: usize, width: usize) -> Layout
where
    I: IntoIterator<Item = usize>,
{
    let width = width.max(1);
    let (mut row, mut col) = (0, 0);
    let mut cursor_pos = None;

    for (i, w) in widths.into_iter().enumerate() {
        if col + w > width {
            row += 1;
            col = 0;
        }
        if i == cursor {
            cursor_pos = Some((row, col));
        }
        col += w;
    }

    let exact_fill = col >= width;
    let end = if exact_fill { (row + 1, 0) } else { (row, col) };
    Layout {
        cursor: cursor_pos.unwrap_or(end),
        end,
        exact_fill,
    }
}

/// Index (into the laid-out cells) whose position is the last one on `row`
/// not past `col`. Falls back to `total` for rows beyond the content.
fn index_at<I>(widths: I, total: usize, target: (usize, usize), width: usize) -> usize
where
    I: IntoIterator<Item = usize>,
{
    let width = width.max(1);
    let (mut row, mut col) = (0, 0);
    let mut best = None;

    for (i, w) in widths.into_iter().enumerate() {
        if col + w > width {
            row += 1;
            col = 0;
        }
        if row == target.0 && col <= target.1 {
            best = Some(i);
        } else if row > target.0 {
            return best.unwrap_or(i);
        }
        col += w;
    }

    // The end-of-content position is itself a valid cursor spot.
    let end_row = if col >= width { row + 1 } else { row };
    let end_col = if col >= width { 0 } else { col };
    if end_row == target.0 && end_col <= target.1 {
        return total;
    }
    best.unwrap_or(total)
}

// ─── Line editor ────────────────────────────────────────────────────────────

/// Per-call editing state.
struct Session<'p> {
    prompt: &'p str,
    buffer: InputBuffer,
    /// Editing a previous message: Ctrl-E and Ctrl-R are disabled.
    editing: bool,
    /// Row the terminal cursor was left on by the last redraw.
    cursor_row: usize,
}

impl Session<'_> {
    fn prompt_len(&self) -> usize {
        self.prompt.chars().count()
    }

    /// Widths of every cell: the prompt's characters, then the buffer's.
    fn widths(&self) -> impl Iterator<Item = usize> + '_ {
        self.prompt
            .chars()
            .chain(self.buffer.chars().iter().copied())
            .map(char_width)
    }

    fn layout(&self, width: usize) -> Layout {
        layout(self.widths(), self.prompt_len() + self.buffer.cursor(), width)
    }
}

/// A line editor reading keys from `R` and drawing on `C`.
///
/// # Example
///
/// ```
/// use cl_term::console::{MemoryConsole, FALLBACK_SIZE};
/// use cl_term::line::{EditorConfig, LineEditor, LineResult};
///
/// let console = MemoryConsole::new(FALLBACK_SIZE);
/// let mut editor = LineEditor::new(&b"hi\r"[..], console, EditorConfig::default());
/// assert_eq!(editor.read_line("> ", None)?, LineResult::Line("hi".into()));
/// # Ok::<(), cl_term::line::LineError>(())
/// ```
pub struct LineEditor<R, C> {
    keys: KeyDecoder<R>,
    console: C,
    config: EditorConfig,
    raw_mode: bool,
    out: OutputBuffer,
}

impl<R: Read, C: Console> LineEditor<R, C> {
    /// Create an editor. Raw mode is off; see [`raw_mode`](Self::raw_mode).
    pub fn new(source: R, console: C, config: EditorConfig) -> Self {
        Self {
            keys: KeyDecoder::new(source),
            console,
            config,
            raw_mode: false,
            out: OutputBuffer::new(),
        }
    }

    /// Hold a [`RawMode`] guard for the duration of each `read_line`.
    #[must_use]
    pub fn raw_mode(mut self, enabled: bool) -> Self {
        self.raw_mode = enabled;
        self
    }

    /// The console this editor draws on.
    pub const fn console(&self) -> &C {
        &self.console
    }

    /// Read one line.
    ///
    /// `default` pre-fills the buffer (editing a previous message), which
    /// also disables the Ctrl-E and Ctrl-R sentinels.
    ///
    /// # Errors
    ///
    /// [`LineError::Interrupted`] on Ctrl-C, [`LineError::Eof`] when the
    /// input closes, [`LineError::Io`] on terminal failure. The raw-mode
    /// guard is released on every path.
    pub fn read_line(
        &mut self,
        prompt: &str,
        default: Option<&str>,
    ) -> Result<LineResult, LineError> {
        let _raw = if self.raw_mode {
            Some(RawMode::enter()?)
        } else {
            None
        };

        let mut session = Session {
            prompt,
            buffer: default.map(InputBuffer::from_text).unwrap_or_default(),
            editing: default.is_some(),
            cursor_row: 0,
        };

        self.redraw(&mut session)?;

        loop {
            let Some(key) = self.keys.next_key()? else {
                self.finish(&session, "\r\n")?;
                return Err(LineError::Eof);
            };
            if let Some(result) = self.handle_key(&mut session, key)? {
                return Ok(result);
            }
        }
    }

    fn handle_key(
        &mut self,
        s: &mut Session<'_>,
        key: KeyEvent,
    ) -> Result<Option<LineResult>, LineError> {
        let shift = key.modifiers.contains(Modifiers::SHIFT);
        let ctrl = key.modifiers.contains(Modifiers::CTRL);

        match key.code {
            KeyCode::Char(letter) if key.modifiers == Modifiers::CTRL => {
                return self.handle_control(s, letter);
            }
            KeyCode::Char(ch) if !key.modifiers.intersects(Modifiers::CTRL | Modifiers::ALT) => {
                self.insert(s, ch)?;
            }
            KeyCode::Tab => self.insert(s, ' ')?,
            KeyCode::Enter => {
                let line = s.buffer.text().trim().to_owned();
                if line.is_empty() {
                    return Ok(None);
                }
                self.finish(s, "\r\n")?;
                return Ok(Some(LineResult::Line(line)));
            }
            KeyCode::Backspace => {
                if s.buffer.backspace() {
                    self.redraw(s)?;
                }
            }
            KeyCode::Delete => {
                if s.buffer.delete() {
                    self.redraw(s)?;
                }
            }
            KeyCode::Left | KeyCode::Right if !shift && !ctrl => {
                self.step(s, key.code == KeyCode::Left)?;
            }
            KeyCode::Left if ctrl => self.motion(s, |b| b.word_left(shift))?,
            KeyCode::Right if ctrl => self.motion(s, |b| b.word_right(shift))?,
            KeyCode::Left => self.motion(s, |b| b.move_left(shift))?,
            KeyCode::Right => self.motion(s, |b| b.move_right(shift))?,
            KeyCode::Home => self.motion(s, |b| b.move_home(shift))?,
            KeyCode::End => self.motion(s, |b| b.move_end(shift))?,
            KeyCode::Up => self.vertical(s, false, shift)?,
            KeyCode::Down => self.vertical(s, true, shift)?,
            KeyCode::Char(_) | KeyCode::Escape | KeyCode::Unknown => {}
        }
        Ok(None)
    }

    fn handle_control(
        &mut self,
        s: &mut Session<'_>,
        letter: char,
    ) -> Result<Option<LineResult>, LineError> {
        match letter {
            'c' => {
                self.finish(s, "^C\r\n")?;
                return Err(LineError::Interrupted);
            }
            'd' if s.buffer.is_empty() => return self.sentinel(s, LineResult::Exit),
            'd' => {
                if s.buffer.delete() {
                    self.redraw(s)?;
                }
            }
            'e' if !s.editing => return self.sentinel(s, LineResult::Edit),
            'r' if !s.editing => return self.sentinel(s, LineResult::Retry),
            'p' if s.buffer.is_empty() => return self.sentinel(s, LineResult::Continue),
            'a' => {
                s.buffer.select_all();
                self.redraw(s)?;
            }
            'x' => {
                if !s.buffer.delete_selection() {
                    s.buffer.clear();
                }
                self.redraw(s)?;
            }
            _ => {}
        }
        Ok(None)
    }

    // ── Edits ───────────────────────────────────────────────────────────

    fn insert(&mut self, s: &mut Session<'_>, ch: char) -> Result<(), LineError> {
        let had_selection = s.buffer.has_selection();
        s.buffer.insert(ch);

        let width = usize::from(self.console.size().cols);
        let lay = s.layout(width);
        if had_selection || s.cursor_row != 0 || lay.end.0 != 0 || lay.exact_fill {
            return self.redraw(s);
        }

        // Fast path: write the inserted char and everything after it, then
        // step back over the tail.
        let cursor = s.buffer.cursor();
        let chars = &s.buffer.chars()[cursor - 1..];
        for &c in chars {
            self.out.push_char(c);
        }
        ansi::cursor_back(&mut self.out, str_width(chars[1..].iter().copied()))?;
        self.out.flush_to(&mut self.console)?;
        Ok(())
    }

    /// Plain Left/Right.
    fn step(&mut self, s: &mut Session<'_>, left: bool) -> Result<(), LineError> {
        let had_selection = s.buffer.has_selection();
        let width = usize::from(self.console.size().cols);
        let before = s.layout(width);

        if left {
            s.buffer.move_left(false);
        } else {
            s.buffer.move_right(false);
        }

        let after = s.layout(width);
        if had_selection || s.cursor_row != 0 || after.end.0 != 0 || after.exact_fill {
            return self.redraw(s);
        }

        // Fast path: a single relative move on the one row.
        let (from, to) = (before.cursor.1, after.cursor.1);
        if to < from {
            ansi::cursor_back(&mut self.out, from - to)?;
        } else {
            ansi::cursor_forward(&mut self.out, to - from)?;
        }
        self.out.flush_to(&mut self.console)?;
        Ok(())
    }

    fn motion(
        &mut self,
        s: &mut Session<'_>,
        f: impl FnOnce(&mut InputBuffer),
    ) -> Result<(), LineError> {
        f(&mut s.buffer);
        self.redraw(s)
    }

    /// Up/Down: one wrapped row, keeping the column where possible.
    fn vertical(&mut self, s: &mut Session<'_>, down: bool, extend: bool) -> Result<(), LineError> {
        let width = usize::from(self.console.size().cols);
        let lay = s.layout(width);
        let (row, col) = lay.cursor;
        let prompt_len = s.prompt_len();

        let target = if down {
            if row >= lay.end.0 {
                s.buffer.len()
            } else {
                let idx = index_at(s.widths(), prompt_len + s.buffer.len(), (row + 1, col), width);
                idx.saturating_sub(prompt_len)
            }
        } else if row == 0 {
            0
        } else {
            let idx = index_at(s.widths(), prompt_len + s.buffer.len(), (row - 1, col), width);
            idx.saturating_sub(prompt_len)
        };

        s.buffer.move_to(target, extend);
        self.redraw(s)
    }

    // ── Output ──────────────────────────────────────────────────────────

    /// Full redraw of prompt and content, as one write.
    fn redraw(&mut self, s: &mut Session<'_>) -> Result<(), LineError> {
        let width = usize::from(self.console.size().cols);
        let lay = s.layout(width);

        self.out.push_char('\r');
        ansi::cursor_up(&mut self.out, s.cursor_row)?;
        ansi::erase_below(&mut self.out)?;
        self.out.push_str(s.prompt);
        self.push_content(s.buffer.chars(), s.buffer.selection());
        if lay.exact_fill {
            self.out.push_str("\r\n");
        }
        ansi::cursor_up(&mut self.out, lay.end.0 - lay.cursor.0)?;
        self.out.push_char('\r');
        ansi::cursor_forward(&mut self.out, lay.cursor.1)?;
        self.out.flush_to(&mut self.console)?;

        s.cursor_row = lay.cursor.0;
        Ok(())
    }

    fn push_content(&mut self, chars: &[char], selection: Option<Range<usize>>) {
        let Some(sel) = selection else {
            for &c in chars {
                self.out.push_char(c);
            }
            return;
        };
        for (i, &c) in chars.iter().enumerate() {
            if i == sel.start {
                self.out.push_str(&self.config.selection_start);
            }
            self.out.push_char(c);
            if i + 1 == sel.end {
                self.out.push_str(&self.config.selection_end);
            }
        }
    }

    /// Move to the end of the input area and write `suffix`.
    fn finish(&mut self, s: &Session<'_>, suffix: &str) -> Result<(), LineError> {
        let width = usize::from(self.console.size().cols);
        let lay = s.layout(width);
        if s.buffer.has_selection() {
            // Repaint without the highlight so it doesn't linger on screen.
            let mut plain = Session {
                prompt: s.prompt,
                buffer: s.buffer.clone(),
                editing: s.editing,
                cursor_row: s.cursor_row,
            };
            plain.buffer.clear_selection();
            self.redraw(&mut plain)?;
        }
        ansi::cursor_down(&mut self.out, lay.end.0.saturating_sub(lay.cursor.0))?;
        self.out.push_char('\r');
        ansi::cursor_forward(&mut self.out, lay.end.1)?;
        self.out.push_str(suffix);
        self.out.flush_to(&mut self.console)?;
        Ok(())
    }

    /// Erase the input area and return a sentinel.
    fn sentinel(
        &mut self,
        s: &Session<'_>,
        result: LineResult,
    ) -> Result<Option<LineResult>, LineError> {
        self.out.push_char('\r');
        ansi::cursor_up(&mut self.out, s.cursor_row)?;
        ansi::erase_below(&mut self.out)?;
        self.out.flush_to(&mut self.console)?;
        Ok(Some(result))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::console::MemoryConsole;
    use crate::terminal::Size;

    fn editor(input: &[u8], cols: u16) -> (LineEditor<&[u8], MemoryConsole>, MemoryConsole) {
        let console = MemoryConsole::new(Size { cols, rows: 24 });
        let editor = LineEditor::new(input, console.clone(), EditorConfig::default());
        (editor, console)
    }

    fn read(input: &[u8]) -> Result<LineResult, LineError> {
        editor(input, 80).0.read_line("> ", None)
    }

    fn line(s: &str) -> LineResult {
        LineResult::Line(s.to_owned())
    }

    // ── Layout ──────────────────────────────────────────────────────────

    #[test]
    fn layout_single_row() {
        let lay = layout([1, 1, 1], 1, 10);
        assert_eq!(lay.cursor, (0, 1));
        assert_eq!(lay.end, (0, 3));
        assert!(!lay.exact_fill);
    }

    #[test]
    fn layout_wraps_by_width() {
        let lay = layout(std::iter::repeat_n(1, 25), 12, 10);
        assert_eq!(lay.cursor, (1, 2));
        assert_eq!(lay.end, (2, 5));
    }

    #[test]
    fn layout_exact_fill_moves_end_to_next_row() {
        let lay = layout(std::iter::repeat_n(1, 10), 10, 10);
        assert!(lay.exact_fill);
        assert_eq!(lay.end, (1, 0));
        assert_eq!(lay.cursor, (1, 0));
    }

    #[test]
    fn layout_wide_char_does_not_straddle() {
        // Nine narrow cells, then a wide one that cannot fit in column 9.
        let widths = std::iter::repeat_n(1, 9).chain([2]);
        let lay = layout(widths, 9, 10);
        assert_eq!(lay.cursor, (1, 0));
        assert_eq!(lay.end, (1, 2));
    }

    #[test]
    fn layout_zero_width_degrades_to_one() {
        let lay = layout([1, 1], 2, 0);
        assert_eq!(lay.end, (2, 0));
    }

    #[test]
    fn index_at_finds_column_on_row() {
        let widths = || std::iter::repeat_n(1, 25);
        assert_eq!(index_at(widths(), 25, (1, 3), 10), 13);
        assert_eq!(index_at(widths(), 25, (2, 9), 10), 25);
        assert_eq!(index_at(widths(), 25, (0, 0), 10), 0);
    }

    // ── Results ─────────────────────────────────────────────────────────

    #[test]
    fn returns_typed_line() {
        assert_eq!(read(b"hello\r").unwrap(), line("hello"));
    }

    #[test]
    fn returned_line_is_trimmed() {
        assert_eq!(read(b"  hi there \r").unwrap(), line("hi there"));
    }

    #[test]
    fn blank_enter_is_ignored() {
        assert_eq!(read(b"\r   \rok\r").unwrap(), line("ok"));
    }

    #[test]
    fn utf8_input() {
        assert_eq!(read("héllo 中\r".as_bytes()).unwrap(), line("héllo 中"));
    }

    #[test]
    fn invalid_utf8_is_skipped() {
        assert_eq!(read(b"a\xC3b\r").unwrap(), line("ab"));
    }

    #[test]
    fn ctrl_c_interrupts_and_echoes() {
        let (mut ed, console) = editor(b"ab\x03", 80);
        let err = ed.read_line("> ", None).unwrap_err();
        assert!(matches!(err, LineError::Interrupted));
        assert!(console.contents().ends_with("^C\r\n"));
    }

    #[test]
    fn eof_is_an_error() {
        assert!(matches!(read(b"abc"), Err(LineError::Eof)));
    }

    #[test]
    fn ctrl_d_exits_only_when_empty() {
        assert_eq!(read(b"\x04").unwrap(), LineResult::Exit);
        // Non-empty: forward delete at the cursor.
        assert_eq!(read(b"abc\x1b[D\x1b[D\x04\r").unwrap(), line("ac"));
    }

    #[test]
    fn ctrl_e_and_ctrl_r_sentinels() {
        assert_eq!(read(b"\x05").unwrap(), LineResult::Edit);
        assert_eq!(read(b"typed\x12").unwrap(), LineResult::Retry);
    }

    #[test]
    fn ctrl_e_and_ctrl_r_ignored_when_editing() {
        let (mut ed, _) = editor(b"\x05\x12!\r", 80);
        assert_eq!(ed.read_line("> ", Some("old")).unwrap(), line("old!"));
    }

    #[test]
    fn ctrl_p_continues_only_when_empty() {
        assert_eq!(read(b"\x10").unwrap(), LineResult::Continue);
        assert_eq!(read(b"x\x10\r").unwrap(), line("x"));
    }

    #[test]
    fn default_text_is_editable() {
        let (mut ed, _) = editor(b"\x7F\x7Fnew\r", 80);
        assert_eq!(ed.read_line("> ", Some("the old")).unwrap(), line("the onew"));
    }

    // ── Editing keys ────────────────────────────────────────────────────

    #[test]
    fn backspace_and_delete() {
        assert_eq!(read(b"abc\x7F\r").unwrap(), line("ab"));
        assert_eq!(read(b"abc\x1b[H\x1b[3~\r").unwrap(), line("bc"));
    }

    #[test]
    fn insert_mid_line() {
        assert_eq!(read(b"ac\x1b[Db\r").unwrap(), line("abc"));
    }

    #[test]
    fn home_end() {
        assert_eq!(read(b"bc\x1b[Ha\x1b[Fd\r").unwrap(), line("abcd"));
        assert_eq!(read(b"bc\x1b[1~a\x1b[4~d\r").unwrap(), line("abcd"));
    }

    #[test]
    fn ctrl_arrows_jump_words() {
        // Ctrl+Left twice from the end lands on "two", insert there.
        assert_eq!(
            read(b"one two three\x1b[1;5D\x1b[1;5DX\r").unwrap(),
            line("one Xtwo three")
        );
        assert_eq!(
            read(b"one two\x1b[H\x1b[1;5CX\r").unwrap(),
            line("oneX two")
        );
    }

    #[test]
    fn shift_arrow_selection_replaced_by_typing() {
        assert_eq!(read(b"hello\x1b[1;2D\x1b[1;2DP!\r").unwrap(), line("helP!"));
    }

    #[test]
    fn ctrl_shift_arrow_selects_word() {
        assert_eq!(read(b"one two\x1b[1;6D\x7F\r").unwrap(), line("one"));
    }

    #[test]
    fn shift_home_selects_to_start() {
        assert_eq!(read(b"abc def\x1b[1;2Hx\r").unwrap(), line("x"));
    }

    #[test]
    fn plain_arrow_clears_selection() {
        assert_eq!(read(b"abc\x1b[1;2D\x1b[D\x7F\r").unwrap(), line("bc"));
    }

    #[test]
    fn ctrl_a_selects_all_and_ctrl_x_cuts() {
        assert_eq!(read(b"abc\x01\x18z\r").unwrap(), line("z"));
    }

    #[test]
    fn ctrl_x_without_selection_clears() {
        assert_eq!(read(b"abc\x18\r\x04").unwrap(), LineResult::Exit);
    }

    #[test]
    fn unknown_sequences_are_ignored() {
        assert_eq!(read(b"a\x1b[15~\x1b[Zb\r").unwrap(), line("ab"));
    }

    #[test]
    fn up_down_move_between_wrapped_rows() {
        // Width 10, prompt "> " (2 cells). 15 chars: row 0 holds 8, row 1
        // holds 7. Up from the end (row 1, col 7) lands on index 5.
        let (mut ed, _) = editor(b"abcdefghijklmno\x1b[AX\r", 10);
        assert_eq!(ed.read_line("> ", None).unwrap(), line("abcdeXfghijklmno"));

        let (mut ed, _) = editor(b"abcdefghijklmno\x1b[H\x1b[BY\r", 10);
        assert_eq!(ed.read_line("> ", None).unwrap(), line("abcdefghijYklmno"));
    }

    #[test]
    fn up_on_first_row_goes_home() {
        assert_eq!(read(b"abc\x1b[AX\r").unwrap(), line("Xabc"));
        assert_eq!(read(b"abc\x1b[H\x1b[BX\r").unwrap(), line("abcX"));
    }

    // ── Rendering ───────────────────────────────────────────────────────

    #[test]
    fn initial_draw_is_one_write() {
        let (mut ed, console) = editor(b"\x04", 80);
        ed.read_line("> ", None).unwrap();
        // First write: the prompt draw.
        assert!(console.contents().starts_with("\r\x1b[0J> \r\x1b[2C"));
    }

    #[test]
    fn fast_path_insert_writes_only_the_char() {
        let (mut ed, console) = editor(b"ab", 80);
        let _ = ed.read_line("> ", None);
        assert_eq!(console.contents(), "\r\x1b[0J> \r\x1b[2Cab\r\x1b[4C\r\n");
        // Initial draw, 'a', 'b', then the EOF newline.
        assert_eq!(console.write_count(), 4);
    }

    #[test]
    fn fast_path_insert_mid_line_rewrites_tail() {
        let (mut ed, console) = editor(b"ac\x1b[Db", 80);
        let _ = ed.read_line("> ", None);
        assert!(console.contents().contains("\x1b[1Dbc\x1b[1D"));
    }

    #[test]
    fn wrapped_content_uses_full_redraw() {
        // Width 6: "> " + "abcd" fills the row exactly; the fifth char wraps.
        let (mut ed, console) = editor(b"abcde", 6);
        let _ = ed.read_line("> ", None);
        let out = console.contents();
        // Typing 'd' fills the row: full redraw ending in an explicit CR LF.
        assert!(out.contains("\r\x1b[0J> abcd\r\n\r"));
        // Typing 'e' redraws from one row up.
        assert!(out.contains("\r\x1b[1A\x1b[0J> abcde\r\x1b[1C"));
    }

    #[test]
    fn selection_is_highlighted() {
        let (mut ed, console) = editor(b"abc\x1b[1;2D\x04", 80);
        let _ = ed.read_line("> ", None);
        assert!(console.contents().contains("> ab\x1b[7mc\x1b[27m"));
    }

    /// Byte source that resizes the console once `at` bytes have been read.
    struct ResizeAfter {
        data: &'static [u8],
        pos: usize,
        at: usize,
        console: MemoryConsole,
        size: Size,
    }

    impl Read for ResizeAfter {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos == self.at {
                self.console.set_size(self.size);
            }
            let Some(&b) = self.data.get(self.pos) else {
                return Ok(0);
            };
            buf[0] = b;
            self.pos += 1;
            Ok(1)
        }
    }

    #[test]
    fn resize_between_redraws_is_picked_up() {
        let console = MemoryConsole::new(Size { cols: 80, rows: 24 });
        let source = ResizeAfter {
            data: b"abcdefgh\x1b[H",
            pos: 0,
            at: 8,
            console: console.clone(),
            size: Size { cols: 4, rows: 24 },
        };
        let mut ed = LineEditor::new(source, console.clone(), EditorConfig::default());
        let _ = ed.read_line("> ", None);
        // Typed on one row at width 80; Home is drawn at width 4, where
        // "> abcdefgh" spans three rows and the cursor sits on the first.
        assert!(
            console
                .contents()
                .contains("\r\x1b[0J> abcdefgh\x1b[2A\r\x1b[2C")
        );
    }

    #[test]
    fn sentinel_erases_input_area() {
        let (mut ed, console) = editor(b"\x05", 80);
        ed.read_line("> ", None).unwrap();
        assert!(console.contents().ends_with("\r\x1b[0J"));
    }

    #[test]
    fn enter_moves_past_the_input() {
        let (mut ed, console) = editor(b"hi\x1b[D\r", 80);
        ed.read_line("> ", None).unwrap();
        assert!(console.contents().ends_with("\r\x1b[4C\r\n"));
    }
}
