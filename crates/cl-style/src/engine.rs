//! Incremental styling engine.
//!
//! [`StyleEngine::style`] takes text in arbitrary chunks (split mid-word,
//! mid-pattern, anywhere) and returns styled output for as much as can be
//! decided so far. Non-whitespace characters collect in a word buffer; a
//! word is only styled and emitted when the whitespace after it arrives,
//! because word wrap needs the word's full visible length first.
//! [`StyleEngine::flush`] ends a message: the last word goes out, the
//! output gets its trailing newline and a reset, and the pattern stack is
//! cleared.
//!
//! # Style codes
//!
//! Every time the active style may have changed (start of a word, pattern
//! opened, pattern closed) the engine emits the full combined style rather
//! than a diff:
//!
//! ```text
//! ESC[22;23m  <color>  [ESC[1m]  [ESC[3m]
//! ```
//!
//! where `<color>` is the innermost active pattern's color, or the base
//! color, and bold/italic are on if any active pattern sets them. Emitting
//! the whole state each time makes every word self-contained, which is what
//! lets the reverse animation cut the text at any word boundary.
//!
//! # Wrapping
//!
//! Lines never exceed the wrap width in terminal cells. A word that
//! does not fit on the current line starts a new one; a word longer than a
//! whole line is split into width-sized pieces; a space that would land
//! past the edge becomes the line break instead. A width of zero puts
//! every word on a line of its own.

use cl_term::ansi;
use cl_term::color::Color;
use cl_term::console::FALLBACK_SIZE;
use cl_term::terminal;
use cl_term::width::char_width;

use crate::pattern::{PatternId, PatternRegistry};
use crate::visible::{Segment, has_box_chars, segments, visible_width};

/// Where the wrap width comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapWidth {
    /// A fixed number of columns.
    Fixed(u16),
    /// The terminal's current width, asked for on every word.
    Terminal,
}

impl WrapWidth {
    fn columns(self) -> usize {
        match self {
            Self::Fixed(cols) => usize::from(cols),
            Self::Terminal => usize::from(terminal::get_size().unwrap_or(FALLBACK_SIZE).cols),
        }
    }
}

/// Styling state for one conversation.
///
/// ```
/// use cl_style::{PatternRegistry, StyleEngine, WrapWidth, visible_length};
///
/// let mut engine = StyleEngine::new(PatternRegistry::default_table(), WrapWidth::Fixed(80));
/// let mut out = engine.style("say *hi*");
/// out += &engine.flush();
/// assert_eq!(visible_length(&out), "say hi\n".len());
/// ```
#[derive(Debug)]
pub struct StyleEngine {
    registry: PatternRegistry,
    width: WrapWidth,
    base_color: Color,
    /// Active patterns, innermost last.
    stack: Vec<PatternId>,
    /// Non-whitespace characters not yet emitted.
    word: String,
    /// Cells used on the current output line.
    line_len: usize,
    /// The last visible character emitted was a newline (or nothing was).
    at_line_start: bool,
}

impl StyleEngine {
    #[must_use]
    pub const fn new(registry: PatternRegistry, width: WrapWidth) -> Self {
        Self {
            registry,
            width,
            base_color: Color::Default,
            stack: Vec::new(),
            word: String::new(),
            line_len: 0,
            at_line_start: true,
        }
    }

    /// Color for text outside any colored pattern.
    pub const fn set_base_color(&mut self, color: Color) {
        self.base_color = color;
    }

    #[must_use]
    pub const fn base_color(&self) -> Color {
        self.base_color
    }

    #[must_use]
    pub const fn registry(&self) -> &PatternRegistry {
        &self.registry
    }

    /// Names of the active patterns, outermost first.
    #[must_use]
    pub fn active(&self) -> Vec<&str> {
        self.stack
            .iter()
            .map(|&id| self.registry.get(id).name.as_str())
            .collect()
    }

    /// Style the next chunk of a message.
    ///
    /// Returns the output that became final with this chunk. A trailing
    /// partial word is held back until whitespace or [`flush`](Self::flush).
    pub fn style(&mut self, chunk: &str) -> String {
        let mut out = String::new();

        // Framed panels go out verbatim; they carry their own layout.
        if has_box_chars(chunk) {
            self.emit_word(&mut out);
            out.push_str(chunk);
            self.track_verbatim(chunk);
            return out;
        }

        for ch in chunk.chars() {
            if ch.is_whitespace() {
                self.emit_word(&mut out);
                self.emit_space(&mut out, ch);
            } else {
                self.word.push(ch);
            }
        }
        out
    }

    /// End the message.
    ///
    /// Emits the pending word, a newline unless the output already ends on
    /// one, and a reset. Calling it again emits only the reset.
    pub fn flush(&mut self) -> String {
        let mut out = String::new();
        self.emit_word(&mut out);
        if !self.at_line_start {
            out.push('\n');
        }
        out.push_str(ansi::RESET);

        self.stack.clear();
        self.line_len = 0;
        self.at_line_start = true;
        out
    }

    // ── Internals ───────────────────────────────────────────────────────

    /// Combined style code for the current stack.
    fn current_style(&self) -> String {
        let mut color = self.base_color;
        let (mut bold, mut italic) = (false, false);
        for &id in &self.stack {
            let p = self.registry.get(id);
            if let Some(c) = p.color {
                color = c;
            }
            bold |= p.bold;
            italic |= p.italic;
        }

        let mut s = String::with_capacity(24);
        s.push_str(ansi::STYLE_OFF);
        s.push_str(&ansi::fg_string(color));
        if bold {
            s.push_str(ansi::BOLD);
        }
        if italic {
            s.push_str(ansi::ITALIC);
        }
        s
    }

    /// Apply patterns across the buffered word, mutating the stack.
    fn style_word(&mut self, word: &str) -> String {
        let mut out = self.current_style();

        for ch in word.chars() {
            // Closing the innermost pattern takes precedence over opening,
            // so a same-character pair like `"…"` closes on its second use.
            if let Some(&top) = self.stack.last() {
                let p = self.registry.get(top);
                if p.end == ch {
                    if p.keep_delimiters {
                        out.push(ch);
                    }
                    self.stack.pop();
                    out.push_str(&self.current_style());
                    continue;
                }
            }

            if let Some(id) = self.registry.opened_by(ch) {
                self.stack.push(id);
                out.push_str(&self.current_style());
                if self.registry.get(id).keep_delimiters {
                    out.push(ch);
                }
                continue;
            }

            out.push(ch);
        }
        out
    }

    fn emit_word(&mut self, out: &mut String) {
        if self.word.is_empty() {
            return;
        }
        let word = std::mem::take(&mut self.word);
        let styled = self.style_word(&word);
        let len = visible_width(&styled);
        if len == 0 {
            // Only hidden delimiters: style codes, nothing to place.
            out.push_str(&styled);
            return;
        }

        let width = self.width.columns();
        if self.line_len > 0 && self.line_len + len > width {
            out.push('\n');
            self.line_len = 0;
        }

        if width > 0 && len > width {
            let pieces = split_visible(&styled, width);
            let last = pieces.len() - 1;
            for (i, piece) in pieces.iter().enumerate() {
                out.push_str(piece);
                if i < last {
                    out.push('\n');
                }
            }
            self.line_len = visible_width(&pieces[last]);
        } else {
            out.push_str(&styled);
            self.line_len += len;
        }
        self.at_line_start = false;
    }

    fn emit_space(&mut self, out: &mut String, ch: char) {
        let width = self.width.columns();
        if ch == '\n' || self.line_len >= width {
            out.push('\n');
            self.line_len = 0;
            self.at_line_start = true;
        } else {
            out.push(ch);
            self.line_len += 1;
            self.at_line_start = false;
        }
    }

    /// Line bookkeeping after a verbatim chunk.
    fn track_verbatim(&mut self, chunk: &str) {
        let tail = chunk.rsplit('\n').next().unwrap_or(chunk);
        let tail_len = visible_width(tail);
        if chunk.contains('\n') {
            self.line_len = tail_len;
        } else {
            self.line_len += tail_len;
        }
        if let Some(last) = chunk.chars().last() {
            self.at_line_start = last == '\n';
        }
    }
}

/// Split `styled` into pieces at most `width` cells wide, keeping escape
/// sequences attached to the piece they appear in.
fn split_visible(styled: &str, width: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut cells = 0;

    for segment in segments(styled) {
        match segment {
            Segment::Escape(seq) => current.push_str(seq),
            Segment::Text(text) => {
                for ch in text.chars() {
                    let w = char_width(ch);
                    if cells > 0 && cells + w > width {
                        pieces.push(std::mem::take(&mut current));
                        cells = 0;
                    }
                    current.push(ch);
                    cells += w;
                }
            }
        }
    }
    pieces.push(current);
    pieces
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::palette;
    use crate::pattern::Pattern;
    use crate::visible::{strip_ansi, visible_length};

    fn engine(width: u16) -> StyleEngine {
        StyleEngine::new(PatternRegistry::default_table(), WrapWidth::Fixed(width))
    }

    /// Style everything and flush, returning the raw output.
    fn render(width: u16, text: &str) -> String {
        let mut e = engine(width);
        let mut out = e.style(text);
        out += &e.flush();
        out
    }

    /// Rendered text with escape codes removed.
    fn visible(width: u16, text: &str) -> String {
        strip_ansi(&render(width, text)).into_owned()
    }

    fn style_code(color: Color, bold: bool, italic: bool) -> String {
        let mut s = format!("{}{}", ansi::STYLE_OFF, ansi::fg_string(color));
        if bold {
            s.push_str(ansi::BOLD);
        }
        if italic {
            s.push_str(ansi::ITALIC);
        }
        s
    }

    // ── Patterns ────────────────────────────────────────────────────────

    #[test]
    fn default_table_scenario() {
        let out = render(80, "\"hello\" [ok] _em_ *bold*");
        assert_eq!(strip_ansi(&out), "\"hello\" [ok] em bold\n");

        // Each pattern's style first appears in input order.
        let first = |code: String| out.find(&code).unwrap();
        let quotes = first(style_code(palette::PINK, false, false));
        let brackets = first(style_code(palette::GRAY, false, true));
        let emphasis = first(style_code(Color::Default, false, true));
        let strong = first(style_code(Color::Default, true, false));
        assert!(quotes < brackets);
        assert!(brackets < emphasis);
        assert!(emphasis < strong);
    }

    #[test]
    fn quotes_are_pink_and_kept() {
        let out = render(80, "\"hi\" ");
        let pink = style_code(palette::PINK, false, false);
        assert!(out.contains(&format!("{pink}\"hi\"")));
    }

    #[test]
    fn brackets_are_gray_italic() {
        let out = render(80, "[note] ");
        let gray = style_code(palette::GRAY, false, true);
        assert!(out.contains(&format!("{gray}[note]")));
    }

    #[test]
    fn emphasis_and_strong_hide_delimiters() {
        assert_eq!(visible(80, "_a_ *b*"), "a b\n");
    }

    #[test]
    fn nested_patterns_merge_flags() {
        let out = render(80, "*bold _both_*");
        let both = style_code(Color::Default, true, true);
        assert!(out.contains(&format!("{both}both")));
    }

    #[test]
    fn inner_color_overrides_outer() {
        let out = render(80, "[a \"b\" c]");
        // Inside the quotes: pink, still italic from the brackets.
        assert!(out.contains(&format!("{}\"b", style_code(palette::PINK, false, true))));
        // Back to gray italic once the quotes close.
        assert!(out.contains(&format!("{}c", style_code(palette::GRAY, false, true))));
    }

    #[test]
    fn pattern_spans_words_and_chunks() {
        let mut e = engine(80);
        let mut out = e.style("[one tw");
        out += &e.style("o three] after ");
        let gray = style_code(palette::GRAY, false, true);
        assert!(out.contains(&format!("{gray}two")));
        assert!(out.contains(&format!("{}after", style_code(Color::Default, false, false))));
    }

    #[test]
    fn unmatched_end_delimiter_is_literal() {
        let mut e = engine(80);
        let out = e.style("a] ");
        assert_eq!(strip_ansi(&out), "a] ");
        assert!(e.active().is_empty());
    }

    #[test]
    fn end_of_other_pattern_does_not_pop() {
        let mut e = engine(80);
        let _ = e.style("[x) ");
        assert_eq!(e.active(), vec!["brackets"]);
    }

    #[test]
    fn flush_clears_stack() {
        let mut e = engine(80);
        let _ = e.style("[open");
        let _ = e.flush();
        assert!(e.active().is_empty());
        let out = e.style("plain ");
        assert!(out.starts_with(&style_code(Color::Default, false, false)));
    }

    #[test]
    fn base_color_applies_outside_patterns() {
        let mut e = engine(80);
        e.set_base_color(palette::GREEN);
        let out = e.style("hi ");
        assert!(out.starts_with(&style_code(palette::GREEN, false, false)));
    }

    #[test]
    fn custom_registry() {
        let registry = PatternRegistry::new(vec![
            Pattern::new("code", '`', '`').color(palette::YELLOW).hide_delimiters(),
        ])
        .unwrap();
        let mut e = StyleEngine::new(registry, WrapWidth::Fixed(80));
        let out = e.style("`x` ");
        assert_eq!(strip_ansi(&out), "x ");
        assert!(out.contains(&style_code(palette::YELLOW, false, false)));
    }

    // ── Visible length property ─────────────────────────────────────────

    #[test]
    fn plain_text_keeps_visible_length() {
        for text in ["hello world ", "a  b\tc ", "one\ntwo three ", "ünïcode wörds "] {
            let mut e = engine(200);
            assert_eq!(visible_length(&e.style(text)), text.chars().count(), "{text:?}");
        }
    }

    // ── Flush ───────────────────────────────────────────────────────────

    #[test]
    fn flush_emits_pending_word_newline_and_reset() {
        let mut e = engine(80);
        let out = e.style("tail");
        assert_eq!(out, "");
        let flushed = e.flush();
        assert!(flushed.ends_with("tail\n\x1b[0m"));
    }

    #[test]
    fn flush_twice_is_only_a_reset() {
        let mut e = engine(80);
        let _ = e.style("some words");
        let _ = e.flush();
        assert_eq!(e.flush(), "\x1b[0m");
    }

    #[test]
    fn flush_does_not_double_newline() {
        let mut e = engine(80);
        let _ = e.style("line\n");
        assert_eq!(e.flush(), "\x1b[0m");
    }

    #[test]
    fn flush_on_fresh_engine_is_only_a_reset() {
        assert_eq!(engine(80).flush(), "\x1b[0m");
    }

    // ── Wrapping ────────────────────────────────────────────────────────

    fn assert_lines_fit(text: &str, width: u16) {
        let shown = visible(width, text);
        for line in shown.lines() {
            assert!(
                visible_width(line) <= usize::from(width),
                "line {line:?} exceeds {width} in {shown:?}"
            );
        }
    }

    #[test]
    fn wraps_before_word_that_does_not_fit() {
        assert_eq!(visible(10, "hello big world"), "hello big \nworld\n");
    }

    #[test]
    fn word_exactly_filling_line() {
        assert_eq!(visible(5, "abcde fg"), "abcde\nfg\n");
    }

    #[test]
    fn long_word_is_hard_split() {
        assert_eq!(visible(4, "abcdefghij k"), "abcd\nefgh\nij k\n");
    }

    #[test]
    fn long_word_split_keeps_styles() {
        let out = render(3, "*abcdef*");
        assert_eq!(strip_ansi(&out), "abc\ndef\n");
        assert!(out.contains(&style_code(Color::Default, true, false)));
    }

    #[test]
    fn literal_newline_resets_line() {
        assert_eq!(visible(10, "aaaaaaaa\nbbbbbbbb"), "aaaaaaaa\nbbbbbbbb\n");
    }

    #[test]
    fn wide_chars_wrap_by_cells() {
        // Seven characters but thirteen cells: too wide for one line of ten.
        assert_eq!(visible(10, "中文字 中文字"), "中文字 \n中文字\n");
        assert_eq!(visible(4, "中文字 ab"), "中文\n字 \nab\n");
        assert_lines_fit("漢字のテキスト and ascii 混在 text", 7);
    }

    #[test]
    fn zero_width_puts_each_word_on_its_own_line() {
        assert_eq!(visible(0, "one two three"), "one\ntwo\nthree\n");
    }

    #[test]
    fn hidden_delimiters_do_not_count_toward_width() {
        assert_eq!(visible(7, "*hello* world"), "hello \nworld\n");
        assert_eq!(visible(11, "*hello* world"), "hello world\n");
    }

    #[test]
    fn lines_never_exceed_width() {
        let text = "The quick brown fox jumps over the lazy dog and then \
                    supercalifragilisticexpialidocious [bracketed aside] \
                    \"quoted words\" *strong* _soft_ end";
        for width in [1, 3, 7, 10, 16, 33, 80] {
            assert_lines_fit(text, width);
        }
    }

    #[test]
    fn chunk_boundaries_do_not_change_output() {
        let text = "split \"mid word\" [and mid] *pattern* here";
        let whole = render(12, text);
        let mut e = engine(12);
        let mut pieces = String::new();
        for ch in text.chars() {
            pieces += &e.style(&ch.to_string());
        }
        pieces += &e.flush();
        assert_eq!(pieces, whole);
    }

    // ── Box drawing ─────────────────────────────────────────────────────

    #[test]
    fn box_chunk_passes_through_verbatim() {
        let mut e = engine(80);
        let panel = "╭──╮\n│hi│\n╰──╯\n";
        assert_eq!(e.style(panel), panel);
        assert_eq!(e.flush(), "\x1b[0m");
    }

    #[test]
    fn split_visible_skips_escapes() {
        let pieces = split_visible("\x1b[1mabcd\x1b[0me", 2);
        assert_eq!(pieces, vec!["\x1b[1mab", "cd\x1b[0m", "e"]);
    }

    #[test]
    fn terminal_width_never_panics() {
        let mut e = StyleEngine::new(PatternRegistry::default_table(), WrapWidth::Terminal);
        let _ = e.style("a b c ");
        let _ = e.flush();
    }
}
