//! Preface panels.
//!
//! A conversation can open with a preface: framed panels and plain lines
//! shown above the first reply. A [`Panel`] is drawn with rounded
//! box-drawing borders across the full width, its text word-wrapped and
//! centered inside one blank row and two blank columns of padding, with an
//! optional title set into the top border at the right:
//!
//! ```text
//! ╭────────────── chatline ─╮
//! │                         │
//! │     Welcome. Ask me     │
//! │        anything.        │
//! │                         │
//! ╰─────────────────────────╯
//! ```
//!
//! Because a rendered panel contains box-drawing characters, the
//! [`StyleEngine`] passes it through verbatim. Plain preface lines go
//! through the engine like any reply and pick up inline patterns.

use cl_term::ansi;
use cl_term::color::Color;
use cl_term::width::{char_width, str_width};

use crate::engine::StyleEngine;
use crate::palette;

/// Blank rows above and below the text.
const PAD_ROWS: usize = 1;
/// Blank columns left and right of the text.
const PAD_COLS: usize = 2;
/// Narrowest panel drawn: borders, padding and room for a wide character.
const MIN_WIDTH: usize = 2 + 2 * PAD_COLS + 2;

/// A framed block of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Panel {
    pub text: String,
    pub title: Option<String>,
    pub border: Color,
}

impl Panel {
    /// An untitled panel with the default border color.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            title: None,
            border: palette::YELLOW,
        }
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub const fn border(mut self, color: Color) -> Self {
        self.border = color;
        self
    }

    /// Draw the panel `width` columns wide. Every row, the last included,
    /// ends with a newline.
    #[must_use]
    pub fn render(&self, width: usize) -> String {
        let width = width.max(MIN_WIDTH);
        let inner = width - 2;
        let text_width = inner - 2 * PAD_COLS;
        let color = ansi::fg_string(self.border);

        let mut out = String::new();
        let border_row = |out: &mut String, row: &str| {
            out.push_str(&color);
            out.push_str(row);
            out.push_str(ansi::RESET);
            out.push('\n');
        };

        border_row(&mut out, &self.top_border(inner));

        let mut body: Vec<String> = vec![String::new(); PAD_ROWS];
        for paragraph in self.text.trim_end().split('\n') {
            let lines = wrap(paragraph, text_width);
            if lines.is_empty() {
                body.push(String::new());
            }
            body.extend(lines);
        }
        body.extend(std::iter::repeat_n(String::new(), PAD_ROWS));

        for line in &body {
            let spare = text_width.saturating_sub(str_width(line.chars()));
            let left = spare / 2;
            let right = spare - left;
            out.push_str(&color);
            out.push('│');
            out.push_str(ansi::RESET);
            out.extend(std::iter::repeat_n(' ', PAD_COLS + left));
            out.push_str(line);
            out.extend(std::iter::repeat_n(' ', right + PAD_COLS));
            out.push_str(&color);
            out.push('│');
            out.push_str(ansi::RESET);
            out.push('\n');
        }

        let mut bottom = String::from("╰");
        bottom.extend(std::iter::repeat_n('─', inner));
        bottom.push('╯');
        border_row(&mut out, &bottom);
        out
    }

    /// `╭───── title ─╮`, or a plain border when there is no title or it
    /// does not fit.
    fn top_border(&self, inner: usize) -> String {
        let mut row = String::from("╭");
        match &self.title {
            Some(title) if str_width(title.chars()) + 3 <= inner => {
                let fill = inner - str_width(title.chars()) - 3;
                row.extend(std::iter::repeat_n('─', fill));
                row.push(' ');
                row.push_str(title);
                row.push_str(" ─");
            }
            _ => row.extend(std::iter::repeat_n('─', inner)),
        }
        row.push('╮');
        row
    }
}

/// Greedy word wrap to `width` cells. Words wider than a line are split.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut used = 0;

    for word in text.split_whitespace() {
        let w = str_width(word.chars());
        if used > 0 && used + 1 + w <= width {
            line.push(' ');
            line.push_str(word);
            used += 1 + w;
            continue;
        }
        if used > 0 {
            lines.push(std::mem::take(&mut line));
            used = 0;
        }
        for ch in word.chars() {
            let cw = char_width(ch);
            if used > 0 && used + cw > width {
                lines.push(std::mem::take(&mut line));
                used = 0;
            }
            line.push(ch);
            used += cw;
        }
    }
    if used > 0 {
        lines.push(line);
    }
    lines
}

/// One piece of a preface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefaceItem {
    Panel(Panel),
    /// A line styled like reply text.
    Text(String),
}

/// Everything shown before the conversation starts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preface {
    items: Vec<PrefaceItem>,
}

impl Preface {
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn push(&mut self, item: PrefaceItem) {
        self.items.push(item);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Render every item through `engine` at `width` columns, followed by
    /// one blank line. An empty preface renders as nothing.
    pub fn render(&self, engine: &mut StyleEngine, width: usize) -> String {
        let mut out = String::new();
        for item in &self.items {
            match item {
                PrefaceItem::Panel(panel) => out.push_str(&engine.style(&panel.render(width))),
                PrefaceItem::Text(text) => {
                    out.push_str(&engine.style(text));
                    out.push_str(&engine.flush());
                }
            }
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out
    }
}
