//! Delimiter patterns and the registry that holds them.
//!
//! A pattern is a pair of delimiter characters plus the styling applied
//! between them. The registry is built once at startup and never changes.
//! Construction fails if any delimiter character is claimed by more than
//! one pattern, because the engine decides what a character means by
//! looking it up, and a shared delimiter would make that lookup ambiguous.
//!
//! A pattern may use the same character for start and end (`"quoted"`,
//! `_emphasis_`). The engine checks "closes the innermost pattern" before
//! "opens a pattern", so the second occurrence closes.

use std::collections::HashMap;

use cl_term::color::Color;

use crate::StyleError;
use crate::palette;

/// One inline styling rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub name: String,
    pub start: char,
    pub end: char,
    /// Foreground color while active. `None` inherits from outer patterns.
    pub color: Option<Color>,
    pub italic: bool,
    pub bold: bool,
    /// Whether the delimiter characters themselves are printed.
    pub keep_delimiters: bool,
}

impl Pattern {
    /// A pattern with no color or style that keeps its delimiters.
    #[must_use]
    pub fn new(name: impl Into<String>, start: char, end: char) -> Self {
        Self {
            name: name.into(),
            start,
            end,
            color: None,
            italic: false,
            bold: false,
            keep_delimiters: true,
        }
    }

    #[must_use]
    pub const fn color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    #[must_use]
    pub const fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    #[must_use]
    pub const fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    /// Strip the delimiters from the output.
    #[must_use]
    pub const fn hide_delimiters(mut self) -> Self {
        self.keep_delimiters = false;
        self
    }
}

/// Index of a pattern within its registry.
pub type PatternId = usize;

/// An immutable, validated set of patterns.
#[derive(Debug, Clone)]
pub struct PatternRegistry {
    patterns: Vec<Pattern>,
    by_start: HashMap<char, PatternId>,
}

impl PatternRegistry {
    /// Validate and index `patterns`.
    ///
    /// # Errors
    ///
    /// [`StyleError::DuplicateName`] if two patterns share a name,
    /// [`StyleError::DuplicateDelimiter`] if a start or end character is
    /// used by more than one pattern.
    pub fn new(patterns: Vec<Pattern>) -> Result<Self, StyleError> {
        let mut owners: HashMap<char, &str> = HashMap::new();
        let mut names: Vec<&str> = Vec::with_capacity(patterns.len());

        for p in &patterns {
            if names.contains(&p.name.as_str()) {
                return Err(StyleError::DuplicateName(p.name.clone()));
            }
            names.push(&p.name);

            for delimiter in [p.start, p.end] {
                match owners.get(&delimiter) {
                    Some(&owner) if owner != p.name => {
                        return Err(StyleError::DuplicateDelimiter {
                            pattern: p.name.clone(),
                            delimiter,
                        });
                    }
                    _ => {
                        owners.insert(delimiter, &p.name);
                    }
                }
            }
        }

        Ok(Self::index(patterns))
    }

    /// The built-in table: quotes, brackets, emphasis, strong.
    ///
    /// Quotes and brackets keep their delimiters; `_emphasis_` and
    /// `*strong*` print only their content.
    #[must_use]
    pub fn default_table() -> Self {
        let patterns = vec![
            Pattern::new("quotes", '"', '"').color(palette::PINK),
            Pattern::new("brackets", '[', ']')
                .color(palette::GRAY)
                .italic(),
            Pattern::new("emphasis", '_', '_').italic().hide_delimiters(),
            Pattern::new("strong", '*', '*').bold().hide_delimiters(),
        ];
        // Distinct delimiters throughout, so no validation pass.
        Self::index(patterns)
    }

    fn index(patterns: Vec<Pattern>) -> Self {
        let by_start = patterns
            .iter()
            .enumerate()
            .map(|(id, p)| (p.start, id))
            .collect();
        Self { patterns, by_start }
    }

    /// The pattern opened by `ch`, if any.
    #[must_use]
    pub fn opened_by(&self, ch: char) -> Option<PatternId> {
        self.by_start.get(&ch).copied()
    }

    /// Pattern by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` did not come from this registry.
    #[must_use]
    pub fn get(&self, id: PatternId) -> &Pattern {
        &self.patterns[id]
    }

    /// Pattern by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Pattern> {
        self.patterns.iter().find(|p| p.name == name)
    }

    /// All patterns, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Default for PatternRegistry {
    fn default() -> Self {
        Self::default_table()
    }
}
