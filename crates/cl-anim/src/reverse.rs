//! Reverse streaming: taking a rendered reply back, word by word.
//!
//! Before a retry or an edit, the last reply is "un-typed" from the end.
//! The styled text is split into tokens (whole escape sequences, or single
//! characters) so no escape sequence is ever cut in half, the tokens are
//! grouped into alternating word and space runs, and each round drops the
//! trailing space run and then trailing word runs before the remainder is
//! redrawn.
//!
//! An escape sequence always travels with the run it appears in. One that
//! appears before any text opens a word run, so the style codes the engine
//! puts in front of every word disappear together with that word.
//!
//! Long replies can speed up: with an acceleration factor above one, the
//! number of words dropped per round grows geometrically once the reply
//! has more words than a threshold.
//!
//! After the words are gone the preserved message (the user's prompt, say
//! `thinking...`) loses its trailing punctuation one character per frame.
//!
//! A prefix (the preface panel shown above a conversation's first reply)
//! stays on screen throughout and is never taken apart.

use std::time::Duration;

use cl_style::visible::{Segment, segments};

use crate::AnimError;
use crate::display::Display;

/// Dots in a full ellipsis.
const ELLIPSIS: usize = 3;

/// A unit of styled text that is never split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Escape(String),
    Char(char),
}

impl Token {
    fn push_to(&self, out: &mut String) {
        match self {
            Self::Escape(seq) => out.push_str(seq),
            Self::Char(c) => out.push(*c),
        }
    }
}

/// Split styled text into escape sequences and characters.
#[must_use]
pub fn tokenize(styled: &str) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(styled.len());
    for segment in segments(styled) {
        match segment {
            Segment::Escape(seq) => tokens.push(Token::Escape(seq.to_owned())),
            Segment::Text(text) => tokens.extend(text.chars().map(Token::Char)),
        }
    }
    tokens
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Word,
    Space,
}

/// A maximal run of word (or whitespace) characters with the escape
/// sequences that fall inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub kind: RunKind,
    pub tokens: Vec<Token>,
}

/// Group tokens into alternating word and space runs.
#[must_use]
pub fn group_runs(tokens: Vec<Token>) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for token in tokens {
        let kind = match &token {
            Token::Escape(_) => match runs.last_mut() {
                Some(run) => {
                    run.tokens.push(token);
                    continue;
                }
                None => RunKind::Word,
            },
            Token::Char(c) if c.is_whitespace() => RunKind::Space,
            Token::Char(_) => RunKind::Word,
        };
        match runs.last_mut() {
            Some(run) if run.kind == kind => run.tokens.push(token),
            _ => runs.push(Run {
                kind,
                tokens: vec![token],
            }),
        }
    }
    runs
}

fn assemble(runs: &[Run]) -> String {
    let mut out = String::new();
    for token in runs.iter().flat_map(|r| &r.tokens) {
        token.push_to(&mut out);
    }
    out
}

/// The word-removal animation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReverseStreamer {
    /// Pause after each redraw.
    pub delay: Duration,
    /// Growth factor of words removed per round. `1.0` removes one word
    /// per round throughout.
    pub acceleration: f64,
    /// Acceleration only applies to replies with more words than this.
    pub accelerate_after_words: usize,
}

impl Default for ReverseStreamer {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(80),
            acceleration: 1.0,
            accelerate_after_words: 40,
        }
    }
}

impl ReverseStreamer {
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            acceleration: 1.0,
            accelerate_after_words: 40,
        }
    }

    #[must_use]
    pub const fn with_acceleration(mut self, factor: f64, after_words: usize) -> Self {
        self.acceleration = factor;
        self.accelerate_after_words = after_words;
        self
    }

    /// The text left after each round, ending with the round that removes
    /// the last word.
    #[must_use]
    pub fn rounds(&self, styled: &str) -> Vec<String> {
        let mut runs = group_runs(tokenize(styled));
        let total = runs.iter().filter(|r| r.kind == RunKind::Word).count();
        let accelerate = self.acceleration > 1.0 && total > self.accelerate_after_words;

        let mut frames = Vec::new();
        let mut rate = 1.0_f64;
        let mut remaining = total;
        while remaining > 0 {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let batch = (rate.floor() as usize).max(1);
            for _ in 0..batch {
                if runs.last().is_some_and(|r| r.kind == RunKind::Space) {
                    runs.pop();
                }
                if runs.pop().is_some() {
                    remaining -= 1;
                }
                if remaining == 0 {
                    break;
                }
            }
            frames.push(assemble(&runs));
            if accelerate {
                rate *= self.acceleration;
            }
        }
        log::trace!("reverse: {total} words in {} rounds", frames.len());
        frames
    }

    /// Frames that shrink the trailing punctuation of `preserved`.
    ///
    /// An ellipsis always goes 3, 2, 1, 0 dots, however many the message
    /// had. A run of `?` or `!` shrinks from its own length. Messages
    /// without trailing punctuation produce no frames.
    #[must_use]
    pub fn punctuation_frames(preserved: &str) -> Vec<String> {
        let Some(last) = preserved.chars().last() else {
            return Vec::new();
        };
        if !matches!(last, '.' | '?' | '!') {
            return Vec::new();
        }
        let base = preserved.trim_end_matches(last);
        let from = if last == '.' {
            ELLIPSIS
        } else {
            preserved.len() - base.len()
        };
        (0..=from)
            .rev()
            .map(|n| {
                let mut frame = base.to_owned();
                frame.extend(std::iter::repeat_n(last, n));
                frame
            })
            .collect()
    }

    /// Play the animation on `display`.
    ///
    /// `preserved` is redrawn above the remaining words and then shrinks.
    /// `prefix` is redrawn above both; when `styled` starts with it, only
    /// the text after it is animated.
    ///
    /// # Errors
    ///
    /// [`AnimError::Io`] if a frame cannot be written.
    pub async fn run(
        &self,
        display: &Display,
        styled: &str,
        preserved: Option<&str>,
        prefix: Option<&str>,
    ) -> Result<(), AnimError> {
        let _cursor = display.hide_cursor_guard()?;
        let body = prefix
            .and_then(|p| styled.strip_prefix(p))
            .map_or(styled, str::trim_start);

        for frame in self.rounds(body) {
            display.animated_update(&frame, preserved, prefix)?;
            tokio::time::sleep(self.delay).await;
        }
        if let Some(message) = preserved {
            for frame in Self::punctuation_frames(message) {
                display.animated_update("", Some(&frame), prefix)?;
                tokio::time::sleep(self.delay).await;
            }
        }
        Ok(())
    }
}
