//! Loading dots.
//!
//! While a request is in flight the prompt line shows `Loading`, then
//! `Loading.`, `Loading..`, `Loading...`, and back to `Loading`, one step
//! per interval. The punctuation follows the prompt: a prompt ending in
//! `?` or `!` animates with that character instead of `.`.
//!
//! Once content starts arriving the loader is *resolved*. It stops
//! cycling, counts up to three dots, writes the three-dot frame followed
//! by a blank line, and fires its completion signal. Content is only
//! shown after that, so the reply never lands in the middle of the dots.
//!
//! ```text
//! Idle ──start──▶ Animating ──resolve──▶ Resolving ──(3 dots)──▶ Done
//!   └──────────────── start (animation disabled) ───────────────▶┘
//! ```

use std::time::Duration;

use crate::AnimError;
use crate::display::Display;
use crate::signal::Signal;

/// Maximum number of dots.
const MAX_DOTS: u8 = 3;

/// Loader lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderState {
    Idle,
    Animating,
    Resolving,
    Done,
}

/// The loading-dots state machine.
#[derive(Debug, Clone)]
pub struct DotLoader {
    prompt: String,
    dot_char: char,
    dots: u8,
    state: LoaderState,
    enabled: bool,
}

impl DotLoader {
    /// A loader for `prompt`. Trailing `.`, `?` and `!` are moved from the
    /// prompt into the animation.
    #[must_use]
    pub fn new(prompt: &str, enabled: bool) -> Self {
        let base = prompt.trim_end_matches(['.', '?', '!']);
        let dot_char = match prompt.chars().last() {
            Some(c @ ('?' | '!')) => c,
            _ => '.',
        };
        let dots = u8::from(base.len() != prompt.len());
        Self {
            prompt: base.to_owned(),
            dot_char,
            dots,
            state: LoaderState::Idle,
            enabled,
        }
    }

    #[must_use]
    pub const fn state(&self) -> LoaderState {
        self.state
    }

    #[must_use]
    pub const fn dot_count(&self) -> u8 {
        self.dots
    }

    #[must_use]
    pub const fn dot_char(&self) -> char {
        self.dot_char
    }

    /// The prompt with its trailing punctuation removed.
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Begin animating. With animation disabled the loader goes straight
    /// to [`LoaderState::Done`].
    pub fn start(&mut self) -> LoaderState {
        if self.state == LoaderState::Idle {
            self.state = if self.enabled {
                LoaderState::Animating
            } else {
                LoaderState::Done
            };
            log::debug!("loader {:?}", self.state);
        }
        self.state
    }

    /// Content has arrived: stop cycling and wind down.
    pub fn resolve(&mut self) -> LoaderState {
        match self.state {
            LoaderState::Animating => {
                self.state = LoaderState::Resolving;
                log::debug!("loader resolving at {} dots", self.dots);
            }
            LoaderState::Idle => self.state = LoaderState::Done,
            LoaderState::Resolving | LoaderState::Done => {}
        }
        self.state
    }

    /// Advance one interval.
    ///
    /// Animating cycles 0 → 1 → 2 → 3 → 0. Resolving only counts up, and a
    /// tick taken at three dots finishes the loader.
    pub fn tick(&mut self) -> LoaderState {
        match self.state {
            LoaderState::Animating => self.dots = (self.dots + 1) % (MAX_DOTS + 1),
            LoaderState::Resolving if self.dots >= MAX_DOTS => {
                self.state = LoaderState::Done;
                log::debug!("loader done");
            }
            LoaderState::Resolving => self.dots += 1,
            LoaderState::Idle | LoaderState::Done => {}
        }
        self.state
    }

    /// The dots for the current count.
    #[must_use]
    pub fn dots(&self) -> String {
        std::iter::repeat_n(self.dot_char, usize::from(self.dots)).collect()
    }

    /// The visible text of the current frame.
    #[must_use]
    pub fn frame(&self) -> String {
        format!("{}{}", self.prompt, self.dots())
    }

    /// The frame left on screen once the loader is done.
    #[must_use]
    pub fn final_frame(&self) -> String {
        let mut frame = self.prompt.clone();
        frame.extend(std::iter::repeat_n(self.dot_char, usize::from(MAX_DOTS)));
        frame
    }

    /// Animate on `display` until resolved, then fire `completion`.
    ///
    /// `resolved` is checked once per interval. `cancel` cuts the current
    /// interval short and ends the animation with
    /// [`AnimError::Interrupted`]. `completion` is fired on every exit
    /// path, so nothing waiting on it is left hanging.
    ///
    /// # Errors
    ///
    /// [`AnimError::Io`] if a frame cannot be written,
    /// [`AnimError::Interrupted`] if `cancel` fires first.
    pub async fn run(
        mut self,
        display: &Display,
        interval: Duration,
        resolved: &Signal,
        completion: &Signal,
        cancel: &Signal,
    ) -> Result<(), AnimError> {
        let result = self.animate(display, interval, resolved, cancel).await;
        completion.fire();
        result
    }

    async fn animate(
        &mut self,
        display: &Display,
        interval: Duration,
        resolved: &Signal,
        cancel: &Signal,
    ) -> Result<(), AnimError> {
        if self.start() == LoaderState::Done {
            return Ok(());
        }

        loop {
            display.loading_frame(&self.prompt, &self.dots())?;

            tokio::select! {
                () = tokio::time::sleep(interval) => {}
                () = cancel.wait() => return Err(AnimError::Interrupted),
            }

            if resolved.is_set() {
                self.resolve();
            }
            if self.tick() == LoaderState::Done {
                display.loading_frame(&self.prompt, &self.dots())?;
                display.write("\n\n")?;
                return Ok(());
            }
        }
    }
}
