//! Rendering one streamed reply.
//!
//! [`Coordinator::run_with_loading`] runs two futures side by side on the
//! current task: the [`DotLoader`] animation and the consumer of the
//! producer's chunk stream. The first chunk resolves the loader. Until the
//! loader reports completion, chunks are only queued, each with its
//! arrival time; afterwards the queue is replayed with the same gaps
//! between chunks, so the loader's wind-down does not show up as one burst
//! of text. Then the rest of the stream is styled as it arrives, directly
//! or through an [`AdaptiveBuffer`].
//!
//! The result is the pair the chat history stores: the raw text as
//! produced, and the styled text as written to the terminal.

use std::time::Duration;

use cl_style::StyleEngine;
use futures::{Stream, StreamExt};
use tokio::time::Instant;

use crate::AnimError;
use crate::adaptive::{self, AdaptiveBuffer, PacingMode};
use crate::display::Display;
use crate::dot_loader::DotLoader;
use crate::signal::Signal;

/// Animation and pacing settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationConfig {
    /// Show the loading dots at all.
    pub enabled: bool,
    pub dot_interval: Duration,
    pub pacing: PacingMode,
    /// Arrival timestamps kept by the adaptive buffer.
    pub window: usize,
    /// Adaptive release interval before two arrivals are known.
    pub default_interval: Duration,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dot_interval: Duration::from_millis(400),
            pacing: PacingMode::Immediate,
            window: adaptive::DEFAULT_WINDOW,
            default_interval: adaptive::DEFAULT_INTERVAL,
        }
    }
}

/// Loader, styling and pacing for a conversation.
pub struct Coordinator {
    display: Display,
    engine: StyleEngine,
    config: AnimationConfig,
}

impl Coordinator {
    #[must_use]
    pub const fn new(display: Display, engine: StyleEngine, config: AnimationConfig) -> Self {
        Self {
            display,
            engine,
            config,
        }
    }

    #[must_use]
    pub const fn display(&self) -> &Display {
        &self.display
    }

    #[must_use]
    pub const fn config(&self) -> &AnimationConfig {
        &self.config
    }

    pub const fn engine_mut(&mut self) -> &mut StyleEngine {
        &mut self.engine
    }

    /// Show the loader for `prompt`, then render `stream`.
    ///
    /// # Errors
    ///
    /// [`AnimError::Io`] if the terminal cannot be written.
    pub async fn run_with_loading<S>(
        &mut self,
        prompt: &str,
        stream: S,
    ) -> Result<(String, String), AnimError>
    where
        S: Stream<Item = String>,
    {
        self.run_with_cancel(prompt, stream, &Signal::new()).await
    }

    /// [`run_with_loading`](Self::run_with_loading), stopping early once
    /// `cancel` fires.
    ///
    /// Cancellation is noticed at every wait: between loader frames, while
    /// waiting for chunks, and between replayed chunks. The cursor is shown
    /// again before this returns, on every path.
    ///
    /// # Errors
    ///
    /// [`AnimError::Io`] if the terminal cannot be written,
    /// [`AnimError::Interrupted`] if `cancel` fires first.
    pub async fn run_with_cancel<S>(
        &mut self,
        prompt: &str,
        stream: S,
        cancel: &Signal,
    ) -> Result<(String, String), AnimError>
    where
        S: Stream<Item = String>,
    {
        let loader = DotLoader::new(prompt, self.config.enabled);
        self.run_turn(loader, stream, cancel).await
    }

    /// Render `stream` with no loader and no prompt line, as for a reply to
    /// a message the user never typed.
    ///
    /// # Errors
    ///
    /// As for [`run_with_cancel`](Self::run_with_cancel).
    pub async fn run_silent<S>(
        &mut self,
        stream: S,
        cancel: &Signal,
    ) -> Result<(String, String), AnimError>
    where
        S: Stream<Item = String>,
    {
        self.run_turn(DotLoader::new("", false), stream, cancel).await
    }

    async fn run_turn<S>(
        &mut self,
        loader: DotLoader,
        stream: S,
        cancel: &Signal,
    ) -> Result<(String, String), AnimError>
    where
        S: Stream<Item = String>,
    {
        let display = self.display.clone();
        let _cursor = display.hide_cursor_guard()?;

        let resolved = Signal::new();
        let completion = Signal::new();

        let mut turn = Turn {
            engine: &mut self.engine,
            display: &display,
            pacing: self.config.pacing,
            pacer: AdaptiveBuffer::new(self.config.window, self.config.default_interval),
            raw: String::new(),
            styled: String::new(),
        };

        let (animated, consumed) = tokio::join!(
            loader.run(&display, self.config.dot_interval, &resolved, &completion, cancel),
            turn.consume(stream, &resolved, &completion, cancel),
        );
        animated?;
        consumed?;

        log::debug!("reply rendered: {} bytes raw", turn.raw.len());
        Ok((turn.raw, turn.styled))
    }
}

/// State of one reply while it streams.
struct Turn<'a> {
    engine: &'a mut StyleEngine,
    display: &'a Display,
    pacing: PacingMode,
    pacer: AdaptiveBuffer,
    raw: String,
    styled: String,
}

impl Turn<'_> {
    async fn consume<S>(
        &mut self,
        stream: S,
        resolved: &Signal,
        completion: &Signal,
        cancel: &Signal,
    ) -> Result<(), AnimError>
    where
        S: Stream<Item = String>,
    {
        let mut stream = std::pin::pin!(stream);
        let mut early: Vec<(Instant, String)> = Vec::new();
        let mut ended = false;

        // Queue everything that arrives while the loader is still drawing.
        while !completion.is_set() && !ended {
            tokio::select! {
                () = cancel.wait() => return Err(AnimError::Interrupted),
                () = completion.wait() => {}
                item = stream.next() => match item {
                    Some(chunk) => {
                        resolved.fire();
                        early.push((Instant::now(), chunk));
                    }
                    None => ended = true,
                },
            }
        }
        // An empty stream still winds the loader down.
        resolved.fire();
        tokio::select! {
            () = cancel.wait() => return Err(AnimError::Interrupted),
            () = completion.wait() => {}
        }

        if !early.is_empty() {
            log::debug!("replaying {} queued chunks", early.len());
        }
        let mut previous = None;
        for (at, chunk) in early {
            if let Some(prev) = previous {
                pause(at.duration_since(prev), cancel).await?;
            }
            previous = Some(at);
            self.accept(chunk)?;
            self.release()?;
        }

        while !ended {
            self.release()?;
            let wait = self.pacer.time_until_ready(Instant::now());
            tokio::select! {
                biased;
                () = cancel.wait() => return Err(AnimError::Interrupted),
                item = stream.next() => match item {
                    Some(chunk) => self.accept(chunk)?,
                    None => ended = true,
                },
                () = tokio::time::sleep(wait.unwrap_or_default()), if wait.is_some() => {}
            }
        }

        for chunk in self.pacer.drain() {
            self.emit(&chunk)?;
        }
        let tail = self.engine.flush();
        self.write(&tail)?;
        Ok(())
    }

    /// Take a chunk from the producer.
    fn accept(&mut self, chunk: String) -> Result<(), AnimError> {
        self.raw.push_str(&chunk);
        match self.pacing {
            PacingMode::Immediate => self.emit(&chunk),
            PacingMode::Adaptive => {
                self.pacer.push(chunk, Instant::now());
                Ok(())
            }
        }
    }

    /// Emit whatever the pacer is ready to let go of now.
    fn release(&mut self) -> Result<(), AnimError> {
        while let Some(chunk) = self.pacer.release_ready(Instant::now()) {
            self.emit(&chunk)?;
        }
        Ok(())
    }

    fn emit(&mut self, chunk: &str) -> Result<(), AnimError> {
        let styled = self.engine.style(chunk);
        self.write(&styled)
    }

    fn write(&mut self, styled: &str) -> Result<(), AnimError> {
        self.display.write(styled)?;
        self.styled.push_str(styled);
        Ok(())
    }
}

async fn pause(duration: Duration, cancel: &Signal) -> Result<(), AnimError> {
    tokio::select! {
        () = tokio::time::sleep(duration) => Ok(()),
        () = cancel.wait() => Err(AnimError::Interrupted),
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use cl_style::visible::strip_ansi;
    use cl_style::{PatternRegistry, WrapWidth};
    use cl_term::Size;
    use cl_term::console::{Console, FALLBACK_SIZE};
    use futures::stream;
    use pretty_assertions::assert_eq;

    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    /// Records each write with the (virtual) time it happened.
    #[derive(Clone)]
    struct TimedConsole {
        start: Instant,
        writes: Arc<Mutex<Vec<(Duration, String)>>>,
    }

    impl TimedConsole {
        fn new() -> Self {
            Self {
                start: Instant::now(),
                writes: Arc::default(),
            }
        }

        /// Time of the first write containing `needle`.
        fn time_of(&self, needle: &str) -> Duration {
            self.writes
                .lock()
                .unwrap()
                .iter()
                .find(|(_, s)| s.contains(needle))
                .map(|(t, _)| *t)
                .unwrap_or_else(|| panic!("{needle:?} never written"))
        }

        fn contents(&self) -> String {
            self.writes.lock().unwrap().iter().map(|(_, s)| s.as_str()).collect()
        }
    }

    impl Console for TimedConsole {
        fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
            let text = String::from_utf8_lossy(bytes).into_owned();
            self.writes.lock().unwrap().push((self.start.elapsed(), text));
            Ok(())
        }

        fn size(&self) -> Size {
            FALLBACK_SIZE
        }
    }

    /// Chunks arriving after the given delays, then the end of the stream
    /// `end_after` later.
    fn timed(chunks: &[(u64, &'static str)], end_after: u64) -> impl Stream<Item = String> {
        let items = stream::iter(chunks.to_vec()).then(|(delay, text)| async move {
            if delay > 0 {
                tokio::time::sleep(ms(delay)).await;
            }
            text.to_owned()
        });
        let end = stream::once(async move {
            if end_after > 0 {
                tokio::time::sleep(ms(end_after)).await;
            }
        })
        .filter_map(|()| async { None::<String> });
        items.chain(end)
    }

    fn coordinator(console: &TimedConsole, config: AnimationConfig) -> Coordinator {
        let engine = StyleEngine::new(PatternRegistry::default_table(), WrapWidth::Fixed(80));
        Coordinator::new(Display::new(console.clone()), engine, config)
    }

    #[tokio::test(start_paused = true)]
    async fn early_chunks_replay_with_original_gaps() {
        let console = TimedConsole::new();
        let mut coordinator = coordinator(&console, AnimationConfig::default());

        // Arrivals at 100, 250 and 600 ms, all before the loader finishes.
        let stream = timed(&[(100, "alpha "), (150, "bravo "), (350, "charlie")], 0);
        let (raw, styled) = coordinator.run_with_loading("Loading", stream).await.unwrap();

        assert_eq!(raw, "alpha bravo charlie");
        assert_eq!(strip_ansi(&styled), "alpha bravo charlie\n");

        // Resolved at 100, the loader reaches three dots and finishes at 1600.
        assert_eq!(console.time_of("\n\n"), ms(1600));
        assert_eq!(console.time_of("alpha"), ms(1600));
        assert_eq!(console.time_of("bravo") - console.time_of("alpha"), ms(150));
        assert_eq!(console.time_of("charlie") - console.time_of("bravo"), ms(350));

        let out = console.contents();
        let dots_done = out.find("Loading...\n\n").unwrap();
        assert!(dots_done < out.find("alpha").unwrap());
        assert!(out.starts_with("\x1b[?25l"));
        assert!(out.ends_with("\x1b[?25h"));
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_animation_streams_as_chunks_arrive() {
        let console = TimedConsole::new();
        let config = AnimationConfig {
            enabled: false,
            ..AnimationConfig::default()
        };
        let mut coordinator = coordinator(&console, config);

        let stream = timed(&[(100, "alpha "), (150, "bravo "), (50, "end")], 0);
        let (raw, _) = coordinator.run_with_loading("Loading", stream).await.unwrap();

        assert_eq!(raw, "alpha bravo end");
        assert_eq!(console.time_of("alpha"), ms(100));
        assert_eq!(console.time_of("bravo"), ms(250));
        assert!(!console.contents().contains("Loading"));
    }

    #[tokio::test(start_paused = true)]
    async fn silent_run_shows_no_loader_even_when_enabled() {
        let console = TimedConsole::new();
        let mut coordinator = coordinator(&console, AnimationConfig::default());

        let stream = timed(&[(100, "hello "), (50, "there")], 0);
        let (raw, styled) = coordinator
            .run_silent(stream, &Signal::new())
            .await
            .unwrap();

        assert_eq!(raw, "hello there");
        assert_eq!(strip_ansi(&styled), "hello there\n");
        assert_eq!(console.time_of("hello"), ms(100));
        assert!(!console.contents().contains("\x1b[2K"));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_stream_still_resolves_loader() {
        let console = TimedConsole::new();
        let mut coordinator = coordinator(&console, AnimationConfig::default());

        let (raw, styled) = coordinator
            .run_with_loading("Loading", timed(&[], 0))
            .await
            .unwrap();

        assert_eq!(raw, "");
        assert_eq!(styled, "\x1b[0m");
        assert!(console.contents().contains("Loading...\n\n"));
    }

    #[tokio::test(start_paused = true)]
    async fn adaptive_pacing_spreads_a_burst() {
        let console = TimedConsole::new();
        let config = AnimationConfig {
            enabled: false,
            pacing: PacingMode::Adaptive,
            ..AnimationConfig::default()
        };
        let mut coordinator = coordinator(&console, config);

        // One chunk, a 200 ms gap, then three at once.
        let stream = timed(
            &[(0, "alpha "), (200, "bravo "), (0, "charlie "), (0, "delta ")],
            1000,
        );
        let (raw, styled) = coordinator.run_with_loading("Loading", stream).await.unwrap();
        assert_eq!(raw, "alpha bravo charlie delta ");
        assert_eq!(strip_ansi(&styled), "alpha bravo charlie delta \n");

        let bravo = console.time_of("bravo");
        let charlie = console.time_of("charlie");
        let delta = console.time_of("delta");
        assert_eq!(bravo, ms(200));
        // Four arrivals over 200 ms: interval is a third of 100 ms.
        for gap in [charlie - bravo, delta - charlie] {
            assert!(gap >= ms(33) && gap <= ms(35), "gap {gap:?}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_and_restores_cursor() {
        let console = TimedConsole::new();
        let mut coordinator = coordinator(&console, AnimationConfig::default());
        let cancel = Arc::new(Signal::new());

        let trigger = {
            let cancel = Arc::clone(&cancel);
            async move {
                tokio::time::sleep(ms(500)).await;
                cancel.fire();
            }
        };
        let stream = timed(&[(10_000, "late")], 0);
        let (result, ()) = tokio::join!(
            coordinator.run_with_cancel("Loading", stream, &cancel),
            trigger
        );

        assert!(matches!(result, Err(AnimError::Interrupted)));
        assert!(console.contents().ends_with("\x1b[?25h"));
        assert!(!coordinator.display().cursor_hidden());
    }
}
