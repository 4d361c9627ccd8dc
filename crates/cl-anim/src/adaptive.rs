//! Adaptive pacing.
//!
//! Producers deliver text in bursts: nothing for a while, then a dozen
//! chunks at once. In adaptive mode chunks are queued on arrival and
//! released at a steady rate derived from how fast they have been
//! arriving: half the mean gap between the last few arrivals. That keeps
//! output ahead of the producer while smoothing out its bursts.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

/// Arrival timestamps kept for the rate estimate.
pub const DEFAULT_WINDOW: usize = 15;

/// Release interval until two arrivals have been seen.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(80);

/// How chunks reach the style engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PacingMode {
    /// Each chunk is styled as soon as it arrives.
    #[default]
    Immediate,
    /// Chunks are released through an [`AdaptiveBuffer`].
    Adaptive,
}

/// Queue of chunks waiting for release, plus the arrival window.
#[derive(Debug, Clone)]
pub struct AdaptiveBuffer {
    window: usize,
    default_interval: Duration,
    arrivals: VecDeque<Instant>,
    queue: VecDeque<String>,
    last_release: Option<Instant>,
}

impl Default for AdaptiveBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW, DEFAULT_INTERVAL)
    }
}

impl AdaptiveBuffer {
    /// A buffer keeping at most `window` arrival timestamps (at least two).
    #[must_use]
    pub fn new(window: usize, default_interval: Duration) -> Self {
        let window = window.max(2);
        Self {
            window,
            default_interval,
            arrivals: VecDeque::with_capacity(window),
            queue: VecDeque::new(),
            last_release: None,
        }
    }

    /// Queue a chunk that arrived at `now`.
    pub fn push(&mut self, chunk: String, now: Instant) {
        if self.arrivals.len() == self.window {
            self.arrivals.pop_front();
        }
        self.arrivals.push_back(now);
        self.queue.push_back(chunk);
        log::trace!("pacing interval {:?}", self.interval());
    }

    /// Half the mean gap between recorded arrivals.
    #[must_use]
    pub fn interval(&self) -> Duration {
        let (Some(first), Some(last)) = (self.arrivals.front(), self.arrivals.back()) else {
            return self.default_interval;
        };
        let gaps = self.arrivals.len() - 1;
        if gaps == 0 {
            return self.default_interval;
        }
        // Consecutive gaps telescope: their sum is last - first.
        let total = last.duration_since(*first);
        total / u32::try_from(gaps * 2).unwrap_or(u32::MAX)
    }

    /// How long until the next chunk may be released, or `None` if the
    /// queue is empty.
    #[must_use]
    pub fn time_until_ready(&self, now: Instant) -> Option<Duration> {
        if self.queue.is_empty() {
            return None;
        }
        Some(self.last_release.map_or(Duration::ZERO, |last| {
            (last + self.interval()).saturating_duration_since(now)
        }))
    }

    /// Take the next chunk if enough time has passed since the last release.
    pub fn release_ready(&mut self, now: Instant) -> Option<String> {
        if self.time_until_ready(now)? > Duration::ZERO {
            return None;
        }
        self.last_release = Some(now);
        self.queue.pop_front()
    }

    /// Take every queued chunk regardless of timing.
    pub fn drain(&mut self) -> Vec<String> {
        self.queue.drain(..).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
