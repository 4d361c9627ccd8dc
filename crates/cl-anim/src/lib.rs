//! # cl-anim — Streaming animations for chatline
//!
//! Everything that moves on screen while a reply is being produced or
//! taken back: the loading dots shown until the first chunk arrives, the
//! word-by-word "un-typing" used before a retry or an edit, the scroll
//! that clears the screen when a message is sent, and the optional pacing
//! layer that smooths bursty chunk arrival.
//!
//! # Architecture
//!
//! ```text
//! signal.rs:       Signal — one-shot flag that can be awaited
//!     │
//! display.rs:      Display — the single locked writer, CursorGuard
//!     │
//!     ├── dot_loader.rs:   DotLoader — Idle → Animating → Resolving → Done
//!     ├── reverse.rs:      ReverseStreamer — token/run grouping, rounds
//!     ├── scroller.rs:     Scroller — previous screen moves up and away
//!     ├── adaptive.rs:     AdaptiveBuffer — windowed release interval
//!     │
//! coordinator.rs:  Coordinator — loader + queued replay + styling + pacing
//! ```
//!
//! All of it runs cooperatively on one tokio task. Time only passes at
//! `tokio::time::sleep` points, so tests drive every animation with the
//! paused test clock instead of real waiting.

pub mod adaptive;
pub mod coordinator;
pub mod display;
pub mod dot_loader;
pub mod reverse;
pub mod scroller;
pub mod signal;

use std::io;

use thiserror::Error;

pub use adaptive::{AdaptiveBuffer, PacingMode};
pub use coordinator::{AnimationConfig, Coordinator};
pub use display::{CursorGuard, Display};
pub use dot_loader::DotLoader;
pub use reverse::ReverseStreamer;
pub use scroller::Scroller;
pub use signal::Signal;

/// Failures while animating or rendering a reply.
#[derive(Debug, Error)]
pub enum AnimError {
    /// Writing to the terminal failed.
    #[error("terminal write failed: {0}")]
    Io(#[from] io::Error),
    /// The operation was cancelled before it finished.
    #[error("interrupted")]
    Interrupted,
}
