//! # cl-style — incremental inline styling for chat output
//!
//! Turns streamed plain text into ANSI-styled text one chunk at a time.
//! Inline markup is delimiter-based: a registered [`Pattern`] opens on its
//! start character and closes on its end character, patterns nest, and the
//! innermost active color wins while bold/italic accumulate.
//!
//! # Architecture
//!
//! ```text
//! palette.rs:  named colors ("pink", "gray", ...) and config color parsing
//!     │
//!     ▼
//! pattern.rs:  Pattern + PatternRegistry (delimiters checked unique)
//!     │
//!     ▼
//! visible.rs:  visible length — ANSI codes and box-drawing chars excluded
//!     │
//!     ▼
//! engine.rs:   StyleEngine — pattern stack, word buffer, word wrap
//!     │
//!     ▼
//! panel.rs:    Panel + Preface — framed blocks fed through the engine
//! ```
//!
//! The engine only produces strings. Writing them to the terminal, and the
//! lock that keeps two writers from interleaving, belong to the caller.

pub mod engine;
pub mod palette;
pub mod panel;
pub mod pattern;
pub mod visible;

use thiserror::Error;

pub use engine::{StyleEngine, WrapWidth};
pub use panel::{Panel, Preface, PrefaceItem};
pub use pattern::{Pattern, PatternRegistry};
pub use visible::{visible_length, visible_width};

/// Pattern table defects. These are configuration errors: the registry
/// refuses to exist rather than style text ambiguously.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StyleError {
    /// Two patterns share a start or end delimiter.
    #[error("pattern `{pattern}` reuses delimiter `{delimiter}`")]
    DuplicateDelimiter { pattern: String, delimiter: char },
    /// Two patterns share a name.
    #[error("pattern `{0}` is defined twice")]
    DuplicateName(String),
}
