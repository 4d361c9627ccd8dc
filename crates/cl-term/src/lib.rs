// SPDX-License-Identifier: MIT
//
// cl-term — Terminal layer for chatline.
//
// Everything that touches the terminal at the byte level: raw mode and its
// panic-safe restore, ANSI encoding, a console abstraction that tests can
// replace, a byte-at-a-time key decoder, and a line editor that soft-wraps
// its input and redraws it with relative cursor moves in a single write.
//
// Like the rest of the workspace this crate talks to the terminal directly
// through termios and escape sequences. The chat front-end stays on the
// primary screen, so there is no screen buffer and no diffing here; the
// editor's only model of the screen is the row its cursor was left on.

pub mod ansi;
pub mod color;
pub mod console;
pub mod edit;
pub mod input;
pub mod line;
pub mod output;
pub mod reader;
pub mod terminal;
pub mod width;

pub use color::Color;
pub use console::{Console, MemoryConsole, StdoutConsole};
pub use line::{EditorConfig, LineEditor, LineError, LineResult};
pub use reader::LineReader;
pub use terminal::{RawMode, Size};
