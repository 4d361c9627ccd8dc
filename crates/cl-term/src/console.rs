// SPDX-License-Identifier: MIT
//
// Console — where terminal bytes go, and how wide the terminal is.
//
// Everything that draws (the line editor, the style engine's consumer,
// the animations) writes through a `Console` instead of touching stdout
// directly. Production code uses `StdoutConsole`; tests use
// `MemoryConsole`, which records every write and reports whatever size
// the test sets, including a size that changes between two redraws.
//
// Size is never cached here. `StdoutConsole::size` asks the OS every time
// so a resize between two redraws is picked up by the second one.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use crate::terminal::{self, Size};

/// Fallback size when the OS cannot tell us (piped output, tests).
pub const FALLBACK_SIZE: Size = Size { cols: 80, rows: 24 };

/// A byte sink with a queryable size.
pub trait Console: Send {
    /// Write all bytes and flush them to the terminal.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying write or flush fails.
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Current terminal dimensions.
    fn size(&self) -> Size;

    /// Whether this console is an interactive terminal.
    ///
    /// Cursor show/hide is skipped for non-interactive consoles so piped
    /// output stays free of DECTCEM noise.
    fn is_tty(&self) -> bool {
        true
    }
}

// ─── StdoutConsole ──────────────────────────────────────────────────────────

/// The process's standard output.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutConsole;

impl Console for StdoutConsole {
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut lock = io::stdout().lock();
        match lock.write_all(bytes).and_then(|()| lock.flush()) {
            // A closed pipe is not worth crashing a chat session over.
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
            other => other,
        }
    }

    fn size(&self) -> Size {
        terminal::get_size().unwrap_or(FALLBACK_SIZE)
    }

    fn is_tty(&self) -> bool {
        terminal::stdout_is_tty()
    }
}

// ─── MemoryConsole ──────────────────────────────────────────────────────────

#[derive(Debug)]
struct MemoryState {
    bytes: Vec<u8>,
    size: Size,
    writes: usize,
}

/// An in-memory console for tests.
///
/// Clones share the same recording, so a test can hand one clone to the
/// code under test and inspect the other.
#[derive(Debug, Clone)]
pub struct MemoryConsole {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryConsole {
    /// Create an empty console reporting `size`.
    #[must_use]
    pub fn new(size: Size) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState {
                bytes: Vec::new(),
                size,
                writes: 0,
            })),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut MemoryState) -> R) -> R {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Everything written so far, lossily decoded as UTF-8.
    #[must_use]
    pub fn contents(&self) -> String {
        self.with(|s| String::from_utf8_lossy(&s.bytes).into_owned())
    }

    /// Number of `write_bytes` calls so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.with(|s| s.writes)
    }

    /// Change the reported size (simulates a terminal resize).
    pub fn set_size(&self, size: Size) {
        self.with(|s| s.size = size);
    }

    /// Forget everything written so far.
    pub fn clear(&self) {
        self.with(|s| {
            s.bytes.clear();
            s.writes = 0;
        });
    }
}

impl Console for MemoryConsole {
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.with(|s| {
            s.bytes.extend_from_slice(bytes);
            s.writes += 1;
        });
        Ok(())
    }

    fn size(&self) -> Size {
        self.with(|s| s.size)
    }
}

impl<C: Console + ?Sized> Console for Box<C> {
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write_bytes(bytes)
    }

    fn size(&self) -> Size {
        (**self).size()
    }

    fn is_tty(&self) -> bool {
        (**self).is_tty()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
