// SPDX-License-Identifier: MIT
//
// Terminal control — raw mode, size queries, and RAII cleanup.
//
// Safety: This module necessarily uses `unsafe` for termios (tcgetattr,
// tcsetattr), ioctl (TIOCGWINSZ), isatty, and raw fd writes. These are
// the standard POSIX interfaces for terminal control, and there is no safe
// alternative. Each unsafe block is minimal and documented.
#![allow(unsafe_code)]
//
// Unlike a full-screen TUI, the chat front-end stays on the primary screen:
// the conversation scrolls like ordinary shell output and only the input
// line is redrawn in place. Raw mode is therefore held only while a line is
// being read, through the `RawMode` guard, and released the moment the
// guard drops: on Enter, on Ctrl-C, on an I/O error, or during a panic
// unwind.
//
// The panic hook covers the one path a guard cannot: a panic on another
// thread while this one is blocked in `read()`. It writes a pre-built
// restore sequence directly to fd 1, bypassing Rust's stdout lock, then
// restores termios from a global backup and hands over to the original
// hook so the panic message lands on a working terminal.

use std::io;
use std::sync::Once;
#[cfg(unix)]
use std::sync::Mutex;

// ─── Size ───────────────────────────────────────────────────────────────────

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    /// Number of columns (width in character cells).
    pub cols: u16,
    /// Number of rows (height in character cells).
    pub rows: u16,
}

// ─── Terminal Queries ───────────────────────────────────────────────────────

/// Query the current terminal size via `ioctl(TIOCGWINSZ)`.
///
/// Returns `None` if stdout is not a terminal or the query fails.
#[cfg(unix)]
#[must_use]
pub fn get_size() -> Option<Size> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let result = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut ws) };

    if result == 0 && ws.ws_col > 0 && ws.ws_row > 0 {
        Some(Size {
            cols: ws.ws_col,
            rows: ws.ws_row,
        })
    } else {
        None
    }
}

#[cfg(not(unix))]
#[must_use]
pub fn get_size() -> Option<Size> {
    None
}

/// Check whether stdin is connected to a terminal (TTY).
#[cfg(unix)]
#[must_use]
pub fn is_tty() -> bool {
    unsafe { libc::isatty(libc::STDIN_FILENO) != 0 }
}

#[cfg(not(unix))]
#[must_use]
pub fn is_tty() -> bool {
    false
}

/// Check whether stdout is connected to a terminal (TTY).
#[cfg(unix)]
#[must_use]
pub fn stdout_is_tty() -> bool {
    unsafe { libc::isatty(libc::STDOUT_FILENO) != 0 }
}

#[cfg(not(unix))]
#[must_use]
pub fn stdout_is_tty() -> bool {
    false
}

// ─── Panic-Safe Terminal Restore ────────────────────────────────────────────

/// Global backup of original termios for panic recovery.
///
/// The [`RawMode`] guard owns its own copy, but the panic hook can't
/// access it. This global backup (behind a [`Mutex`], not `static mut`)
/// lets the hook restore cooked mode without the guard.
#[cfg(unix)]
static TERMIOS_BACKUP: Mutex<Option<libc::termios>> = Mutex::new(None);

/// Restore termios from the global backup. Best-effort, ignores errors.
#[cfg(unix)]
fn restore_termios_from_backup() {
    if let Ok(guard) = TERMIOS_BACKUP.lock() {
        if let Some(ref original) = *guard {
            unsafe {
                let _ = libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, original);
            }
        }
    }
}

/// Restore sequence for emergency use: reset SGR attributes, show cursor.
///
/// The chat front-end never enters the alternate screen or enables mouse
/// and keyboard protocols, so this is all a crash can leave behind.
const EMERGENCY_RESTORE: &[u8] = b"\x1b[0m\x1b[?25h";

/// Panic hook guard — ensures the hook is installed at most once per process.
static PANIC_HOOK_INSTALLED: Once = Once::new();

/// Install a panic hook that restores the terminal before printing the error.
///
/// Without this, a panic in raw mode leaves the user's terminal broken:
/// no echo, no line editing, hidden cursor. Our hook writes
/// [`EMERGENCY_RESTORE`] directly to fd 1 (bypassing Rust's stdout lock to
/// avoid deadlock), restores termios, then delegates to the original panic
/// handler so the error prints to a working terminal.
pub fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let original = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            emergency_restore();

            #[cfg(unix)]
            restore_termios_from_backup();

            original(info);
        }));
    });
}

/// Write the restore sequence directly to stdout's file descriptor.
fn emergency_restore() {
    #[cfg(unix)]
    unsafe {
        let _ = libc::write(
            libc::STDOUT_FILENO,
            EMERGENCY_RESTORE.as_ptr().cast::<libc::c_void>(),
            EMERGENCY_RESTORE.len(),
        );
    }

    #[cfg(not(unix))]
    {
        use std::io::Write;
        let _ = io::stdout().write_all(EMERGENCY_RESTORE);
        let _ = io::stdout().flush();
    }
}

// ─── RawMode ────────────────────────────────────────────────────────────────

/// Scoped raw mode.
///
/// Entering disables echo, canonical line buffering, signal generation
/// (Ctrl-C arrives as byte `0x03` so the line editor can print `^C` itself)
/// and output post-processing. Dropping the guard restores the exact
/// termios captured on entry.
///
/// When stdin is not a TTY (tests, piped input) the guard is inert.
///
/// # Example
///
/// ```no_run
/// use cl_term::terminal::RawMode;
///
/// {
///     let _raw = RawMode::enter()?;
///     // ... read bytes one at a time ...
/// } // cooked mode restored here, even on early return or panic.
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct RawMode {
    /// Original termios saved before entering raw mode.
    #[cfg(unix)]
    original_termios: Option<libc::termios>,
}

impl RawMode {
    /// Enter raw mode (no-op if stdin is not a TTY).
    ///
    /// # Errors
    ///
    /// Returns an error if `tcgetattr`/`tcsetattr` fail.
    #[cfg(unix)]
    pub fn enter() -> io::Result<Self> {
        use std::os::unix::io::AsRawFd;

        install_panic_hook();

        if !is_tty() {
            return Ok(Self {
                original_termios: None,
            });
        }

        let fd = io::stdin().as_raw_fd();

        unsafe {
            let mut termios: libc::termios = std::mem::zeroed();
            if libc::tcgetattr(fd, &raw mut termios) != 0 {
                return Err(io::Error::last_os_error());
            }

            let original = termios;

            // Also save to global backup for the panic hook.
            if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
                *guard = Some(original);
            }

            // cfmakeraw equivalent: disable all line processing.
            termios.c_iflag &= !(libc::IGNBRK
                | libc::BRKINT
                | libc::PARMRK
                | libc::ISTRIP
                | libc::INLCR
                | libc::IGNCR
                | libc::ICRNL
                | libc::IXON);
            termios.c_oflag &= !libc::OPOST;
            termios.c_lflag &=
                !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
            termios.c_cflag &= !(libc::CSIZE | libc::PARENB);
            termios.c_cflag |= libc::CS8;

            // VMIN=1, VTIME=0: read() blocks until at least 1 byte available.
            termios.c_cc[libc::VMIN] = 1;
            termios.c_cc[libc::VTIME] = 0;

            if libc::tcsetattr(fd, libc::TCSAFLUSH, &raw const termios) != 0 {
                return Err(io::Error::last_os_error());
            }

            Ok(Self {
                original_termios: Some(original),
            })
        }
    }

    #[cfg(not(unix))]
    pub fn enter() -> io::Result<Self> {
        install_panic_hook();
        Ok(Self {})
    }

    /// Whether raw mode is really active (false when stdin is not a TTY).
    #[must_use]
    pub const fn is_active(&self) -> bool {
        #[cfg(unix)]
        {
            self.original_termios.is_some()
        }
        #[cfg(not(unix))]
        {
            false
        }
    }

    #[cfg(unix)]
    fn restore(&mut self) -> io::Result<()> {
        if let Some(ref original) = self.original_termios {
            use std::os::unix::io::AsRawFd;
            let fd = io::stdin().as_raw_fd();

            unsafe {
                if libc::tcsetattr(fd, libc::TCSAFLUSH, original) != 0 {
                    return Err(io::Error::last_os_error());
                }
            }

            // Restored; the backup is stale now.
            if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
                *guard = None;
            }

            self.original_termios = None;
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn restore(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            log::warn!("failed to restore terminal mode: {e}");
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── Terminal queries ─────────────────────────────────────────────

    #[test]
    fn get_size_does_not_panic() {
        let _ = get_size();
    }

    #[test]
    fn tty_queries_do_not_panic() {
        let _ = is_tty();
        let _ = stdout_is_tty();
    }

    // ── Emergency restore sequence ──────────────────────────────────

    #[test]
    fn emergency_restore_shows_cursor_last() {
        let s = std::str::from_utf8(EMERGENCY_RESTORE).unwrap();
        assert!(s.starts_with("\x1b[0m"));
        assert!(s.ends_with("\x1b[?25h"));
    }

    #[test]
    fn panic_hook_install_is_idempotent() {
        install_panic_hook();
        install_panic_hook();
    }

    // ── RawMode ──────────────────────────────────────────────────────

    #[test]
    fn raw_mode_enter_and_drop() {
        // Under `cargo test` stdin is usually not a TTY, so the guard is
        // inert, but entering and dropping must never fail either way.
        let raw = RawMode::enter().unwrap();
        drop(raw);
    }

    #[test]
    fn raw_mode_inactive_without_tty() {
        let raw = RawMode::enter().unwrap();
        if !is_tty() {
            assert!(!raw.is_active());
        }
    }
}
