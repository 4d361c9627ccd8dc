// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Background line reader.
//
// `read_line` blocks in `read()` on stdin. Called from an async task it
// would stall every other task on the runtime, animations included, so it
// runs on a dedicated thread and hands its single result back through a
// `tokio::sync::oneshot` channel. The async side awaits the result like
// any other future.
//
// Shutdown: the stdin source polls the file descriptor with a short
// timeout and checks an `AtomicBool` stop flag between polls, so a reader
// that is no longer wanted (the session ended while a prompt was showing)
// exits within one poll interval instead of holding the thread in `read()`.

use std::io::{self, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use tokio::sync::oneshot;

use crate::console::{Console, StdoutConsole};
use crate::line::{EditorConfig, LineEditor, LineError, LineResult};

/// How often the stdin source checks the stop flag (milliseconds).
const POLL_TIMEOUT_MS: i32 = 50;

// ─── StdinSource ────────────────────────────────────────────────────────────

/// Stdin as a [`Read`] that gives up (reports end of file) once `stop` is set.
pub struct StdinSource {
    stop: Arc<AtomicBool>,
}

impl StdinSource {
    /// A source observing `stop`.
    #[must_use]
    pub const fn new(stop: Arc<AtomicBool>) -> Self {
        Self { stop }
    }
}

impl Read for StdinSource {
    #[cfg(unix)]
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        use std::os::unix::io::AsRawFd;

        let fd = io::stdin().as_raw_fd();
        loop {
            if self.stop.load(Ordering::Relaxed) {
                return Ok(0);
            }

            let ready = unsafe {
                let mut pfd = libc::pollfd {
                    fd,
                    events: libc::POLLIN,
                    revents: 0,
                };
                libc::poll(&raw mut pfd, 1, POLL_TIMEOUT_MS)
            };

            // Timeout or EINTR: loop back to check the stop flag.
            if ready <= 0 {
                continue;
            }

            let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
            if n < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(err);
            }

            #[allow(clippy::cast_sign_loss)] // n >= 0 checked above.
            let n = n as usize;
            return Ok(n);
        }
    }

    /// Non-unix fallback: a plain blocking read, stop checked once per call.
    #[cfg(not(unix))]
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.stop.load(Ordering::Relaxed) {
            return Ok(0);
        }
        io::stdin().lock().read(buf)
    }
}

// ─── LineReader ─────────────────────────────────────────────────────────────

/// A `read_line` running on its own thread.
///
/// # Example
///
/// ```no_run
/// use cl_term::line::EditorConfig;
/// use cl_term::reader::LineReader;
///
/// # async fn demo() -> Result<(), cl_term::line::LineError> {
/// let reader = LineReader::spawn("> ".into(), None, EditorConfig::default());
/// let result = reader.result().await?;
/// # Ok(())
/// # }
/// ```
pub struct LineReader {
    rx: Option<oneshot::Receiver<Result<LineResult, LineError>>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl LineReader {
    /// Read a line from the real terminal: stdin in raw mode, stdout.
    ///
    /// # Panics
    ///
    /// Panics if the OS cannot spawn a new thread (extremely rare).
    #[must_use]
    pub fn spawn(prompt: String, default: Option<String>, config: EditorConfig) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let source = StdinSource::new(Arc::clone(&stop));
        let editor = LineEditor::new(source, StdoutConsole, config).raw_mode(true);
        Self::spawn_editor(editor, prompt, default, stop)
    }

    /// Run `read_line` on `editor` in a background thread.
    ///
    /// `stop` is the flag the editor's byte source observes; it is set when
    /// the reader is dropped.
    ///
    /// # Panics
    ///
    /// Panics if the OS cannot spawn a new thread (extremely rare).
    #[must_use]
    pub fn spawn_editor<R, C>(
        mut editor: LineEditor<R, C>,
        prompt: String,
        default: Option<String>,
        stop: Arc<AtomicBool>,
    ) -> Self
    where
        R: Read + Send + 'static,
        C: Console + 'static,
    {
        let (tx, rx) = oneshot::channel();

        let handle = thread::Builder::new()
            .name("line-reader".into())
            .spawn(move || {
                let result = editor.read_line(&prompt, default.as_deref());
                if let Err(ref e) = result {
                    log::debug!("read_line ended: {e}");
                }
                // Receiver gone means the caller stopped waiting.
                let _ = tx.send(result);
            })
            .expect("failed to spawn line reader thread");

        Self {
            rx: Some(rx),
            stop,
            handle: Some(handle),
        }
    }

    /// Wait for the line.
    ///
    /// # Errors
    ///
    /// Whatever `read_line` returned, or [`LineError::Io`] if the reader
    /// thread died without answering.
    pub async fn result(mut self) -> Result<LineResult, LineError> {
        let Some(rx) = self.rx.take() else {
            return Err(LineError::Eof);
        };
        let result = rx
            .await
            .map_err(|_| io::Error::other("line reader thread exited without a result"))?;
        if let Some(handle) = self.handle.take() {
            // The thread has already sent its result; this join is immediate.
            let _ = handle.join();
        }
        result
    }
}

impl Drop for LineReader {
    fn drop(&mut self) {
        // Don't join: the thread may still be in a poll interval, and drop
        // can run inside an async task.
        self.stop.store(true, Ordering::Relaxed);
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
