//! One-shot signals.
//!
//! A [`Signal`] starts unset, can be set exactly once, and wakes everyone
//! waiting on it when it is. Both the loader's "resolved" flag and its
//! completion are signals, as is cancellation.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// A flag that flips once and can be awaited.
#[derive(Debug, Default)]
pub struct Signal {
    set: AtomicBool,
    notify: Notify,
}

impl Signal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the signal. Returns `true` only for the call that set it.
    pub fn fire(&self) -> bool {
        let first = !self.set.swap(true, Ordering::AcqRel);
        if first {
            self.notify.notify_waiters();
        }
        first
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        self.set.load(Ordering::Acquire)
    }

    /// Wait until the signal is set. Returns at once if it already is.
    pub async fn wait(&self) {
        loop {
            // Registered before the check, so a fire in between still wakes us.
            let notified = self.notify.notified();
            if self.is_set() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn fires_once() {
        let signal = Signal::new();
        assert!(!signal.is_set());
        assert!(signal.fire());
        assert!(!signal.fire());
        assert!(signal.is_set());
    }

    #[tokio::test(start_paused = true)]
    async fn wait_returns_when_already_set() {
        let signal = Signal::new();
        signal.fire();
        signal.wait().await;
    }

    #[tokio::test(start_paused = true)]
    async fn wait_wakes_on_fire() {
        let signal = Arc::new(Signal::new());
        let waiter = {
            let signal = Arc::clone(&signal);
            tokio::spawn(async move { signal.wait().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());
        signal.fire();
        waiter.await.unwrap();
    }
}
