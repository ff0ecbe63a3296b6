//! # Global Cooldown Gate
//!
//! A single open/closed signal shared by every bucket. While the gate is
//! closed no new request leaves the dispatcher; when it reopens, every waiter
//! is released at once.
//!
//! Closing is deadline based: several closers may overlap, and the gate only
//! reopens once the latest deadline has passed.

use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

/// Longest single closure; longer requests are clamped to it.
pub const MAX_CLOSED_FOR: Duration = Duration::from_secs(3600);

/// Shared suspend/resume signal for all outbound requests.
#[derive(Debug)]
pub struct GlobalGate {
    open: watch::Sender<bool>,
    closed_until: Mutex<Option<Instant>>,
}

impl GlobalGate {
    /// Creates an open gate.
    pub fn new() -> Self {
        let (open, _) = watch::channel(true);
        Self {
            open,
            closed_until: Mutex::new(None),
        }
    }

    /// Whether requests may currently proceed.
    pub fn is_open(&self) -> bool {
        *self.open.borrow()
    }

    /// Suspends until the gate is open. Returns immediately if it already is.
    ///
    /// Waiters reopen the gate themselves once its deadline passes, so a
    /// closer that is cancelled mid-cooldown cannot leave it shut.
    pub async fn wait_open(&self) {
        let mut rx = self.open.subscribe();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            let deadline = *self.lock_deadline();
            match deadline {
                Some(deadline) => {
                    tokio::select! {
                        _ = rx.changed() => {}
                        _ = tokio::time::sleep_until(deadline) => {
                            self.reopen_if_due();
                        }
                    }
                }
                // The sender lives in `self`, so the channel cannot close under us.
                None => {
                    let _ = rx.changed().await;
                }
            }
        }
    }

    /// When the gate is due to reopen, if it is closed.
    pub fn closed_until(&self) -> Option<Instant> {
        *self.lock_deadline()
    }

    /// Closes the gate until at least `duration` (at most [`MAX_CLOSED_FOR`])
    /// from now and returns the instant at which it becomes due to reopen.
    pub fn close_for(&self, duration: Duration) -> Instant {
        let duration = duration.min(MAX_CLOSED_FOR);
        let mut closed_until = self.lock_deadline();
        let now = Instant::now();
        let deadline = now.checked_add(duration).unwrap_or(now);
        let deadline = match *closed_until {
            Some(existing) if existing > deadline => existing,
            _ => deadline,
        };
        *closed_until = Some(deadline);
        self.open.send_replace(false);
        tracing::warn!(?duration, "global rate limit hit, all buckets paused");
        deadline
    }

    /// Reopens the gate if its deadline has passed. Returns whether the gate
    /// is open afterwards.
    pub fn reopen_if_due(&self) -> bool {
        let mut closed_until = self.lock_deadline();
        match *closed_until {
            Some(deadline) if Instant::now() < deadline => false,
            _ => {
                *closed_until = None;
                self.open.send_replace(true);
                true
            }
        }
    }

    /// Unconditionally reopens the gate.
    pub fn open(&self) {
        *self.lock_deadline() = None;
        self.open.send_replace(true);
    }

    fn lock_deadline(&self) -> std::sync::MutexGuard<'_, Option<Instant>> {
        // The guarded value is a plain deadline; a poisoned lock still holds a
        // usable one.
        self.closed_until.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for GlobalGate {
    fn default() -> Self {
        Self::new()
    }
}
