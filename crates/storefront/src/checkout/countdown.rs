//! Auto-redirect countdown shown on the confirmation step.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};

/// Ticks before the confirmation screen navigates away.
pub const DEFAULT_REDIRECT_TICKS: u32 = 8;

/// Period of one tick.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// A running countdown.
///
/// The ticking task is aborted when the countdown is dropped, so tearing the
/// flow down (or starting a fresh countdown in its place) never leaves a
/// stray timer behind.
pub struct RedirectCountdown {
    remaining: watch::Receiver<u32>,
    task: JoinHandle<()>,
}

impl std::fmt::Debug for RedirectCountdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedirectCountdown")
            .field("remaining", &self.remaining())
            .finish_non_exhaustive()
    }
}

impl RedirectCountdown {
    /// Start counting down from `ticks`. Must be called within a tokio runtime.
    #[must_use]
    pub fn start(ticks: u32) -> Self {
        let (tx, rx) = watch::channel(ticks);

        let task = tokio::spawn(async move {
            let mut left = ticks;
            let mut interval = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
            while left > 0 {
                interval.tick().await;
                left -= 1;
                if tx.send(left).is_err() {
                    return;
                }
            }
            tracing::debug!("Redirect countdown finished");
        });

        Self {
            remaining: rx,
            task,
        }
    }

    /// Ticks left before the redirect.
    #[must_use]
    pub fn remaining(&self) -> u32 {
        *self.remaining.borrow()
    }

    /// Whether the redirect is due.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.remaining() == 0
    }

    /// Wait until the countdown reaches zero.
    pub async fn wait(&mut self) {
        // The sender only goes away after publishing zero or on abort.
        let _ = self.remaining.wait_for(|left| *left == 0).await;
    }
}

impl Drop for RedirectCountdown {
    fn drop(&mut self) {
        self.task.abort();
    }
}
