//! Add-to-cart request coalescing.

use std::time::Duration;

use tokio::time::Instant;

/// Default window during which follow-up add requests are dropped.
pub const DEFAULT_ADD_DEBOUNCE: Duration = Duration::from_millis(500);

/// Single-slot "operation in progress" token with a scheduled auto-release.
///
/// A caller takes the token with [`AddGuard::try_acquire`]; while it is held
/// every other acquire fails. Once the guarded mutation has finished the
/// holder calls [`AddGuard::release_after_window`], which keeps the token
/// held until the window elapses and then frees it without further action.
#[derive(Debug, Clone)]
pub struct AddGuard {
    window: Duration,
    held: bool,
    release_at: Option<Instant>,
}

impl AddGuard {
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            held: false,
            release_at: None,
        }
    }

    /// Whether the token is currently held.
    #[must_use]
    pub fn is_held(&self) -> bool {
        self.held && self.release_at.is_none_or(|at| Instant::now() < at)
    }

    /// Take the token. Returns `false` when another operation holds it.
    pub fn try_acquire(&mut self) -> bool {
        if self.is_held() {
            return false;
        }
        self.held = true;
        self.release_at = None;
        true
    }

    /// Schedule the release of a held token one window from now.
    pub fn release_after_window(&mut self) {
        if self.held {
            self.release_at = Some(Instant::now() + self.window);
        }
    }
}

impl Default for AddGuard {
    fn default() -> Self {
        Self::new(DEFAULT_ADD_DEBOUNCE)
    }
}
