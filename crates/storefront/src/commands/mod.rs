//! Command implementations for the `vitrine` binary.
//!
//! Everything printed to the shopper goes through [`say`], [`notice`] and
//! [`fail`]; diagnostics go through `tracing` to stderr.

pub mod cart;
pub mod checkout;
pub mod products;

use tokio::sync::broadcast;
use vitrine_core::NotificationKind;
use vitrine_storefront::notify::{Notification, drain};

pub use cart::CartAction;
pub use checkout::CheckoutArgs;

/// Print a line of regular output.
#[allow(clippy::print_stdout)]
pub fn say(line: &str) {
    println!("{line}");
}

/// Print a cart notification the way a toast would show it.
pub fn notice(notification: &Notification) {
    let tag = match notification.kind {
        NotificationKind::Success => "ok",
        NotificationKind::Info => "info",
        NotificationKind::Warning => "warn",
        NotificationKind::Error => "error",
    };
    say(&format!("[{tag}] {}", notification.message));
}

/// Print every notification queued on `receiver`.
pub fn flush(receiver: &mut broadcast::Receiver<Notification>) {
    for notification in drain(receiver) {
        notice(&notification);
    }
}

/// Print a failure message.
#[allow(clippy::print_stderr)]
pub fn fail(message: &str) {
    eprintln!("error: {message}");
}
