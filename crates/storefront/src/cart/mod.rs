//! Client-side shopping cart.
//!
//! - [`CartStore`] - the session's cart, persisted after every mutation
//! - [`CartLineItem`] - one product line with its stock snapshot
//! - [`AddGuard`] - debounce token for add-to-cart requests

mod guard;
mod line_item;
mod store;

pub use guard::{AddGuard, DEFAULT_ADD_DEBOUNCE};
pub use line_item::CartLineItem;
pub use store::CartStore;
