//! Cart state manager.
//!
//! `CartStore` owns the list of line items for the current session, mirrors
//! it to durable storage after every mutation and reports the outcome of
//! each mutation through the [`Notifier`] side channel. Stock conflicts are
//! never returned to the caller: a rejected mutation leaves the cart as it
//! was and emits a notification instead.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};
use vitrine_core::{Price, Product, ProductId};

use super::guard::{AddGuard, DEFAULT_ADD_DEBOUNCE};
use super::line_item::CartLineItem;
use crate::notify::{Notification, Notifier};
use crate::storage::{self, CART_KEY, KeyValueStore};

/// Shared handle to the session's cart.
///
/// Cloning is cheap; every clone sees the same cart.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    state: Mutex<CartState>,
    storage: Arc<dyn KeyValueStore>,
    notifier: Notifier,
}

struct CartState {
    items: Vec<CartLineItem>,
    item_count: u32,
    add_guard: AddGuard,
}

impl CartState {
    fn find_mut(&mut self, product_id: ProductId) -> Option<&mut CartLineItem> {
        self.items.iter_mut().find(|i| i.product_id == product_id)
    }

    fn recount(&mut self) {
        self.item_count = self.items.iter().map(|i| i.quantity).sum();
    }
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("CartStore")
            .field("lines", &state.items.len())
            .field("item_count", &state.item_count)
            .finish_non_exhaustive()
    }
}

impl CartStore {
    /// Open the cart, hydrating it from `storage`.
    ///
    /// A missing document yields an empty cart. A document that cannot be
    /// read or decoded is logged and replaced by an empty cart; nothing here
    /// is fatal.
    #[must_use]
    pub fn open(storage: Arc<dyn KeyValueStore>, add_debounce: Duration) -> Self {
        let items = match storage::read_json::<Vec<CartLineItem>>(storage.as_ref(), CART_KEY) {
            Ok(Some(items)) => repair(items),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "Discarding unreadable persisted cart");
                Vec::new()
            }
        };

        let mut state = CartState {
            items,
            item_count: 0,
            add_guard: AddGuard::new(add_debounce),
        };
        state.recount();
        debug!(
            lines = state.items.len(),
            item_count = state.item_count,
            "Cart hydrated"
        );

        Self {
            inner: Arc::new(CartStoreInner {
                state: Mutex::new(state),
                storage,
                notifier: Notifier::new(),
            }),
        }
    }

    /// Open with the default add-to-cart debounce window.
    #[must_use]
    pub fn with_default_debounce(storage: Arc<dyn KeyValueStore>) -> Self {
        Self::open(storage, DEFAULT_ADD_DEBOUNCE)
    }

    fn lock(&self) -> MutexGuard<'_, CartState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, notification: Notification) {
        self.inner.notifier.emit(notification);
    }

    /// Recount and persist after a successful mutation.
    fn commit(&self, state: &mut CartState) {
        state.recount();
        if let Err(e) = storage::write_json(self.inner.storage.as_ref(), CART_KEY, &state.items) {
            warn!(error = %e, "Failed to persist cart");
        }
    }

    /// Subscribe to cart notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.inner.notifier.subscribe()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add `quantity` units of `product`.
    ///
    /// Calls arriving while a previous add still holds the debounce token are
    /// dropped without any signal. Requests that would exceed the product's
    /// current stock are rejected with an error notification.
    #[instrument(skip(self, product), fields(product_id = %product.id, stock = product.stock))]
    pub fn add_to_cart(&self, product: &Product, quantity: u32) {
        let mut state = self.lock();

        if !state.add_guard.try_acquire() {
            debug!("add_to_cart dropped: another add is in progress");
            return;
        }

        if quantity == 0 {
            debug!("add_to_cart ignored: zero quantity");
        } else {
            self.apply_add(&mut state, product, quantity);
        }

        state.add_guard.release_after_window();
    }

    fn apply_add(&self, state: &mut CartState, product: &Product, quantity: u32) {
        let stock = product.stock;

        if let Some(existing) = state.find_mut(product.id) {
            let held = existing.quantity;
            let new_quantity = held.saturating_add(quantity);
            if new_quantity > stock {
                warn!(held, requested = quantity, "Add rejected: insufficient stock");
                self.notify(Notification::error(format!(
                    "Insufficient stock for {}: you already have {held} in your cart and only {stock} available",
                    product.name
                )));
                return;
            }

            existing.quantity = new_quantity;
            existing.refresh_snapshot(product);
            info!(quantity = new_quantity, "Cart line updated");
            self.commit(state);
            self.notify(Notification::success(format!(
                "{} quantity updated in your cart",
                product.name
            )));
            return;
        }

        if quantity > stock {
            warn!(requested = quantity, "Add rejected: insufficient stock");
            self.notify(Notification::error(format!(
                "Insufficient stock for {}: only {stock} available",
                product.name
            )));
            return;
        }

        state.items.push(CartLineItem::from_product(product, quantity));
        info!(quantity, "Cart line added");
        self.commit(state);
        self.notify(Notification::success(format!(
            "{} added to your cart",
            product.name
        )));
    }

    /// Remove the line item for `product_id`. No-op when absent.
    #[instrument(skip(self))]
    pub fn remove_from_cart(&self, product_id: ProductId) {
        let mut state = self.lock();
        let Some(pos) = state.items.iter().position(|i| i.product_id == product_id) else {
            return;
        };

        let removed = state.items.remove(pos);
        info!("Cart line removed");
        self.commit(&mut state);
        self.notify(Notification::info(format!(
            "{} removed from your cart",
            removed.name
        )));
    }

    /// Set the quantity of an existing line item.
    ///
    /// Zero or negative quantities remove the line. Quantities above the
    /// line's last known stock are rejected with a warning notification.
    #[instrument(skip(self))]
    pub fn update_quantity(&self, product_id: ProductId, new_quantity: i64) {
        let Ok(quantity) = u32::try_from(new_quantity) else {
            if new_quantity <= 0 {
                self.remove_from_cart(product_id);
            } else {
                self.warn_stock_limit(product_id);
            }
            return;
        };
        if quantity == 0 {
            self.remove_from_cart(product_id);
            return;
        }

        let mut state = self.lock();
        let Some(item) = state.find_mut(product_id) else {
            return;
        };

        if quantity > item.stock_snapshot {
            warn!(
                requested = quantity,
                stock = item.stock_snapshot,
                "Update rejected: insufficient stock"
            );
            let message = format!(
                "Only {} unit(s) of {} available",
                item.stock_snapshot, item.name
            );
            self.notify(Notification::warning(message));
            return;
        }

        item.quantity = quantity;
        let message = format!("{} quantity set to {quantity}", item.name);
        self.commit(&mut state);
        self.notify(Notification::info(message));
    }

    fn warn_stock_limit(&self, product_id: ProductId) {
        let state = self.lock();
        if let Some(item) = state.items.iter().find(|i| i.product_id == product_id) {
            self.notify(Notification::warning(format!(
                "Only {} unit(s) of {} available",
                item.stock_snapshot, item.name
            )));
        }
    }

    /// Empty the cart.
    #[instrument(skip(self))]
    pub fn clear_cart(&self) {
        let mut state = self.lock();
        state.items.clear();
        info!("Cart cleared");
        self.commit(&mut state);
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Sum of `unit_price * quantity` over all lines.
    #[must_use]
    pub fn cart_total(&self) -> Price {
        let state = self.lock();
        let amount: Decimal = state
            .items
            .iter()
            .map(|i| i.unit_price * Decimal::from(i.quantity))
            .sum();
        Price::brl(amount)
    }

    /// Whether a line exists for `product_id`.
    #[must_use]
    pub fn is_in_cart(&self, product_id: ProductId) -> bool {
        self.lock().items.iter().any(|i| i.product_id == product_id)
    }

    /// Quantity held for `product_id`, 0 when absent.
    #[must_use]
    pub fn product_quantity(&self, product_id: ProductId) -> u32 {
        self.lock()
            .items
            .iter()
            .find(|i| i.product_id == product_id)
            .map_or(0, |i| i.quantity)
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lock().item_count
    }

    /// Snapshot of the current lines, in insertion order.
    #[must_use]
    pub fn items(&self) -> Vec<CartLineItem> {
        self.lock().items.clone()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }
}

/// Restore the cart invariants on a persisted document: one line per
/// product and `1 <= quantity <= stock_snapshot`.
fn repair(items: Vec<CartLineItem>) -> Vec<CartLineItem> {
    let original_len = items.len();
    let mut positions: HashMap<ProductId, usize> = HashMap::new();
    let mut out: Vec<CartLineItem> = Vec::with_capacity(items.len());
    let mut repaired = false;

    for item in items {
        if let Some(existing) = positions.get(&item.product_id).and_then(|&p| out.get_mut(p)) {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
            repaired = true;
            continue;
        }
        positions.insert(item.product_id, out.len());
        out.push(item);
    }

    for item in &mut out {
        if item.quantity > item.stock_snapshot {
            item.quantity = item.stock_snapshot;
            repaired = true;
        }
    }
    out.retain(|i| i.quantity > 0);

    if repaired || out.len() != original_len {
        warn!(
            before = original_len,
            after = out.len(),
            "Repaired persisted cart"
        );
    }
    out
}
