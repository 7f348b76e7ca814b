//! Integration tests for Vitrine.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p vitrine-integration-tests
//! ```
//!
//! No backend is needed: checkout scenarios run against [`FakeBackend`], an
//! in-process [`CheckoutBackend`] that records every call it receives so a
//! test can assert that a request was, or was not, made.
//!
//! # Test Categories
//!
//! - `cart_scenarios` - Cart behaviour, persistence and notifications
//! - `cart_properties` - Property tests over random operation sequences
//! - `checkout_scenarios` - End-to-end checkout against the fake backend

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rust_decimal::Decimal;
use vitrine_core::{Address, OrderId, PostalCode, Product, ProductId};
use vitrine_storefront::api::{
    ApiError, CheckoutBackend, OrderRequest, PlacedOrder, PostalLookup, SavedAddress,
    ShippingOption,
};
use vitrine_storefront::cart::CartStore;
use vitrine_storefront::checkout::CheckoutFlow;
use vitrine_storefront::storage::{KeyValueStore, MemoryStore};

/// A backend call as seen by [`FakeBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    QuoteShipping { postal_code: String, subtotal: Decimal },
    LookupPostalCode(String),
    SavedAddresses,
    SaveAddress(Address),
    CreateOrder { items: usize, total: Decimal },
}

/// Scripted in-process backend.
#[derive(Debug, Default)]
pub struct FakeBackend {
    /// Options returned by the shipping quote, or the rejection message.
    pub quote: Option<Result<Vec<ShippingOption>, String>>,
    /// Result of postal code lookups; `None` means not found.
    pub lookup: Option<PostalLookup>,
    /// Addresses on the customer's account.
    pub saved: Vec<SavedAddress>,
    /// Rejection message for order creation; `None` accepts the order.
    pub order_rejection: Option<String>,
    pub calls: Mutex<Vec<Call>>,
}

impl FakeBackend {
    /// A backend quoting the given shipping options and accepting orders.
    #[must_use]
    pub fn quoting(options: Vec<ShippingOption>) -> Self {
        Self {
            quote: Some(Ok(options)),
            ..Self::default()
        }
    }

    /// Every call received so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of order creation requests received.
    #[must_use]
    pub fn order_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::CreateOrder { .. }))
            .count()
    }

    fn record(&self, call: Call) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

impl CheckoutBackend for FakeBackend {
    async fn quote_shipping(
        &self,
        postal_code: &PostalCode,
        subtotal: Decimal,
    ) -> Result<Vec<ShippingOption>, ApiError> {
        self.record(Call::QuoteShipping {
            postal_code: postal_code.as_str().to_string(),
            subtotal,
        });
        match &self.quote {
            Some(Ok(options)) => Ok(options.clone()),
            Some(Err(message)) => Err(ApiError::Rejected(message.clone())),
            None => Err(ApiError::Api {
                status: 503,
                message: "shipping service unavailable".to_string(),
            }),
        }
    }

    async fn lookup_postal_code(&self, postal_code: &PostalCode) -> Result<PostalLookup, ApiError> {
        self.record(Call::LookupPostalCode(postal_code.as_str().to_string()));
        self.lookup
            .clone()
            .ok_or_else(|| ApiError::NotFound(format!("postal code {postal_code}")))
    }

    async fn saved_addresses(&self) -> Result<Vec<SavedAddress>, ApiError> {
        self.record(Call::SavedAddresses);
        Ok(self.saved.clone())
    }

    async fn save_address(&self, address: &Address, _is_default: bool) -> Result<(), ApiError> {
        self.record(Call::SaveAddress(address.clone()));
        Ok(())
    }

    async fn create_order(&self, request: &OrderRequest) -> Result<PlacedOrder, ApiError> {
        self.record(Call::CreateOrder {
            items: request.items.len(),
            total: request.order_data.total,
        });
        if let Some(message) = &self.order_rejection {
            return Err(ApiError::Rejected(message.clone()));
        }
        Ok(PlacedOrder {
            id: OrderId::new(1001),
            status: Some("pending".to_string()),
            created_at: None,
        })
    }
}

/// Catalog record with a whole-unit price.
#[must_use]
pub fn product(id: i64, name: &str, price: i64, stock: u32) -> Product {
    Product {
        id: ProductId::new(id),
        name: name.to_string(),
        price: Decimal::new(price, 0),
        stock,
        images: Vec::new(),
        description: None,
        category: None,
    }
}

/// Shipping option with a whole-unit price.
#[must_use]
pub fn shipping(label: &str, eta_days: u32, price: i64) -> ShippingOption {
    ShippingOption {
        carrier_label: label.to_string(),
        eta_days,
        price: Decimal::new(price, 0),
        description: None,
    }
}

/// In-memory storage shared by a cart and a checkout flow.
#[must_use]
pub fn memory_storage() -> Arc<dyn KeyValueStore> {
    Arc::new(MemoryStore::new())
}

/// Cart over `storage` with no debounce window.
#[must_use]
pub fn cart(storage: &Arc<dyn KeyValueStore>) -> CartStore {
    CartStore::open(Arc::clone(storage), Duration::ZERO)
}

/// Checkout flow over a fresh in-memory cart.
#[must_use]
pub fn checkout(backend: FakeBackend) -> CheckoutFlow<FakeBackend> {
    let storage = memory_storage();
    CheckoutFlow::new(backend, cart(&storage), storage)
}
