//! Application state shared by every command.

use std::sync::Arc;

use crate::api::{ApiClient, ApiError};
use crate::cart::CartStore;
use crate::checkout::CheckoutFlow;
use crate::config::StorefrontConfig;
use crate::storage::{FileStore, KeyValueStore};

/// The single application handle, created once at start-up.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// configuration, the backend client and the session's cart.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    api: ApiClient,
    storage: Arc<dyn KeyValueStore>,
    cart: CartStore,
}

impl AppState {
    /// Build the application state from configuration.
    ///
    /// Storage lives under `config.data_dir`; the cart is hydrated from it.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, ApiError> {
        let storage: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(&config.data_dir));
        Self::with_storage(config, storage)
    }

    /// Build the application state over an explicit storage backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_storage(
        config: StorefrontConfig,
        storage: Arc<dyn KeyValueStore>,
    ) -> Result<Self, ApiError> {
        let api = ApiClient::new(&config.api)?;
        let cart = CartStore::open(Arc::clone(&storage), config.add_debounce);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                api,
                storage,
                cart,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the backend client.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// Get a reference to the session's cart.
    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    /// A checkout flow over this state's backend, cart and storage.
    #[must_use]
    pub fn checkout(&self) -> CheckoutFlow<ApiClient> {
        CheckoutFlow::new(
            self.inner.api.clone(),
            self.inner.cart.clone(),
            Arc::clone(&self.inner.storage),
        )
        .with_redirect_ticks(self.inner.config.redirect_ticks)
    }
}
