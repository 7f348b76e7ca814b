//! HTTP client for the storefront backend.
//!
//! Caches products and product pages using `moka` (TTL from configuration).

use std::sync::Arc;

use moka::future::Cache;
use reqwest::{RequestBuilder, StatusCode};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use url::Url;
use vitrine_core::{Address, PostalCode, Product, ProductId};

use super::cache::{CacheKey, CacheValue};
use super::types::{
    ErrorBody, OrderRequest, OrderResponse, PlacedOrder, PostalLookup, PostalLookupResponse,
    ProductListResponse, ProductPage, SaveAddressRequest, SavedAddress, ShippingOption,
    ShippingQuoteRequest, ShippingQuoteResponse,
};
use super::{ApiError, CheckoutBackend};
use crate::config::ApiConfig;

/// Longest slice of a response body kept in logs and error messages.
const BODY_PREVIEW_CHARS: usize = 200;

/// Client for the storefront backend.
///
/// Cheaply cloneable; all clones share the connection pool and cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    token: Option<SecretString>,
    cache: Cache<CacheKey, CacheValue>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("authenticated", &self.inner.token.is_some())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.catalog_cache_ttl)
            .build();

        let client = reqwest::Client::builder()
            .user_agent(concat!("vitrine/", env!("CARGO_PKG_VERSION")))
            .build()?;

        // A base URL without a trailing slash would lose its last path
        // segment on join.
        let mut base_url = config.base_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url,
                token: config.token.clone(),
                cache,
            }),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(path.trim_start_matches('/'))?)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.inner.token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    /// Send a request and decode its JSON body.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self.authorize(request).send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ApiError::RateLimited(retry_after));
        }

        let url = response.url().path().to_string();
        let body = response.text().await?;

        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(url));
        }

        if !status.is_success() {
            let reason = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.message);

            // A 4xx with a message is the service refusing the request;
            // the message is meant for the shopper.
            if let (true, Some(message)) = (status.is_client_error(), &reason) {
                warn!(status = %status, path = %url, %message, "Backend refused request");
                return Err(ApiError::Rejected(message.clone()));
            }

            let preview = preview(&body);
            tracing::error!(
                status = %status,
                path = %url,
                body = %preview,
                "Backend returned non-success status"
            );
            return Err(ApiError::Api {
                status: status.as_u16(),
                message: reason.unwrap_or(preview),
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                path = %url,
                body = %preview(&body),
                "Failed to parse backend response"
            );
            ApiError::Parse(e)
        })
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Fetch a product by id.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for unknown ids, or other errors if the
    /// request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: ProductId) -> Result<Product, ApiError> {
        let key = CacheKey::Product(id);
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let url = self.endpoint(&format!("products/{id}"))?;
        let product: Product = self.send(self.inner.client.get(url)).await?;

        self.inner
            .cache
            .insert(key, CacheValue::Product(Box::new(product.clone())))
            .await;
        Ok(product)
    }

    /// Fetch a page of active products.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the response cannot be parsed.
    #[instrument(skip(self))]
    pub async fn list_products(&self, page: u32, page_size: u32) -> Result<ProductPage, ApiError> {
        let key = CacheKey::Products { page, page_size };
        if let Some(CacheValue::Products(cached)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for product page");
            return Ok(cached);
        }

        let mut url = self.endpoint("products")?;
        url.query_pairs_mut()
            .append_pair("status", "ACTIVE")
            .append_pair("page", &page.to_string())
            .append_pair("pageSize", &page_size.to_string());

        let response: ProductListResponse = self.send(self.inner.client.get(url)).await?;
        let result = response.into_page(page, page_size);

        // Individual products are cached too so a later add-to-cart skips
        // the round trip.
        for product in &result.products {
            self.inner
                .cache
                .insert(
                    CacheKey::Product(product.id),
                    CacheValue::Product(Box::new(product.clone())),
                )
                .await;
        }
        self.inner
            .cache
            .insert(key, CacheValue::Products(result.clone()))
            .await;
        Ok(result)
    }

    /// Drop a product from the cache so the next read sees fresh stock.
    pub async fn invalidate_product(&self, id: ProductId) {
        self.inner.cache.invalidate(&CacheKey::Product(id)).await;
    }
}

impl CheckoutBackend for ApiClient {
    #[instrument(skip(self), fields(postal_code = %postal_code))]
    async fn quote_shipping(
        &self,
        postal_code: &PostalCode,
        subtotal: Decimal,
    ) -> Result<Vec<ShippingOption>, ApiError> {
        let url = self.endpoint("shipping/quote")?;
        let body = ShippingQuoteRequest {
            postal_code: postal_code.as_str().to_string(),
            subtotal,
        };
        let response: ShippingQuoteResponse =
            self.send(self.inner.client.post(url).json(&body)).await?;

        if !response.success {
            return Err(ApiError::Rejected(response.message.unwrap_or_else(|| {
                "Shipping is not available for this postal code".to_string()
            })));
        }
        debug!(options = response.options.len(), "Shipping quote received");
        Ok(response.options)
    }

    #[instrument(skip(self), fields(postal_code = %postal_code))]
    async fn lookup_postal_code(&self, postal_code: &PostalCode) -> Result<PostalLookup, ApiError> {
        let url = self.endpoint(&format!("postal-lookup/{}", postal_code.as_str()))?;
        let response: PostalLookupResponse = self.send(self.inner.client.get(url)).await?;
        if response.error {
            return Err(ApiError::NotFound(format!("postal code {postal_code}")));
        }
        Ok(response.lookup)
    }

    #[instrument(skip(self))]
    async fn saved_addresses(&self) -> Result<Vec<SavedAddress>, ApiError> {
        let url = self.endpoint("customer/addresses")?;
        self.send(self.inner.client.get(url)).await
    }

    #[instrument(skip(self, address))]
    async fn save_address(&self, address: &Address, is_default: bool) -> Result<(), ApiError> {
        let url = self.endpoint("customer/addresses")?;
        let body = SaveAddressRequest {
            address,
            is_default,
        };
        let _: serde_json::Value = self.send(self.inner.client.post(url).json(&body)).await?;
        Ok(())
    }

    #[instrument(skip(self, request), fields(items = request.items.len()))]
    async fn create_order(&self, request: &OrderRequest) -> Result<PlacedOrder, ApiError> {
        let url = self.endpoint("orders")?;
        let response: OrderResponse = self.send(self.inner.client.post(url).json(request)).await?;

        match (response.success, response.order) {
            (true, Some(order)) => {
                for item in &request.items {
                    self.invalidate_product(item.product_id).await;
                }
                Ok(order)
            }
            (_, _) => Err(ApiError::Rejected(
                response
                    .message
                    .unwrap_or_else(|| "The order could not be created".to_string()),
            )),
        }
    }
}

fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_CHARS).collect()
}
