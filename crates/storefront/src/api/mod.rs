//! Clients for the storefront backend.
//!
//! # Architecture
//!
//! - Plain JSON over HTTP with `reqwest`
//! - The backend is the source of truth for catalog, shipping and orders
//! - Catalog reads are cached in memory via `moka` (TTL from configuration)
//! - Checkout calls go through the [`CheckoutBackend`] trait so the checkout
//!   flow can run against an in-process fake
//!
//! # Endpoints
//!
//! - `GET /products/{id}`, `GET /products?status=ACTIVE&page&pageSize`
//! - `POST /shipping/quote`
//! - `GET /postal-lookup/{code}`
//! - `GET|POST /customer/addresses`
//! - `POST /orders`

mod cache;
mod client;
pub mod types;

use std::future::Future;

pub use client::ApiClient;
pub use types::*;

use rust_decimal::Decimal;
use thiserror::Error;
use vitrine_core::{Address, PostalCode};

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Non-success HTTP status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The service refused the request, either with `success: false` or
    /// with a 4xx status carrying a message.
    #[error("{0}")]
    Rejected(String),
}

impl ApiError {
    /// Message safe to show to a shopper.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected(message) => message.clone(),
            Self::NotFound(_) => "Not found".to_string(),
            Self::RateLimited(_) => "Too many requests, please try again shortly".to_string(),
            Self::Http(_) | Self::InvalidUrl(_) => {
                "Could not reach the store, please try again".to_string()
            }
            Self::Parse(_) | Self::Api { .. } => {
                "The store returned an unexpected response, please try again".to_string()
            }
        }
    }
}

/// Remote operations the checkout flow depends on.
pub trait CheckoutBackend: Send + Sync {
    /// Quote delivery options for a destination and cart subtotal.
    fn quote_shipping(
        &self,
        postal_code: &PostalCode,
        subtotal: Decimal,
    ) -> impl Future<Output = Result<Vec<ShippingOption>, ApiError>> + Send;

    /// Look up street, neighborhood, city and region for a postal code.
    fn lookup_postal_code(
        &self,
        postal_code: &PostalCode,
    ) -> impl Future<Output = Result<PostalLookup, ApiError>> + Send;

    /// Addresses saved on the customer's account.
    fn saved_addresses(&self) -> impl Future<Output = Result<Vec<SavedAddress>, ApiError>> + Send;

    /// Persist a new address on the customer's account.
    fn save_address(
        &self,
        address: &Address,
        is_default: bool,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Create an order.
    fn create_order(
        &self,
        request: &OrderRequest,
    ) -> impl Future<Output = Result<PlacedOrder, ApiError>> + Send;
}
