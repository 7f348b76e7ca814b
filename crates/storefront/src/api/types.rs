//! Wire types for the storefront backend.
//!
//! Field names follow the backend's camelCase JSON. Response envelopes of the
//! form `{success, ..., message}` are unwrapped by the client; callers only
//! ever see the payload or an [`ApiError`](super::ApiError).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use vitrine_core::{Address, AddressId, OrderId, PaymentMethod, Price, Product, ProductId};

// =============================================================================
// Catalog
// =============================================================================

/// One page of active products.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub page: u32,
    pub page_size: u32,
    /// Total number of products, when the backend reports it.
    pub total: Option<u64>,
}

/// The product list endpoint answers either with a paginated envelope or,
/// on older deployments, with a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ProductListResponse {
    Paginated(PaginatedProducts),
    Flat(Vec<Product>),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PaginatedProducts {
    #[serde(alias = "products", alias = "data")]
    pub items: Vec<Product>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub total: Option<u64>,
}

impl ProductListResponse {
    pub(crate) fn into_page(self, page: u32, page_size: u32) -> ProductPage {
        match self {
            Self::Paginated(p) => ProductPage {
                products: p.items,
                page: p.page.unwrap_or(page),
                page_size: p.page_size.unwrap_or(page_size),
                total: p.total,
            },
            Self::Flat(products) => ProductPage {
                total: u64::try_from(products.len()).ok(),
                products,
                page: 1,
                page_size,
            },
        }
    }
}

// =============================================================================
// Shipping
// =============================================================================

/// Request body for `POST /shipping/quote`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingQuoteRequest {
    pub postal_code: String,
    pub subtotal: Decimal,
}

/// A delivery option offered for an address and subtotal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingOption {
    #[serde(rename = "label")]
    pub carrier_label: String,
    pub eta_days: u32,
    pub price: Decimal,
    #[serde(default)]
    pub description: Option<String>,
}

impl ShippingOption {
    #[must_use]
    pub fn cost(&self) -> Price {
        Price::brl(self.price)
    }

    /// `"3 business days"` style estimate.
    #[must_use]
    pub fn eta_label(&self) -> String {
        match self.eta_days {
            0 => "same day".to_string(),
            1 => "1 business day".to_string(),
            n => format!("{n} business days"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ShippingQuoteResponse {
    pub success: bool,
    #[serde(default)]
    pub options: Vec<ShippingOption>,
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// Postal code lookup
// =============================================================================

/// Address fragments known for a postal code.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PostalLookup {
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub neighborhood: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PostalLookupResponse {
    #[serde(default)]
    pub error: bool,
    #[serde(flatten)]
    pub lookup: PostalLookup,
}

// =============================================================================
// Saved addresses
// =============================================================================

/// An address stored on the customer's account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedAddress {
    pub id: AddressId,
    #[serde(default)]
    pub is_default: bool,
    #[serde(flatten)]
    pub address: Address,
}

/// Request body for `POST /customer/addresses`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveAddressRequest<'a> {
    #[serde(flatten)]
    pub address: &'a Address,
    pub is_default: bool,
}

// =============================================================================
// Orders
// =============================================================================

/// One order line as the order service expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: Decimal,
}

/// Card fields forwarded to the order service.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardPayload {
    pub number: String,
    pub holder_name: String,
    pub expiry: String,
    pub cvv: String,
}

impl std::fmt::Debug for CardPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardPayload")
            .field("number", &"[REDACTED]")
            .field("holder_name", &self.holder_name)
            .field("expiry", &self.expiry)
            .field("cvv", &"[REDACTED]")
            .finish()
    }
}

/// Checkout data attached to an order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderData {
    pub address: Address,
    pub shipping: ShippingOption,
    pub payment_method: PaymentMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card: Option<CardPayload>,
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub total: Decimal,
}

/// Request body for `POST /orders`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub items: Vec<OrderItemRequest>,
    pub order_data: OrderData,
}

/// An order accepted by the order service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedOrder {
    pub id: OrderId,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OrderResponse {
    pub success: bool,
    #[serde(default)]
    pub order: Option<PlacedOrder>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Generic `{message}` body used to surface backend error text.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default, alias = "error")]
    pub message: Option<String>,
}
