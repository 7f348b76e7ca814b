//! Cart line items.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use vitrine_core::{Price, Product, ProductId};

/// One product in the cart.
///
/// At most one line item exists per [`ProductId`] and `quantity` never
/// exceeds `stock_snapshot`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineItem {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Decimal,
    pub image_ref: Option<String>,
    pub quantity: u32,
    /// Available stock observed at the last add or update.
    pub stock_snapshot: u32,
    /// Catalog record as last seen.
    pub product_snapshot: Product,
}

impl CartLineItem {
    /// Build a new line item from a catalog record.
    #[must_use]
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            unit_price: product.price,
            image_ref: product.primary_image().map(str::to_string),
            quantity,
            stock_snapshot: product.stock,
            product_snapshot: product.clone(),
        }
    }

    /// Replace the product snapshot and the stock limit derived from it.
    pub fn refresh_snapshot(&mut self, product: &Product) {
        self.stock_snapshot = product.stock;
        self.product_snapshot = product.clone();
    }

    /// `unit_price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Price {
        Price::brl(self.unit_price).times(self.quantity)
    }
}
