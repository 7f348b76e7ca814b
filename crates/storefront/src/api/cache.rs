//! Cache types for catalog responses.

use vitrine_core::{Product, ProductId};

use super::types::ProductPage;

/// Cache key for products and product pages.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Product(ProductId),
    Products { page: u32, page_size: u32 },
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(ProductPage),
}
