//! Catalog browsing.

use vitrine_storefront::error::Result;
use vitrine_storefront::state::AppState;

use super::say;

/// Print one page of active products.
pub async fn list(state: &AppState, page: u32, page_size: u32) -> Result<()> {
    let result = state.api().list_products(page, page_size).await?;

    if result.products.is_empty() {
        say("No products found.");
        return Ok(());
    }

    for product in &result.products {
        let stock = if product.in_stock() {
            format!("{} in stock", product.stock)
        } else {
            "sold out".to_string()
        };
        let held = state.cart().product_quantity(product.id);
        let held = if held > 0 {
            format!(", {held} in cart")
        } else {
            String::new()
        };
        say(&format!(
            "{:>6}  {}  {} ({stock}{held})",
            product.id.as_i64(),
            product.name,
            product.unit_price().display()
        ));
    }

    match result.total {
        Some(total) => say(&format!("Page {} of {total} products", result.page)),
        None => say(&format!("Page {}", result.page)),
    }
    Ok(())
}
