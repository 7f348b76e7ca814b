//! Cart commands.

use clap::Subcommand;
use vitrine_core::ProductId;
use vitrine_storefront::error::{Result, add_breadcrumb};
use vitrine_storefront::state::AppState;

use super::{flush, say};

#[derive(Subcommand)]
pub enum CartAction {
    /// Show the cart
    Show,
    /// Add a product
    Add {
        /// Product ID
        product_id: ProductId,

        /// Units to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Remove a product
    Remove {
        /// Product ID
        product_id: ProductId,
    },
    /// Set the quantity of a product already in the cart (0 removes it)
    Update {
        /// Product ID
        product_id: ProductId,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Empty the cart
    Clear,
}

pub async fn run(state: &AppState, action: CartAction) -> Result<()> {
    let cart = state.cart();
    let mut notifications = cart.subscribe();

    match action {
        CartAction::Show => {}
        CartAction::Add {
            product_id,
            quantity,
        } => {
            // Stock must be current when the add is checked against it.
            state.api().invalidate_product(product_id).await;
            let product = state.api().get_product(product_id).await?;
            add_breadcrumb(
                "cart",
                "Add to cart",
                Some(&[("product_id", product_id.to_string().as_str())]),
            );
            cart.add_to_cart(&product, quantity);
        }
        CartAction::Remove { product_id } => cart.remove_from_cart(product_id),
        CartAction::Update {
            product_id,
            quantity,
        } => cart.update_quantity(product_id, quantity),
        CartAction::Clear => {
            cart.clear_cart();
            say("Cart cleared.");
        }
    }

    flush(&mut notifications);
    show(state);
    Ok(())
}

fn show(state: &AppState) {
    let cart = state.cart();
    let items = cart.items();
    if items.is_empty() {
        say("Your cart is empty.");
        return;
    }

    for item in &items {
        say(&format!(
            "{:>6}  {} x{}  {}  (max {})",
            item.product_id.as_i64(),
            item.name,
            item.quantity,
            item.line_total().display(),
            item.stock_snapshot
        ));
    }
    say(&format!(
        "{} item(s), total {}",
        cart.item_count(),
        cart.cart_total().display()
    ));
}
