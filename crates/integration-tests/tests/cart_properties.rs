//! Cart invariants over random operation sequences.

#![allow(clippy::unwrap_used)]

use std::collections::HashSet;

use proptest::prelude::*;
use rust_decimal::Decimal;
use vitrine_core::{Product, ProductId};
use vitrine_integration_tests::{cart, memory_storage, product};
use vitrine_storefront::cart::CartStore;

#[derive(Debug, Clone)]
enum Op {
    /// Add `quantity` of catalog entry `index`, whose stock is now `stock`.
    Add { index: usize, quantity: u32, stock: u32 },
    Update { index: usize, quantity: i64 },
    Remove { index: usize },
    Clear,
}

const CATALOG_SIZE: usize = 4;

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        5 => (0..CATALOG_SIZE, 0..6u32, 0..8u32)
            .prop_map(|(index, quantity, stock)| Op::Add { index, quantity, stock }),
        3 => (0..CATALOG_SIZE, -2..10i64).prop_map(|(index, quantity)| Op::Update { index, quantity }),
        1 => (0..CATALOG_SIZE).prop_map(|index| Op::Remove { index }),
        1 => Just(Op::Clear),
    ]
}

fn catalog_entry(index: usize, stock: u32) -> Product {
    let id = i64::try_from(index).unwrap() + 1;
    product(id, &format!("P{id}"), id * 3, stock)
}

fn apply(cart: &CartStore, op: &Op) {
    match *op {
        Op::Add {
            index,
            quantity,
            stock,
        } => cart.add_to_cart(&catalog_entry(index, stock), quantity),
        Op::Update { index, quantity } => {
            cart.update_quantity(catalog_entry(index, 0).id, quantity);
        }
        Op::Remove { index } => cart.remove_from_cart(catalog_entry(index, 0).id),
        Op::Clear => cart.clear_cart(),
    }
}

proptest! {
    #[test]
    fn prop_quantity_never_exceeds_observed_stock(ops in proptest::collection::vec(op(), 0..40)) {
        let cart = cart(&memory_storage());
        for op in &ops {
            apply(&cart, op);
            for item in cart.items() {
                prop_assert!(item.quantity >= 1);
                prop_assert!(item.quantity <= item.stock_snapshot);
            }
        }
    }

    #[test]
    fn prop_at_most_one_line_per_product(ops in proptest::collection::vec(op(), 0..40)) {
        let cart = cart(&memory_storage());
        for op in &ops {
            apply(&cart, op);
        }
        let items = cart.items();
        let ids: HashSet<ProductId> = items.iter().map(|i| i.product_id).collect();
        prop_assert_eq!(ids.len(), items.len());
    }

    #[test]
    fn prop_total_and_count_match_lines(ops in proptest::collection::vec(op(), 0..40)) {
        let cart = cart(&memory_storage());
        for op in &ops {
            apply(&cart, op);
            let items = cart.items();
            let expected: Decimal = items
                .iter()
                .map(|i| i.unit_price * Decimal::from(i.quantity))
                .sum();
            prop_assert_eq!(cart.cart_total().amount, expected);
            prop_assert_eq!(cart.item_count(), items.iter().map(|i| i.quantity).sum::<u32>());
        }
    }

    #[test]
    fn prop_remove_is_idempotent(
        ops in proptest::collection::vec(op(), 0..20),
        index in 0..CATALOG_SIZE,
    ) {
        let cart = cart(&memory_storage());
        for op in &ops {
            apply(&cart, op);
        }
        let id = catalog_entry(index, 0).id;

        cart.remove_from_cart(id);
        let once = cart.items();
        cart.remove_from_cart(id);
        prop_assert_eq!(cart.items(), once);
    }

    #[test]
    fn prop_persisted_cart_rehydrates_identically(ops in proptest::collection::vec(op(), 0..30)) {
        let storage = memory_storage();
        let original = cart(&storage);
        for op in &ops {
            apply(&original, op);
        }
        let reopened = cart(&storage);
        prop_assert_eq!(reopened.items(), original.items());
        prop_assert_eq!(reopened.item_count(), original.item_count());
    }
}
