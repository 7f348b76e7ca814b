//! Multi-step checkout.
//!
//! A [`CheckoutSession`] holds the data of one attempt; a [`CheckoutFlow`]
//! moves it through `Address -> Shipping -> Payment -> Confirmation`,
//! calling the backend through [`CheckoutBackend`](crate::api::CheckoutBackend).
//!
//! Failed transitions never advance the session. They return a
//! [`CheckoutError`] and leave its message in [`CheckoutSession::error`] so
//! the shopper can correct the input and retry.

mod countdown;
mod flow;
mod session;
mod validation;

use std::fmt::Display;

use thiserror::Error;
use vitrine_core::CheckoutStep;

pub use countdown::{DEFAULT_REDIRECT_TICKS, RedirectCountdown, TICK_PERIOD};
pub use flow::CheckoutFlow;
pub use session::{CheckoutSession, CheckoutTotals, OrderSummary};
pub use validation::{
    AddressField, AddressForm, CardDetails, CardField, validate_address, validate_card,
};

/// Reasons a checkout transition did not happen.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The action does not apply to the session's current step.
    #[error("Not available on the {0} step")]
    WrongStep(CheckoutStep),

    #[error("Please check the address: {}", join(.0))]
    InvalidAddress(Vec<AddressField>),

    #[error("Please check the card details: {}", join(.0))]
    InvalidCard(Vec<CardField>),

    #[error("Please select a shipping option")]
    NoShippingSelected,

    #[error("Shipping option {0} does not exist")]
    UnknownShippingOption(usize),

    #[error("No shipping options are available for this address")]
    NoShippingOptions,

    #[error("Your cart is empty")]
    EmptyCart,

    /// The shipping-quote service failed or refused.
    #[error("Could not calculate shipping: {0}")]
    ShippingQuote(String),

    /// The order service failed or refused.
    #[error("Could not place the order: {0}")]
    OrderFailed(String),
}

fn join<T: Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
