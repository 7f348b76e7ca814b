//! State threaded through one checkout attempt.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use vitrine_core::{Address, CheckoutStep, OrderId, PaymentMethod, Price};

use super::countdown::RedirectCountdown;
use super::validation::{AddressForm, CardDetails};
use crate::api::ShippingOption;

/// Everything entered or received during one checkout attempt.
///
/// Owned by the caller and passed by `&mut` to every [`CheckoutFlow`]
/// transition. Form fields are public; the values that gate transitions
/// are only changed by the flow.
///
/// [`CheckoutFlow`]: super::CheckoutFlow
#[derive(Debug, Default)]
pub struct CheckoutSession {
    /// Address input as typed.
    pub address_form: AddressForm,
    /// Also store the address on the customer's account once it is accepted.
    pub save_address: bool,
    pub(crate) step: CheckoutStep,
    pub(crate) address: Option<Address>,
    pub(crate) shipping_options: Vec<ShippingOption>,
    pub(crate) selected_shipping: Option<ShippingOption>,
    pub(crate) payment_method: PaymentMethod,
    pub(crate) card_details: Option<CardDetails>,
    pub(crate) order_result: Option<OrderSummary>,
    pub(crate) error: Option<String>,
    pub(crate) countdown: Option<RedirectCountdown>,
}

impl CheckoutSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn step(&self) -> CheckoutStep {
        self.step
    }

    /// Address accepted on the address step.
    #[must_use]
    pub const fn address(&self) -> Option<&Address> {
        self.address.as_ref()
    }

    #[must_use]
    pub fn shipping_options(&self) -> &[ShippingOption] {
        &self.shipping_options
    }

    #[must_use]
    pub const fn selected_shipping(&self) -> Option<&ShippingOption> {
        self.selected_shipping.as_ref()
    }

    #[must_use]
    pub const fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    /// Card fields, present only while the payment method is a card.
    #[must_use]
    pub const fn card_details(&self) -> Option<&CardDetails> {
        self.card_details.as_ref()
    }

    /// Set once the order has been created.
    #[must_use]
    pub const fn order_result(&self) -> Option<&OrderSummary> {
        self.order_result.as_ref()
    }

    /// Message from the last failed transition, cleared by the next
    /// successful one.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Redirect countdown, running only on the confirmation step.
    #[must_use]
    pub const fn countdown(&self) -> Option<&RedirectCountdown> {
        self.countdown.as_ref()
    }

    #[must_use]
    pub const fn countdown_mut(&mut self) -> Option<&mut RedirectCountdown> {
        self.countdown.as_mut()
    }
}

/// Subtotal, shipping and total for the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutTotals {
    pub subtotal: Price,
    pub shipping: Price,
    pub total: Price,
}

/// What the confirmation step shows about a placed order.
///
/// Persisted so the confirmation can be rendered again after a restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub order_id: OrderId,
    #[serde(default)]
    pub status: Option<String>,
    pub placed_at: DateTime<Utc>,
    pub item_count: u32,
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub total: Decimal,
    pub payment_method: PaymentMethod,
    pub shipping_label: String,
    pub eta_days: u32,
    pub address: Address,
}

impl OrderSummary {
    #[must_use]
    pub fn total_price(&self) -> Price {
        Price::brl(self.total)
    }
}
