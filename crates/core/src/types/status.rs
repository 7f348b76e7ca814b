//! Enumerations that drive the cart and checkout.

use serde::{Deserialize, Serialize};

/// Payment method chosen on the payment step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Instant bank transfer (PIX).
    #[default]
    InstantTransfer,
    /// Bank invoice (boleto), paid later.
    Invoice,
    /// Credit card; requires validated card details.
    Card,
    /// Store account balance.
    AccountBalance,
}

impl PaymentMethod {
    /// Every method, in display order.
    pub const ALL: [Self; 4] = [
        Self::InstantTransfer,
        Self::Invoice,
        Self::Card,
        Self::AccountBalance,
    ];

    /// Whether the method needs card details before an order can be placed.
    #[must_use]
    pub const fn requires_card(self) -> bool {
        matches!(self, Self::Card)
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::InstantTransfer => "Instant transfer",
            Self::Invoice => "Invoice",
            Self::Card => "Credit card",
            Self::AccountBalance => "Account balance",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InstantTransfer => write!(f, "instant_transfer"),
            Self::Invoice => write!(f, "invoice"),
            Self::Card => write!(f, "card"),
            Self::AccountBalance => write!(f, "account_balance"),
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "instant_transfer" | "pix" => Ok(Self::InstantTransfer),
            "invoice" | "boleto" => Ok(Self::Invoice),
            "card" | "credit_card" => Ok(Self::Card),
            "account_balance" | "balance" => Ok(Self::AccountBalance),
            _ => Err(format!("invalid payment method: {s}")),
        }
    }
}

/// Step of the checkout state machine.
///
/// Transitions are strictly linear: `Address -> Shipping -> Payment ->
/// Confirmation`, with backward moves allowed from `Shipping` and `Payment`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    #[default]
    Address,
    Shipping,
    Payment,
    Confirmation,
}

impl CheckoutStep {
    /// The step after this one, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Address => Some(Self::Shipping),
            Self::Shipping => Some(Self::Payment),
            Self::Payment => Some(Self::Confirmation),
            Self::Confirmation => None,
        }
    }

    /// The step a "back" action returns to. `Address` has nowhere to go and
    /// `Confirmation` is terminal.
    #[must_use]
    pub const fn previous(self) -> Option<Self> {
        match self {
            Self::Shipping => Some(Self::Address),
            Self::Payment => Some(Self::Shipping),
            Self::Address | Self::Confirmation => None,
        }
    }

    /// Step number (1-indexed) for progress indicators.
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::Address => 1,
            Self::Shipping => 2,
            Self::Payment => 3,
            Self::Confirmation => 4,
        }
    }

    /// Whether the flow has finished.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Confirmation)
    }
}

impl std::fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Address => write!(f, "address"),
            Self::Shipping => write!(f, "shipping"),
            Self::Payment => write!(f, "payment"),
            Self::Confirmation => write!(f, "confirmation"),
        }
    }
}

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Success,
    Info,
    Warning,
    Error,
}
