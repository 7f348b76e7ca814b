//! Non-interactive checkout.

use clap::Args;
use vitrine_core::{CheckoutStep, PaymentMethod};
use vitrine_storefront::checkout::{CardDetails, CheckoutTotals, OrderSummary};
use vitrine_storefront::error::{AppError, Result};
use vitrine_storefront::state::AppState;

use super::say;

#[derive(Args)]
pub struct CheckoutArgs {
    /// Start from the default address saved on the account
    #[arg(long)]
    use_default_address: bool,

    /// Complete street, neighborhood, city and region from the postal code
    #[arg(long)]
    lookup: bool,

    /// Postal code, `01310-100` or `01310100`
    #[arg(long)]
    postal_code: Option<String>,

    #[arg(long)]
    street: Option<String>,

    /// House or building number
    #[arg(long)]
    number: Option<String>,

    #[arg(long)]
    complement: Option<String>,

    #[arg(long)]
    neighborhood: Option<String>,

    #[arg(long)]
    city: Option<String>,

    /// Two-letter region code
    #[arg(long)]
    region: Option<String>,

    /// Save the address on the account
    #[arg(long)]
    save_address: bool,

    /// Index of the shipping option to pick (see the printed list)
    #[arg(long, default_value_t = 0)]
    shipping: usize,

    /// `instant_transfer`, `invoice`, `card` or `account_balance`
    #[arg(long, default_value = "instant_transfer")]
    payment: PaymentMethod,

    #[arg(long, requires = "card_holder")]
    card_number: Option<String>,

    #[arg(long)]
    card_holder: Option<String>,

    /// MM/YY
    #[arg(long)]
    card_expiry: Option<String>,

    #[arg(long)]
    card_cvv: Option<String>,

    /// Exit right after the order instead of waiting out the countdown
    #[arg(long)]
    no_wait: bool,
}

impl CheckoutArgs {
    fn card(&self) -> Option<CardDetails> {
        if self.payment != PaymentMethod::Card {
            return None;
        }
        Some(CardDetails {
            number: self.card_number.clone().unwrap_or_default(),
            holder_name: self.card_holder.clone().unwrap_or_default(),
            expiry: self.card_expiry.clone().unwrap_or_default(),
            cvv: self.card_cvv.clone().unwrap_or_default(),
        })
    }
}

pub async fn run(state: &AppState, args: CheckoutArgs) -> Result<()> {
    let flow = state.checkout();
    if flow.cart().is_empty() {
        return Err(AppError::BadRequest(
            "Your cart is empty; add products before checking out".to_string(),
        ));
    }

    let mut session = flow.start();

    // Address
    announce(session.step());
    if args.use_default_address && !flow.prefill_default_address(&mut session).await {
        say("No default address on file.");
    }
    let form = &mut session.address_form;
    for (field, value) in [
        (&mut form.postal_code, &args.postal_code),
        (&mut form.street, &args.street),
        (&mut form.number, &args.number),
        (&mut form.complement, &args.complement),
        (&mut form.neighborhood, &args.neighborhood),
        (&mut form.city, &args.city),
        (&mut form.region, &args.region),
    ] {
        if let Some(value) = value {
            field.clone_from(value);
        }
    }
    if args.lookup && !flow.lookup_postal_code(&mut session).await {
        say("Postal code lookup found nothing; using the address as given.");
    }
    session.save_address = args.save_address;
    flow.submit_address(&mut session).await?;

    // Shipping
    announce(session.step());
    if let Some(address) = session.address() {
        say(&format!("Deliver to: {}", address.one_line()));
    }
    for (index, option) in session.shipping_options().iter().enumerate() {
        say(&format!(
            "  [{index}] {}  {}  {}",
            option.carrier_label,
            option.eta_label(),
            option.cost().display()
        ));
    }
    flow.select_shipping(&mut session, args.shipping)?;
    flow.confirm_shipping(&mut session)?;

    // Payment
    announce(session.step());
    print_totals(&flow.totals(&session));

    match args.card() {
        Some(card) => flow.set_card_details(&mut session, card)?,
        None => flow.select_payment_method(&mut session, args.payment)?,
    }
    let summary = flow.submit_order(&mut session).await?;

    // Confirmation
    announce(session.step());
    print_summary(&summary);

    if !args.no_wait {
        if let Some(countdown) = session.countdown_mut() {
            say(&format!(
                "Returning to the store in {} seconds...",
                countdown.remaining()
            ));
            countdown.wait().await;
        }
    }
    Ok(())
}

/// Print the summary of the last order placed, if any.
pub fn last_order(state: &AppState) {
    match state.checkout().last_order() {
        Some(summary) => print_summary(&summary),
        None => say("No order has been placed yet."),
    }
}

fn announce(step: CheckoutStep) {
    say(&format!(
        "[{}/{}] {step}",
        step.number(),
        CheckoutStep::Confirmation.number()
    ));
}

fn print_totals(totals: &CheckoutTotals) {
    say(&format!("Subtotal: {}", totals.subtotal.display()));
    say(&format!("Shipping: {}", totals.shipping.display()));
    say(&format!("Total:    {}", totals.total.display()));
}

fn print_summary(summary: &OrderSummary) {
    say(&format!(
        "Order #{} placed on {}",
        summary.order_id,
        summary.placed_at.format("%Y-%m-%d %H:%M UTC")
    ));
    say(&format!(
        "{} item(s), {} via {}, arriving in {} day(s)",
        summary.item_count,
        summary.total_price().display(),
        summary.payment_method.label(),
        summary.eta_days
    ));
    say(&format!(
        "Shipping: {} to {}",
        summary.shipping_label,
        summary.address.one_line()
    ));
}
