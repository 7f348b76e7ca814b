//! Checkout state machine.
//!
//! ```text
//! Address --submit_address--> Shipping --confirm_shipping--> Payment --submit_order--> Confirmation
//!    ^------------go_back---------'  ^-----------go_back-----------'
//! ```
//!
//! Every transition takes the session by `&mut`. A remote call therefore
//! completes against the same session state it was issued from; the caller
//! cannot navigate away while a quote or order request is outstanding.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};
use vitrine_core::{CheckoutStep, CurrencyCode, PaymentMethod, PostalCode, Price};

use super::countdown::{DEFAULT_REDIRECT_TICKS, RedirectCountdown};
use super::session::{CheckoutSession, CheckoutTotals, OrderSummary};
use super::validation::{AddressForm, CardDetails, CardField, validate_address, validate_card};
use super::CheckoutError;
use crate::api::{CheckoutBackend, OrderData, OrderItemRequest, OrderRequest};
use crate::cart::CartStore;
use crate::error::add_breadcrumb;
use crate::storage::{self, KeyValueStore, LAST_ORDER_KEY};

/// Drives [`CheckoutSession`]s through the checkout steps.
pub struct CheckoutFlow<B> {
    backend: B,
    cart: CartStore,
    storage: Arc<dyn KeyValueStore>,
    redirect_ticks: u32,
}

impl<B> std::fmt::Debug for CheckoutFlow<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutFlow")
            .field("cart", &self.cart)
            .field("redirect_ticks", &self.redirect_ticks)
            .finish_non_exhaustive()
    }
}

impl<B: CheckoutBackend> CheckoutFlow<B> {
    #[must_use]
    pub fn new(backend: B, cart: CartStore, storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            cart,
            storage,
            redirect_ticks: DEFAULT_REDIRECT_TICKS,
        }
    }

    /// Override the number of confirmation countdown ticks.
    #[must_use]
    pub const fn with_redirect_ticks(mut self, ticks: u32) -> Self {
        self.redirect_ticks = ticks;
        self
    }

    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    #[must_use]
    pub const fn cart(&self) -> &CartStore {
        &self.cart
    }

    /// Begin a new checkout attempt on the address step.
    #[must_use]
    pub fn start(&self) -> CheckoutSession {
        add_breadcrumb("checkout", "Checkout started", None);
        CheckoutSession::new()
    }

    // =========================================================================
    // Address step
    // =========================================================================

    /// Fill the address form from the customer's default saved address.
    ///
    /// Returns whether a default address was found. Lookup failures are
    /// logged and otherwise ignored.
    #[instrument(skip(self, session))]
    pub async fn prefill_default_address(&self, session: &mut CheckoutSession) -> bool {
        match self.backend.saved_addresses().await {
            Ok(addresses) => {
                let Some(saved) = addresses.into_iter().find(|a| a.is_default) else {
                    debug!("No default address on file");
                    return false;
                };
                session.address_form = AddressForm::from_address(&saved.address);
                debug!(address_id = %saved.id, "Address form pre-filled");
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to load saved addresses");
                false
            }
        }
    }

    /// Complete the address form from the postal code typed so far.
    ///
    /// Does nothing unless the postal code is a complete 8-digit code.
    /// Lookup failures are swallowed. Returns whether the form was updated.
    #[instrument(skip(self, session))]
    pub async fn lookup_postal_code(&self, session: &mut CheckoutSession) -> bool {
        let Ok(postal_code) = PostalCode::parse(&session.address_form.postal_code) else {
            return false;
        };
        match self.backend.lookup_postal_code(&postal_code).await {
            Ok(lookup) => {
                session.address_form.apply_lookup(&lookup);
                true
            }
            Err(e) => {
                debug!(error = %e, "Postal code lookup failed");
                false
            }
        }
    }

    /// Validate the address and request shipping quotes for it.
    ///
    /// On success the session moves to the shipping step holding the quoted
    /// options. On failure it stays on the address step with `error` set.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError` if the session is not on the address step, the
    /// address is invalid, the cart is empty, or no option could be quoted.
    #[instrument(skip(self, session))]
    pub async fn submit_address(&self, session: &mut CheckoutSession) -> Result<(), CheckoutError> {
        let result = self.try_submit_address(session).await;
        record(session, result)
    }

    async fn try_submit_address(&self, session: &mut CheckoutSession) -> Result<(), CheckoutError> {
        expect_step(session, CheckoutStep::Address)?;
        let address = validate_address(&session.address_form)?;
        if self.cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let subtotal = self.cart.cart_total().amount;
        let options = self
            .backend
            .quote_shipping(&address.postal_code, subtotal)
            .await
            .map_err(|e| {
                warn!(error = %e, "Shipping quote failed");
                CheckoutError::ShippingQuote(e.user_message())
            })?;
        if options.is_empty() {
            return Err(CheckoutError::NoShippingOptions);
        }

        if session.save_address {
            if let Err(e) = self.backend.save_address(&address, false).await {
                warn!(error = %e, "Failed to save address");
            }
        }

        // A previous selection survives only if it is still on offer.
        if let Some(selected) = &session.selected_shipping {
            if !options.contains(selected) {
                session.selected_shipping = None;
            }
        }

        info!(options = options.len(), "Shipping quoted");
        session.shipping_options = options;
        session.address = Some(address);
        session.step = CheckoutStep::Shipping;
        Ok(())
    }

    // =========================================================================
    // Shipping step
    // =========================================================================

    /// Select the shipping option at `index`, replacing any prior choice.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError` if the session is not on the shipping step or
    /// `index` is out of range.
    pub fn select_shipping(
        &self,
        session: &mut CheckoutSession,
        index: usize,
    ) -> Result<(), CheckoutError> {
        let result = expect_step(session, CheckoutStep::Shipping).and_then(|()| {
            let option = session
                .shipping_options
                .get(index)
                .cloned()
                .ok_or(CheckoutError::UnknownShippingOption(index))?;
            debug!(carrier = %option.carrier_label, price = %option.price, "Shipping selected");
            session.selected_shipping = Some(option);
            Ok(())
        });
        record(session, result)
    }

    /// Move on to the payment step.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError` if the session is not on the shipping step or
    /// no option is selected.
    pub fn confirm_shipping(&self, session: &mut CheckoutSession) -> Result<(), CheckoutError> {
        let result = expect_step(session, CheckoutStep::Shipping).and_then(|()| {
            if session.shipping_options.is_empty() {
                return Err(CheckoutError::NoShippingOptions);
            }
            if session.selected_shipping.is_none() {
                return Err(CheckoutError::NoShippingSelected);
            }
            session.step = CheckoutStep::Payment;
            Ok(())
        });
        record(session, result)
    }

    /// Return to the previous step, keeping everything already entered.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::WrongStep` on the address and confirmation
    /// steps.
    pub fn go_back(&self, session: &mut CheckoutSession) -> Result<CheckoutStep, CheckoutError> {
        let result = session
            .step
            .previous()
            .ok_or(CheckoutError::WrongStep(session.step));
        if let Ok(previous) = result {
            session.step = previous;
        }
        record(session, result)
    }

    // =========================================================================
    // Payment step
    // =========================================================================

    /// Choose how to pay. Switching away from card discards card details.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::WrongStep` outside the payment step.
    pub fn select_payment_method(
        &self,
        session: &mut CheckoutSession,
        method: PaymentMethod,
    ) -> Result<(), CheckoutError> {
        let result = expect_step(session, CheckoutStep::Payment).map(|()| {
            session.payment_method = method;
            if !method.requires_card() {
                session.card_details = None;
            }
        });
        record(session, result)
    }

    /// Enter card details. Implies paying by card.
    ///
    /// The details are only validated when the order is submitted.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::WrongStep` outside the payment step.
    pub fn set_card_details(
        &self,
        session: &mut CheckoutSession,
        card: CardDetails,
    ) -> Result<(), CheckoutError> {
        let result = expect_step(session, CheckoutStep::Payment).map(|()| {
            session.payment_method = PaymentMethod::Card;
            session.card_details = Some(card);
        });
        record(session, result)
    }

    /// Place the order.
    ///
    /// Card details are validated before any network call. On success the
    /// cart is cleared, the order summary is persisted, the session moves to
    /// the confirmation step and the redirect countdown starts.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError` on local validation failures or if the order
    /// service rejects the order. The session stays on the payment step.
    #[instrument(skip(self, session), fields(payment_method = %session.payment_method))]
    pub async fn submit_order(
        &self,
        session: &mut CheckoutSession,
    ) -> Result<OrderSummary, CheckoutError> {
        let result = self.try_submit_order(session).await;
        record(session, result)
    }

    async fn try_submit_order(
        &self,
        session: &mut CheckoutSession,
    ) -> Result<OrderSummary, CheckoutError> {
        expect_step(session, CheckoutStep::Payment)?;
        let shipping = session
            .selected_shipping
            .clone()
            .ok_or(CheckoutError::NoShippingSelected)?;
        let address = session
            .address
            .clone()
            .ok_or(CheckoutError::WrongStep(session.step))?;

        let card = if session.payment_method.requires_card() {
            let card = session.card_details.as_ref().ok_or_else(|| {
                CheckoutError::InvalidCard(vec![
                    CardField::Number,
                    CardField::HolderName,
                    CardField::Expiry,
                    CardField::Cvv,
                ])
            })?;
            validate_card(card)?;
            Some(card.to_payload())
        } else {
            None
        };

        let items = self.cart.items();
        if items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let totals = self.totals(session);
        let request = OrderRequest {
            items: items
                .iter()
                .map(|item| OrderItemRequest {
                    product_id: item.product_id,
                    quantity: item.quantity,
                    price: item.unit_price,
                })
                .collect(),
            order_data: OrderData {
                address: address.clone(),
                shipping: shipping.clone(),
                payment_method: session.payment_method,
                card,
                subtotal: totals.subtotal.amount,
                shipping_cost: totals.shipping.amount,
                total: totals.total.amount,
            },
        };

        let placed = self.backend.create_order(&request).await.map_err(|e| {
            warn!(error = %e, "Order creation failed");
            CheckoutError::OrderFailed(e.user_message())
        })?;

        let summary = OrderSummary {
            order_id: placed.id,
            status: placed.status,
            placed_at: placed.created_at.unwrap_or_else(Utc::now),
            item_count: items.iter().map(|i| i.quantity).sum(),
            subtotal: totals.subtotal.amount,
            shipping_cost: totals.shipping.amount,
            total: totals.total.amount,
            payment_method: session.payment_method,
            shipping_label: shipping.carrier_label,
            eta_days: shipping.eta_days,
            address,
        };
        info!(order_id = %summary.order_id, total = %summary.total, "Order placed");
        let order_id = summary.order_id.to_string();
        add_breadcrumb("checkout", "Order placed", Some(&[("order_id", order_id.as_str())]));

        self.cart.clear_cart();
        if let Err(e) = storage::write_json(self.storage.as_ref(), LAST_ORDER_KEY, &summary) {
            warn!(error = %e, "Failed to persist order summary");
        }

        session.order_result = Some(summary.clone());
        session.step = CheckoutStep::Confirmation;
        self.restart_countdown(session);
        Ok(summary)
    }

    // =========================================================================
    // Confirmation step
    // =========================================================================

    /// Start the redirect countdown from the top, dropping any running one.
    ///
    /// Only meaningful on the confirmation step; elsewhere it does nothing.
    pub fn restart_countdown(&self, session: &mut CheckoutSession) {
        if session.step.is_terminal() {
            session.countdown = Some(RedirectCountdown::start(self.redirect_ticks));
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Cart subtotal, selected shipping cost and their sum.
    #[must_use]
    pub fn totals(&self, session: &CheckoutSession) -> CheckoutTotals {
        let subtotal = self.cart.cart_total();
        let shipping = session
            .selected_shipping
            .as_ref()
            .map_or(Price::zero(CurrencyCode::BRL), |s| s.cost());
        CheckoutTotals {
            subtotal,
            shipping,
            total: subtotal + shipping,
        }
    }

    /// Summary of the most recently placed order, if any.
    #[must_use]
    pub fn last_order(&self) -> Option<OrderSummary> {
        storage::read_json(self.storage.as_ref(), LAST_ORDER_KEY)
            .inspect_err(|e| warn!(error = %e, "Failed to read last order"))
            .ok()
            .flatten()
    }
}

fn expect_step(session: &CheckoutSession, step: CheckoutStep) -> Result<(), CheckoutError> {
    if session.step == step {
        Ok(())
    } else {
        Err(CheckoutError::WrongStep(session.step))
    }
}

/// Mirror the outcome of a transition into the session's error message.
fn record<T>(
    session: &mut CheckoutSession,
    result: Result<T, CheckoutError>,
) -> Result<T, CheckoutError> {
    match &result {
        Ok(_) => session.error = None,
        Err(e) => session.error = Some(e.to_string()),
    }
    result
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Mutex, PoisonError};
    use std::time::Duration;

    use rust_decimal::Decimal;
    use vitrine_core::{Address, OrderId, Product, ProductId};

    use super::*;
    use crate::api::{ApiError, PlacedOrder, PostalLookup, SavedAddress, ShippingOption};
    use crate::storage::MemoryStore;

    #[derive(Default)]
    struct StubBackend {
        options: Vec<ShippingOption>,
        fail_quote: bool,
        fail_order: bool,
        orders: Mutex<Vec<OrderRequest>>,
        saved: Mutex<Vec<Address>>,
    }

    impl StubBackend {
        fn orders(&self) -> usize {
            self.orders
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .len()
        }
    }

    impl CheckoutBackend for StubBackend {
        async fn quote_shipping(
            &self,
            _postal_code: &PostalCode,
            _subtotal: Decimal,
        ) -> Result<Vec<ShippingOption>, ApiError> {
            if self.fail_quote {
                return Err(ApiError::Rejected("Region not served".to_string()));
            }
            Ok(self.options.clone())
        }

        async fn lookup_postal_code(
            &self,
            _postal_code: &PostalCode,
        ) -> Result<PostalLookup, ApiError> {
            Err(ApiError::NotFound("postal code".to_string()))
        }

        async fn saved_addresses(&self) -> Result<Vec<SavedAddress>, ApiError> {
            Ok(Vec::new())
        }

        async fn save_address(&self, address: &Address, _is_default: bool) -> Result<(), ApiError> {
            self.saved.lock().unwrap().push(address.clone());
            Ok(())
        }

        async fn create_order(&self, request: &OrderRequest) -> Result<PlacedOrder, ApiError> {
            self.orders.lock().unwrap().push(request.clone());
            if self.fail_order {
                return Err(ApiError::Rejected("Payment declined".to_string()));
            }
            Ok(PlacedOrder {
                id: OrderId::new(9001),
                status: Some("pending".to_string()),
                created_at: None,
            })
        }
    }

    fn option(label: &str, price: i64) -> ShippingOption {
        ShippingOption {
            carrier_label: label.to_string(),
            eta_days: 3,
            price: Decimal::new(price, 0),
            description: None,
        }
    }

    fn form() -> AddressForm {
        AddressForm {
            postal_code: "01310100".to_string(),
            street: "Av. Paulista".to_string(),
            number: "1000".to_string(),
            complement: String::new(),
            neighborhood: "Bela Vista".to_string(),
            city: "São Paulo".to_string(),
            region: "SP".to_string(),
        }
    }

    fn flow_with(backend: StubBackend) -> CheckoutFlow<StubBackend> {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let cart = CartStore::open(Arc::clone(&storage), Duration::ZERO);
        cart.add_to_cart(
            &Product {
                id: ProductId::new(1),
                name: "A".to_string(),
                price: Decimal::new(10, 0),
                stock: 5,
                images: Vec::new(),
                description: None,
                category: None,
            },
            3,
        );
        CheckoutFlow::new(backend, cart, storage)
    }

    async fn at_payment(flow: &CheckoutFlow<StubBackend>) -> CheckoutSession {
        let mut session = flow.start();
        session.address_form = form();
        flow.submit_address(&mut session).await.unwrap();
        flow.select_shipping(&mut session, 0).unwrap();
        flow.confirm_shipping(&mut session).unwrap();
        session
    }

    #[tokio::test]
    async fn test_happy_path_reaches_confirmation() {
        let flow = flow_with(StubBackend {
            options: vec![option("Standard", 15)],
            ..StubBackend::default()
        });
        let mut session = at_payment(&flow).await;
        assert_eq!(flow.totals(&session).total.amount, Decimal::new(45, 0));

        let summary = flow.submit_order(&mut session).await.unwrap();
        assert_eq!(summary.order_id, OrderId::new(9001));
        assert_eq!(summary.total, Decimal::new(45, 0));
        assert_eq!(session.step(), CheckoutStep::Confirmation);
        assert!(flow.cart().is_empty());
        assert_eq!(flow.last_order(), Some(summary));
        assert_eq!(session.countdown().unwrap().remaining(), DEFAULT_REDIRECT_TICKS);
    }

    #[tokio::test]
    async fn test_quote_failure_stays_on_address() {
        let flow = flow_with(StubBackend {
            fail_quote: true,
            ..StubBackend::default()
        });
        let mut session = flow.start();
        session.address_form = form();

        let err = flow.submit_address(&mut session).await.unwrap_err();
        assert!(matches!(err, CheckoutError::ShippingQuote(ref m) if m == "Region not served"));
        assert_eq!(session.step(), CheckoutStep::Address);
        assert!(session.error().unwrap().contains("Region not served"));
    }

    #[tokio::test]
    async fn test_empty_quote_blocks_shipping() {
        let flow = flow_with(StubBackend::default());
        let mut session = flow.start();
        session.address_form = form();

        let err = flow.submit_address(&mut session).await.unwrap_err();
        assert!(matches!(err, CheckoutError::NoShippingOptions));
        assert_eq!(session.step(), CheckoutStep::Address);
    }

    #[tokio::test]
    async fn test_confirm_requires_selection() {
        let flow = flow_with(StubBackend {
            options: vec![option("Standard", 15), option("Express", 30)],
            ..StubBackend::default()
        });
        let mut session = flow.start();
        session.address_form = form();
        flow.submit_address(&mut session).await.unwrap();

        assert!(matches!(
            flow.confirm_shipping(&mut session),
            Err(CheckoutError::NoShippingSelected)
        ));
        assert!(matches!(
            flow.select_shipping(&mut session, 2),
            Err(CheckoutError::UnknownShippingOption(2))
        ));

        flow.select_shipping(&mut session, 0).unwrap();
        flow.select_shipping(&mut session, 1).unwrap();
        assert_eq!(session.selected_shipping().unwrap().carrier_label, "Express");
        assert!(session.error().is_none());
    }

    #[tokio::test]
    async fn test_go_back_keeps_data() {
        let flow = flow_with(StubBackend {
            options: vec![option("Standard", 15)],
            ..StubBackend::default()
        });
        let mut session = at_payment(&flow).await;

        assert_eq!(flow.go_back(&mut session).unwrap(), CheckoutStep::Shipping);
        assert_eq!(flow.go_back(&mut session).unwrap(), CheckoutStep::Address);
        assert!(flow.go_back(&mut session).is_err());
        assert!(session.selected_shipping().is_some());
        assert_eq!(session.address_form, form());
    }

    #[tokio::test]
    async fn test_invalid_card_blocks_before_network() {
        let flow = flow_with(StubBackend {
            options: vec![option("Standard", 15)],
            ..StubBackend::default()
        });
        let mut session = at_payment(&flow).await;
        flow.set_card_details(
            &mut session,
            CardDetails {
                number: "4111".to_string(),
                holder_name: "Ana Souza".to_string(),
                expiry: "12/30".to_string(),
                cvv: "123".to_string(),
            },
        )
        .unwrap();

        let err = flow.submit_order(&mut session).await.unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidCard(ref f) if f == &[CardField::Number]));
        assert_eq!(flow.backend().orders(), 0);
        assert_eq!(session.step(), CheckoutStep::Payment);
        assert!(!flow.cart().is_empty());
    }

    #[tokio::test]
    async fn test_card_method_without_details_is_rejected() {
        let flow = flow_with(StubBackend {
            options: vec![option("Standard", 15)],
            ..StubBackend::default()
        });
        let mut session = at_payment(&flow).await;
        flow.select_payment_method(&mut session, PaymentMethod::Card)
            .unwrap();
        assert!(matches!(
            flow.submit_order(&mut session).await,
            Err(CheckoutError::InvalidCard(_))
        ));
        assert_eq!(flow.backend().orders(), 0);
    }

    #[tokio::test]
    async fn test_switching_away_from_card_drops_details() {
        let flow = flow_with(StubBackend {
            options: vec![option("Standard", 15)],
            ..StubBackend::default()
        });
        let mut session = at_payment(&flow).await;
        flow.set_card_details(&mut session, CardDetails::default())
            .unwrap();
        assert_eq!(session.payment_method(), PaymentMethod::Card);

        flow.select_payment_method(&mut session, PaymentMethod::Invoice)
            .unwrap();
        assert!(session.card_details().is_none());
    }

    #[tokio::test]
    async fn test_order_failure_keeps_cart() {
        let flow = flow_with(StubBackend {
            options: vec![option("Standard", 15)],
            fail_order: true,
            ..StubBackend::default()
        });
        let mut session = at_payment(&flow).await;

        let err = flow.submit_order(&mut session).await.unwrap_err();
        assert!(matches!(err, CheckoutError::OrderFailed(ref m) if m == "Payment declined"));
        assert_eq!(session.step(), CheckoutStep::Payment);
        assert_eq!(flow.cart().item_count(), 3);
        assert!(flow.last_order().is_none());
        assert!(session.countdown().is_none());
    }

    #[tokio::test]
    async fn test_save_address_flag() {
        let flow = flow_with(StubBackend {
            options: vec![option("Standard", 15)],
            ..StubBackend::default()
        });
        let mut session = flow.start();
        session.address_form = form();
        session.save_address = true;
        flow.submit_address(&mut session).await.unwrap();
        assert_eq!(flow.backend().saved.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_transitions_reject_wrong_step() {
        let flow = flow_with(StubBackend::default());
        let mut session = flow.start();
        assert!(matches!(
            flow.confirm_shipping(&mut session),
            Err(CheckoutError::WrongStep(CheckoutStep::Address))
        ));
        assert!(matches!(
            flow.submit_order(&mut session).await,
            Err(CheckoutError::WrongStep(CheckoutStep::Address))
        ));
    }

    #[tokio::test]
    async fn test_failed_lookup_leaves_form_untouched() {
        let flow = flow_with(StubBackend::default());
        let mut session = flow.start();
        session.address_form = form();
        assert!(!flow.lookup_postal_code(&mut session).await);
        assert_eq!(session.address_form, form());
    }

    #[tokio::test]
    async fn test_countdown_only_runs_after_order() {
        let flow = flow_with(StubBackend {
            options: vec![option("Standard", 15)],
            ..StubBackend::default()
        });
        let mut session = at_payment(&flow).await;

        flow.restart_countdown(&mut session);
        assert!(session.countdown().is_none());

        flow.submit_order(&mut session).await.unwrap();
        assert!(session.countdown().is_some());
    }
}
