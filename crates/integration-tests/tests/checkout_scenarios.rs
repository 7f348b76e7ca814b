//! End-to-end checkout against the in-process fake backend.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use rust_decimal::Decimal;
use vitrine_core::{
    Address, AddressId, CheckoutStep, OrderId, PaymentMethod, PostalCode, RegionCode,
};
use vitrine_integration_tests::{Call, FakeBackend, checkout, product, shipping};
use vitrine_storefront::api::{PostalLookup, SavedAddress};
use vitrine_storefront::checkout::{
    AddressForm, CardDetails, CardField, CheckoutError, CheckoutFlow, CheckoutSession,
};

fn paulista() -> AddressForm {
    AddressForm {
        postal_code: "01310-100".to_string(),
        street: "Av. Paulista".to_string(),
        number: "1000".to_string(),
        complement: String::new(),
        neighborhood: "Bela Vista".to_string(),
        city: "São Paulo".to_string(),
        region: "SP".to_string(),
    }
}

/// A flow whose cart holds 3 x R$ 10.
fn flow_with_cart(backend: FakeBackend) -> CheckoutFlow<FakeBackend> {
    let flow = checkout(backend);
    flow.cart().add_to_cart(&product(1, "A", 10, 5), 3);
    flow
}

async fn reach_payment(flow: &CheckoutFlow<FakeBackend>) -> CheckoutSession {
    let mut session = flow.start();
    session.address_form = paulista();
    flow.submit_address(&mut session).await.unwrap();
    flow.select_shipping(&mut session, 0).unwrap();
    flow.confirm_shipping(&mut session).unwrap();
    session
}

// =============================================================================
// Happy Path
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_instant_transfer_checkout_completes() {
    let flow = flow_with_cart(FakeBackend::quoting(vec![shipping("Standard", 5, 15)]));
    let mut session = flow.start();
    session.address_form = paulista();

    flow.submit_address(&mut session).await.unwrap();
    assert_eq!(session.step(), CheckoutStep::Shipping);
    assert!(!session.shipping_options().is_empty());

    flow.select_shipping(&mut session, 0).unwrap();
    flow.confirm_shipping(&mut session).unwrap();
    assert_eq!(session.step(), CheckoutStep::Payment);

    let totals = flow.totals(&session);
    assert_eq!(totals.subtotal.amount, Decimal::new(30, 0));
    assert_eq!(totals.shipping.amount, Decimal::new(15, 0));
    assert_eq!(totals.total.amount, Decimal::new(45, 0));

    flow.select_payment_method(&mut session, PaymentMethod::InstantTransfer)
        .unwrap();
    let summary = flow.submit_order(&mut session).await.unwrap();

    assert_eq!(session.step(), CheckoutStep::Confirmation);
    assert_eq!(summary.order_id, OrderId::new(1001));
    assert_eq!(summary.total, Decimal::new(45, 0));
    assert_eq!(summary.shipping_label, "Standard");
    assert_eq!(summary.item_count, 3);
    assert!(flow.cart().is_empty());
    assert_eq!(flow.last_order(), Some(summary));

    let calls = flow.backend().calls();
    assert_eq!(
        calls.first(),
        Some(&Call::QuoteShipping {
            postal_code: "01310100".to_string(),
            subtotal: Decimal::new(30, 0),
        })
    );
    assert_eq!(
        calls.last(),
        Some(&Call::CreateOrder {
            items: 1,
            total: Decimal::new(45, 0),
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_card_checkout_with_valid_details() {
    let flow = flow_with_cart(FakeBackend::quoting(vec![shipping("Express", 1, 25)]));
    let mut session = reach_payment(&flow).await;

    flow.set_card_details(
        &mut session,
        CardDetails {
            number: "4111 1111 1111 1111".to_string(),
            holder_name: "Ana Souza".to_string(),
            expiry: "12/30".to_string(),
            cvv: "123".to_string(),
        },
    )
    .unwrap();
    let summary = flow.submit_order(&mut session).await.unwrap();

    assert_eq!(summary.payment_method, PaymentMethod::Card);
    assert_eq!(summary.total, Decimal::new(55, 0));
    assert_eq!(flow.backend().order_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_confirmation_countdown_runs_out() {
    let flow = flow_with_cart(FakeBackend::quoting(vec![shipping("Standard", 5, 15)]));
    let mut session = reach_payment(&flow).await;
    flow.submit_order(&mut session).await.unwrap();

    let countdown = session.countdown_mut().unwrap();
    assert_eq!(countdown.remaining(), 8);
    tokio::time::sleep(Duration::from_millis(3_500)).await;
    assert_eq!(countdown.remaining(), 5);

    countdown.wait().await;
    assert!(countdown.is_finished());
}

#[tokio::test(start_paused = true)]
async fn test_restarting_countdown_resets_it() {
    let flow = flow_with_cart(FakeBackend::quoting(vec![shipping("Standard", 5, 15)]))
        .with_redirect_ticks(4);
    let mut session = reach_payment(&flow).await;
    flow.submit_order(&mut session).await.unwrap();

    tokio::time::sleep(Duration::from_millis(2_500)).await;
    assert_eq!(session.countdown().unwrap().remaining(), 2);

    flow.restart_countdown(&mut session);
    assert_eq!(session.countdown().unwrap().remaining(), 4);
}

// =============================================================================
// Local Validation
// =============================================================================

#[tokio::test]
async fn test_short_card_number_blocks_without_network_call() {
    let flow = flow_with_cart(FakeBackend::quoting(vec![shipping("Standard", 5, 15)]));
    let mut session = reach_payment(&flow).await;

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

    assert!(matches!(err, CheckoutError::InvalidCard(ref fields) if fields == &[CardField::Number]));
    assert_eq!(flow.backend().order_calls(), 0);
    assert_eq!(session.step(), CheckoutStep::Payment);
    assert_eq!(flow.cart().item_count(), 3);
    assert!(session.error().is_some());
}

#[tokio::test]
async fn test_invalid_address_makes_no_quote_request() {
    let flow = flow_with_cart(FakeBackend::quoting(vec![shipping("Standard", 5, 15)]));
    let mut session = flow.start();
    session.address_form = AddressForm {
        postal_code: "123".to_string(),
        ..paulista()
    };

    let err = flow.submit_address(&mut session).await.unwrap_err();
    assert!(matches!(err, CheckoutError::InvalidAddress(_)));
    assert!(flow.backend().calls().is_empty());
    assert_eq!(session.step(), CheckoutStep::Address);
}

#[tokio::test]
async fn test_empty_cart_cannot_check_out() {
    let flow = checkout(FakeBackend::quoting(vec![shipping("Standard", 5, 15)]));
    let mut session = flow.start();
    session.address_form = paulista();

    let err = flow.submit_address(&mut session).await.unwrap_err();
    assert!(matches!(err, CheckoutError::EmptyCart));
    assert!(flow.backend().calls().is_empty());
}

// =============================================================================
// Remote Failures
// =============================================================================

#[tokio::test]
async fn test_rejected_quote_can_be_retried() {
    let mut backend = FakeBackend::quoting(Vec::new());
    backend.quote = Some(Err("We do not deliver to this region".to_string()));
    let flow = flow_with_cart(backend);
    let mut session = flow.start();
    session.address_form = paulista();

    let err = flow.submit_address(&mut session).await.unwrap_err();
    assert!(matches!(err, CheckoutError::ShippingQuote(_)));
    assert_eq!(session.step(), CheckoutStep::Address);
    assert!(
        session
            .error()
            .unwrap()
            .contains("We do not deliver to this region")
    );

    // Resubmitting issues a fresh request
    let _ = flow.submit_address(&mut session).await;
    assert_eq!(flow.backend().calls().len(), 2);
}

#[tokio::test]
async fn test_unavailable_shipping_service_hides_detail() {
    let flow = flow_with_cart(FakeBackend::default());
    let mut session = flow.start();
    session.address_form = paulista();

    let err = flow.submit_address(&mut session).await.unwrap_err();
    assert!(!err.to_string().contains("503"));
    assert!(!session.error().unwrap().contains("unavailable"));
}

#[tokio::test]
async fn test_rejected_order_stays_on_payment() {
    let mut backend = FakeBackend::quoting(vec![shipping("Standard", 5, 15)]);
    backend.order_rejection = Some("Insufficient balance".to_string());
    let flow = flow_with_cart(backend);
    let mut session = reach_payment(&flow).await;
    flow.select_payment_method(&mut session, PaymentMethod::AccountBalance)
        .unwrap();

    let err = flow.submit_order(&mut session).await.unwrap_err();
    assert!(matches!(err, CheckoutError::OrderFailed(ref m) if m == "Insufficient balance"));
    assert_eq!(session.step(), CheckoutStep::Payment);
    assert!(session.order_result().is_none());
    assert_eq!(flow.cart().item_count(), 3);
    assert!(flow.last_order().is_none());
}

// =============================================================================
// Address Helpers
// =============================================================================

#[tokio::test]
async fn test_prefill_uses_default_address() {
    let default = Address {
        postal_code: PostalCode::parse("20040-020").unwrap(),
        street: "Rua da Assembleia".to_string(),
        number: "10".to_string(),
        complement: Some("sala 501".to_string()),
        neighborhood: "Centro".to_string(),
        city: "Rio de Janeiro".to_string(),
        region: RegionCode::parse("RJ").unwrap(),
    };
    let backend = FakeBackend {
        saved: vec![
            SavedAddress {
                id: AddressId::new(1),
                is_default: false,
                address: Address {
                    city: "Niterói".to_string(),
                    ..default.clone()
                },
            },
            SavedAddress {
                id: AddressId::new(2),
                is_default: true,
                address: default.clone(),
            },
        ],
        ..FakeBackend::quoting(vec![shipping("Standard", 5, 15)])
    };
    let flow = flow_with_cart(backend);
    let mut session = flow.start();

    assert!(flow.prefill_default_address(&mut session).await);
    assert_eq!(session.address_form.city, "Rio de Janeiro");

    flow.submit_address(&mut session).await.unwrap();
    assert_eq!(session.address(), Some(&default));
}

#[tokio::test]
async fn test_postal_lookup_completes_form() {
    let backend = FakeBackend {
        lookup: Some(PostalLookup {
            street: Some("Av. Paulista".to_string()),
            neighborhood: Some("Bela Vista".to_string()),
            city: Some("São Paulo".to_string()),
            region: Some("SP".to_string()),
        }),
        ..FakeBackend::quoting(vec![shipping("Standard", 5, 15)])
    };
    let flow = flow_with_cart(backend);
    let mut session = flow.start();
    session.address_form.postal_code = "01310100".to_string();
    session.address_form.number = "1000".to_string();

    assert!(flow.lookup_postal_code(&mut session).await);
    flow.submit_address(&mut session).await.unwrap();
    assert_eq!(session.step(), CheckoutStep::Shipping);
}

#[tokio::test]
async fn test_partial_postal_code_skips_lookup() {
    let flow = flow_with_cart(FakeBackend::default());
    let mut session = flow.start();
    session.address_form.postal_code = "01310".to_string();

    assert!(!flow.lookup_postal_code(&mut session).await);
    assert!(flow.backend().calls().is_empty());
}

#[tokio::test]
async fn test_save_address_posts_accepted_address() {
    let flow = flow_with_cart(FakeBackend::quoting(vec![shipping("Standard", 5, 15)]));
    let mut session = flow.start();
    session.address_form = paulista();
    session.save_address = true;

    flow.submit_address(&mut session).await.unwrap();
    assert!(
        flow.backend()
            .calls()
            .iter()
            .any(|c| matches!(c, Call::SaveAddress(a) if a.city == "São Paulo"))
    );
}

// =============================================================================
// Navigation
// =============================================================================

#[tokio::test]
async fn test_back_and_forth_keeps_selection() {
    let flow = flow_with_cart(FakeBackend::quoting(vec![
        shipping("Standard", 5, 15),
        shipping("Express", 1, 25),
    ]));
    let mut session = flow.start();
    session.address_form = paulista();
    flow.submit_address(&mut session).await.unwrap();
    flow.select_shipping(&mut session, 1).unwrap();
    flow.confirm_shipping(&mut session).unwrap();

    assert_eq!(flow.go_back(&mut session).unwrap(), CheckoutStep::Shipping);
    assert_eq!(flow.go_back(&mut session).unwrap(), CheckoutStep::Address);

    // Same quote comes back, so the selection survives resubmission
    flow.submit_address(&mut session).await.unwrap();
    assert_eq!(
        session.selected_shipping().map(|s| s.carrier_label.as_str()),
        Some("Express")
    );
    flow.confirm_shipping(&mut session).unwrap();
    assert_eq!(flow.totals(&session).total.amount, Decimal::new(55, 0));
}

#[tokio::test]
async fn test_confirmation_is_terminal() {
    let flow = flow_with_cart(FakeBackend::quoting(vec![shipping("Standard", 5, 15)]));
    let mut session = reach_payment(&flow).await;
    flow.submit_order(&mut session).await.unwrap();

    assert!(matches!(
        flow.go_back(&mut session),
        Err(CheckoutError::WrongStep(CheckoutStep::Confirmation))
    ));
    assert!(matches!(
        flow.submit_order(&mut session).await,
        Err(CheckoutError::WrongStep(CheckoutStep::Confirmation))
    ));
    assert_eq!(flow.backend().order_calls(), 1);
}
