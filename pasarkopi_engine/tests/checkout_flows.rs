//! End-to-end checkout flows against the in-memory order service and the scripted widget.

use anyhow::Context;
use pasar_common::Rupiah;
use pasarkopi_engine::{
    order_types::{DeliveryInfo, DeliveryMethod, OrderId, OrderStatus, PaymentMethod, PaymentStatus},
    storage::MemoryStore,
    test_utils::{
        fakes::{InMemoryOrderService, ScriptedWidget, StaticAuth},
        prepare_env::prepare_test_env,
    },
    CartStore,
    CheckoutError,
    CheckoutOrchestrator,
    CheckoutOutcome,
    CheckoutPolicy,
    CheckoutRequest,
    NewLine,
    OrderTracker,
    PaymentOutcome,
    WidgetAdapter,
};

fn delivery_request(payment_method: PaymentMethod) -> CheckoutRequest {
    CheckoutRequest {
        delivery_info: DeliveryInfo {
            name: "Budi".into(),
            phone: "081234567890".into(),
            address: Some("Jl. Braga No. 10, Bandung".into()),
            notes: None,
        },
        delivery_method: DeliveryMethod::Delivery,
        payment_method,
    }
}

fn three_vendor_cart() -> CartStore<MemoryStore> {
    let mut cart = CartStore::new(MemoryStore::new());
    cart.add(NewLine::new("item-kopi-susu", "Es Kopi Susu", Rupiah::new(12_000), "vendor-aroma", "Kopi Aroma"), 2, None);
    cart.add(NewLine::new("item-cold-brew", "Cold Brew", Rupiah::new(22_000), "vendor-titik", "Titik Koma"), 1, None);
    cart.add(NewLine::new("item-pisang", "Pisang Goreng", Rupiah::new(10_000), "vendor-duduk", "Warkop Duduk"), 3, None);
    cart.add(NewLine::new("item-roti-bakar", "Roti Bakar", Rupiah::new(15_000), "vendor-aroma", "Kopi Aroma"), 1, None);
    cart
}

fn orchestrator(
    service: &InMemoryOrderService,
    widget: ScriptedWidget,
) -> CheckoutOrchestrator<InMemoryOrderService, ScriptedWidget> {
    CheckoutOrchestrator::new(service.clone(), WidgetAdapter::new(widget))
}

#[tokio::test]
async fn cash_checkout_places_one_order_per_vendor() -> anyhow::Result<()> {
    prepare_test_env();
    let service = InMemoryOrderService::new();
    let api = orchestrator(&service, ScriptedWidget::new());
    let mut cart = three_vendor_cart();

    let receipt = api.checkout(&StaticAuth::signed_in("jwt-abc"), &mut cart, delivery_request(PaymentMethod::Cash)).await?;

    let orders = match &receipt.outcome {
        CheckoutOutcome::CashPlaced { orders } => orders.clone(),
        other => panic!("expected a cash outcome, got {other:?}"),
    };
    assert_eq!(orders.len(), 3);
    assert_eq!(service.create_calls(), 3);
    // Vendors in first-appearance cart order, one order each
    let vendors: Vec<&str> = orders.iter().map(|o| o.vendor_id.as_str()).collect();
    assert_eq!(vendors, vec!["vendor-aroma", "vendor-titik", "vendor-duduk"]);
    for order in &orders {
        assert!(order.totals_consistent(), "totals must add up for {}", order.order_id);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.payment_details.method, PaymentMethod::Cash);
    }
    assert_eq!(orders[0].subtotal, Rupiah::new(39_000));
    assert_eq!(orders[1].total_amount, Rupiah::new(27_220));
    assert_eq!(receipt.tracking_order_id.as_ref(), Some(&orders[0].order_id));
    assert!(receipt.cart_cleared);
    assert!(cart.is_empty());
    Ok(())
}

#[tokio::test]
async fn empty_cart_is_rejected_before_any_network_call() {
    prepare_test_env();
    let service = InMemoryOrderService::new();
    let api = orchestrator(&service, ScriptedWidget::new());
    let mut cart = CartStore::new(MemoryStore::new());

    let err = api.checkout(&StaticAuth::signed_in("jwt-abc"), &mut cart, delivery_request(PaymentMethod::Cash)).await.unwrap_err();
    assert!(matches!(err, CheckoutError::EmptyCart));
    assert_eq!(service.create_calls(), 0);
    assert_eq!(service.transaction_calls(), 0);
}

#[tokio::test]
async fn checkout_requires_a_signed_in_buyer() {
    prepare_test_env();
    let service = InMemoryOrderService::new();
    let api = orchestrator(&service, ScriptedWidget::new());
    let mut cart = three_vendor_cart();

    let err = api.checkout(&StaticAuth::signed_out(), &mut cart, delivery_request(PaymentMethod::Cash)).await.unwrap_err();
    assert!(matches!(err, CheckoutError::NotAuthenticated));
    assert_eq!(service.create_calls(), 0);
    assert!(!cart.is_empty());
}

#[tokio::test]
async fn validation_failures_happen_before_any_network_call() {
    prepare_test_env();
    let service = InMemoryOrderService::new();
    let api = orchestrator(&service, ScriptedWidget::new());
    let mut cart = three_vendor_cart();

    let mut request = delivery_request(PaymentMethod::Cash);
    request.delivery_info.address = None;
    let err = api.checkout(&StaticAuth::signed_in("jwt-abc"), &mut cart, request).await.unwrap_err();
    assert!(matches!(err, CheckoutError::MissingField("delivery address")));
    assert_eq!(service.create_calls(), 0);
    assert!(!cart.is_empty());
}

#[tokio::test]
async fn cash_partial_failure_compensates_earlier_orders() {
    prepare_test_env();
    let service = InMemoryOrderService::new();
    service.fail_create_at(2, "Warkop Titik Koma is closed right now");
    let api = orchestrator(&service, ScriptedWidget::new());
    let mut cart = three_vendor_cart();

    let err = api.checkout(&StaticAuth::signed_in("jwt-abc"), &mut cart, delivery_request(PaymentMethod::Cash)).await.unwrap_err();
    match err {
        CheckoutError::PartialFailure { vendor, source, compensated, uncompensated } => {
            assert_eq!(vendor, "Titik Koma");
            assert!(source.to_string().contains("Warkop Titik Koma is closed right now"));
            assert_eq!(compensated, vec![OrderId::from("order-1001".to_string())]);
            assert!(uncompensated.is_empty());
        },
        other => panic!("expected a partial failure, got {other}"),
    }
    // The third request is never sent, and the first order ends up cancelled again
    assert_eq!(service.create_calls(), 2);
    assert_eq!(service.cancel_requests().len(), 1);
    let first = service.order(&OrderId::from("order-1001".to_string())).unwrap();
    assert_eq!(first.status, OrderStatus::Cancelled);
    assert!(!cart.is_empty(), "a failed checkout must not clear the cart");
}

#[tokio::test]
async fn orders_that_cannot_be_compensated_are_reported() {
    prepare_test_env();
    let service = InMemoryOrderService::new();
    service.fail_create_at(3, "kitchen offline");
    service.fail_cancel_for(&OrderId::from("order-1001".to_string()));
    let api = orchestrator(&service, ScriptedWidget::new());
    let mut cart = three_vendor_cart();

    let err = api.checkout(&StaticAuth::signed_in("jwt-abc"), &mut cart, delivery_request(PaymentMethod::Cash)).await.unwrap_err();
    match err {
        CheckoutError::PartialFailure { compensated, uncompensated, .. } => {
            assert_eq!(uncompensated, vec![OrderId::from("order-1001".to_string())]);
            assert_eq!(compensated, vec![OrderId::from("order-1002".to_string())]);
        },
        other => panic!("expected a partial failure, got {other}"),
    }
    assert_eq!(service.cancel_requests().len(), 2);
}

#[tokio::test]
async fn gateway_checkout_creates_one_transaction_for_all_vendors() -> anyhow::Result<()> {
    prepare_test_env();
    let service = InMemoryOrderService::new();
    let widget = ScriptedWidget::new().push_success();
    let api = orchestrator(&service, widget.clone());
    let mut cart = three_vendor_cart();

    let receipt = api.checkout(&StaticAuth::signed_in("jwt-abc"), &mut cart, delivery_request(PaymentMethod::Gateway)).await?;

    assert_eq!(service.transaction_calls(), 1);
    assert_eq!(service.create_calls(), 0, "the backend fans out orders itself on the gateway path");
    let transaction = &service.transaction_requests()[0];
    assert_eq!(transaction.orders.len(), 3);
    assert_eq!(transaction.total_amount(), Rupiah::new(44_390 + 27_220 + 35_300));

    match &receipt.outcome {
        CheckoutOutcome::Gateway { session_token, order_ids, payment, .. } => {
            assert_eq!(order_ids.len(), 3);
            assert!(matches!(payment, PaymentOutcome::Success(_)));
            assert_eq!(widget.tokens(), vec![session_token.clone()]);
            // The backend stored the session on every order it created
            for id in order_ids {
                let order = service.order(id).with_context(|| format!("order {id} went missing"))?;
                assert_eq!(order.payment_details.session_token.as_ref(), Some(session_token));
            }
        },
        other => panic!("expected a gateway outcome, got {other:?}"),
    }
    assert!(receipt.cart_cleared);
    assert!(cart.is_empty());
    Ok(())
}

#[tokio::test]
async fn gateway_pending_keeps_the_cart_by_default() {
    prepare_test_env();
    let service = InMemoryOrderService::new();
    let api = orchestrator(&service, ScriptedWidget::new().push_pending());
    let mut cart = three_vendor_cart();

    let receipt = api.checkout(&StaticAuth::signed_in("jwt-abc"), &mut cart, delivery_request(PaymentMethod::Gateway)).await.unwrap();
    assert!(!receipt.cart_cleared);
    assert!(!cart.is_empty());
}

#[tokio::test]
async fn gateway_pending_clears_the_cart_when_the_policy_allows() {
    prepare_test_env();
    let service = InMemoryOrderService::new();
    let api = orchestrator(&service, ScriptedWidget::new().push_pending())
        .with_policy(CheckoutPolicy { clear_cart_on_pending: true });
    let mut cart = three_vendor_cart();

    let receipt = api.checkout(&StaticAuth::signed_in("jwt-abc"), &mut cart, delivery_request(PaymentMethod::Gateway)).await.unwrap();
    assert!(receipt.cart_cleared);
    assert!(cart.is_empty());
}

#[tokio::test]
async fn gateway_failure_keeps_the_cart_and_the_unpaid_orders() {
    prepare_test_env();
    let service = InMemoryOrderService::new();
    let api = orchestrator(&service, ScriptedWidget::new().push_failed("card declined by issuer"));
    let mut cart = three_vendor_cart();

    let receipt = api.checkout(&StaticAuth::signed_in("jwt-abc"), &mut cart, delivery_request(PaymentMethod::Gateway)).await.unwrap();
    let order_ids = match &receipt.outcome {
        CheckoutOutcome::Gateway { order_ids, payment, .. } => {
            assert!(matches!(payment, PaymentOutcome::Failed { message, .. } if message == "card declined by issuer"));
            order_ids.clone()
        },
        other => panic!("expected a gateway outcome, got {other:?}"),
    };
    assert!(!receipt.cart_cleared);
    assert!(!cart.is_empty());
    // The orders exist but are not cancelled; payment simply did not complete
    for id in &order_ids {
        let order = service.order(id).unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
    }
}

#[tokio::test]
async fn a_dismissed_widget_leaves_the_session_resumable() -> anyhow::Result<()> {
    prepare_test_env();
    let service = InMemoryOrderService::new();
    let widget = ScriptedWidget::new().push_cancelled().push_success();
    let adapter = WidgetAdapter::new(widget.clone());
    let api = CheckoutOrchestrator::new(service.clone(), adapter.clone());
    let mut cart = three_vendor_cart();

    let receipt = api.checkout(&StaticAuth::signed_in("jwt-abc"), &mut cart, delivery_request(PaymentMethod::Gateway)).await?;
    let (session_token, order_ids) = match receipt.outcome {
        CheckoutOutcome::Gateway { session_token, order_ids, payment, .. } => {
            assert_eq!(payment, PaymentOutcome::Cancelled);
            (session_token, order_ids)
        },
        other => panic!("expected a gateway outcome, got {other:?}"),
    };
    assert!(!receipt.cart_cleared);

    // The order still carries the session token, so the tracking view can retry with it
    let tracker = OrderTracker::new(service.clone());
    let order = tracker.fetch(&order_ids[0]).await?;
    assert!(order.is_gateway_retryable());
    let (outcome, _refreshed) = tracker.retry_payment(&order, &adapter).await?;
    assert!(matches!(outcome, PaymentOutcome::Success(_)));
    assert_eq!(widget.tokens(), vec![session_token.clone(), session_token]);
    Ok(())
}

#[tokio::test]
async fn transaction_failure_surfaces_the_server_message_verbatim() {
    prepare_test_env();
    let service = InMemoryOrderService::new();
    service.fail_next_transaction("Gateway maintenance window until 02:00");
    let widget = ScriptedWidget::new();
    let api = orchestrator(&service, widget.clone());
    let mut cart = three_vendor_cart();

    let err = api.checkout(&StaticAuth::signed_in("jwt-abc"), &mut cart, delivery_request(PaymentMethod::Gateway)).await.unwrap_err();
    assert_eq!(err.to_string(), "Gateway maintenance window until 02:00");
    assert_eq!(widget.sessions(), 0, "the widget never opens without a session");
    assert!(!cart.is_empty());
}
