//! End-to-end tests for the checkout and reconciliation flows against the
//! in-memory stores and gateway.

use cart::CartService;
use checkout::{
    CheckoutError, CheckoutService, InMemoryPaymentGateway, WebhookVerifier,
};
use chrono::Utc;
use common::{CartIdentity, SessionToken, UserId};
use domain::{CartStatus, ContactInfo, Money, PaymentStatus, Product, ShippingAddress};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use store::{
    CartStore, InMemoryCartStore, InMemoryOrderStore, InMemoryProductStore, InventoryGate,
    OrderStore, ProductStore,
};

const WEBHOOK_SECRET: &str = "whsec_test123secret456";

struct Harness {
    carts: CartService<InMemoryCartStore, InMemoryProductStore>,
    checkout: CheckoutService<
        InMemoryCartStore,
        InMemoryOrderStore,
        InMemoryProductStore,
        InMemoryPaymentGateway,
    >,
    cart_store: InMemoryCartStore,
    order_store: InMemoryOrderStore,
    product_store: InMemoryProductStore,
    gateway: InMemoryPaymentGateway,
}

async fn harness(products: &[Product]) -> Harness {
    let cart_store = InMemoryCartStore::new();
    let order_store = InMemoryOrderStore::new();
    let product_store = InMemoryProductStore::new();
    for product in products {
        product_store.insert(product).await.unwrap();
    }
    let gateway = InMemoryPaymentGateway::new();

    Harness {
        carts: CartService::new(
            cart_store.clone(),
            InventoryGate::new(product_store.clone()),
        ),
        checkout: CheckoutService::new(
            cart_store.clone(),
            order_store.clone(),
            InventoryGate::new(product_store.clone()),
            gateway.clone(),
            WebhookVerifier::new(WEBHOOK_SECRET),
        ),
        cart_store,
        order_store,
        product_store,
        gateway,
    }
}

fn address() -> ShippingAddress {
    ShippingAddress {
        street: "Av. Reforma 222".into(),
        city: "CDMX".into(),
        state: "CDMX".into(),
        postal_code: "06600".into(),
        country: "MX".into(),
    }
}

fn contact() -> ContactInfo {
    ContactInfo {
        name: "Ana Pérez".into(),
        phone: "+52 55 0000 0000".into(),
        email: "ana@example.com".into(),
    }
}

fn signed_header(payload: &[u8], secret: &str) -> String {
    let timestamp = Utc::now().timestamp().to_string();
    let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(signed_payload.as_bytes());
    format!(
        "t={},v1={}",
        timestamp,
        hex::encode(mac.finalize().into_bytes())
    )
}

fn succeeded_payload(intent_id: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "type": "payment_intent.succeeded",
        "data": { "object": { "id": intent_id } }
    }))
    .unwrap()
}

#[tokio::test]
async fn full_flow_confirms_order_decrements_stock_and_empties_cart() {
    let product = Product::new("Tote bag", Money::from_pesos(10), 5);
    let h = harness(std::slice::from_ref(&product)).await;
    let identity = CartIdentity::from(SessionToken::from("sess-happy"));

    h.carts.add_item(&identity, product.id, 3).await.unwrap();

    let session = h
        .checkout
        .initiate_checkout(&identity, address(), contact())
        .await
        .unwrap();

    // $30 subtotal + $4.80 tax + $50 shipping.
    assert_eq!(session.totals.total, Money::from_cents(8_480));
    assert_eq!(
        h.gateway.amount_of(&h.gateway.latest_intent_id().unwrap()),
        Some((8_480, "mxn".into()))
    );

    // Provisional order exists, but no stock has moved yet.
    let order = h.order_store.find_by_id(session.order_id).await.unwrap().unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(h.product_store.stock_of(product.id).await, Some(5));

    // The cart is parked, not cleared.
    let cart = h.cart_store.find_open(&identity).await.unwrap().unwrap();
    assert_eq!(cart.status, CartStatus::CheckingOut);
    assert_eq!(cart.items.len(), 1);

    // Shopper pays in the browser; then the client confirms.
    let intent_id = order.payment_intent_id.clone();
    h.gateway.mark_succeeded(&intent_id);
    let confirmed = h
        .checkout
        .confirm_by_client(session.order_id, &intent_id)
        .await
        .unwrap();

    assert_eq!(confirmed.payment_status, PaymentStatus::Completed);
    assert_eq!(confirmed.charge_id.as_deref(), Some("ch_0001"));
    let method = confirmed.payment_method.unwrap();
    assert_eq!((method.brand.as_str(), method.last4.as_str()), ("visa", "4242"));

    assert_eq!(h.product_store.stock_of(product.id).await, Some(2));

    let cart = h.cart_store.find_by_id(cart.id).await.unwrap().unwrap();
    assert_eq!(cart.status, CartStatus::Completed);
    assert!(cart.is_empty());
}

#[tokio::test]
async fn duplicate_confirmations_decrement_stock_exactly_once() {
    let product = Product::new("Mug", Money::from_pesos(80), 10);
    let h = harness(std::slice::from_ref(&product)).await;
    let identity = CartIdentity::from(SessionToken::from("sess-dup"));

    h.carts.add_item(&identity, product.id, 2).await.unwrap();
    let session = h
        .checkout
        .initiate_checkout(&identity, address(), contact())
        .await
        .unwrap();
    let intent_id = h.gateway.latest_intent_id().unwrap();
    h.gateway.mark_succeeded(&intent_id);

    // Client confirmation lands first...
    h.checkout
        .confirm_by_client(session.order_id, &intent_id)
        .await
        .unwrap();
    assert_eq!(h.product_store.stock_of(product.id).await, Some(8));

    // ...then the webhook delivers the same confirmation.
    let payload = succeeded_payload(&intent_id);
    h.checkout
        .handle_webhook(&payload, &signed_header(&payload, WEBHOOK_SECRET))
        .await
        .unwrap();

    // And the client retries on top of that.
    h.checkout
        .confirm_by_client(session.order_id, &intent_id)
        .await
        .unwrap();

    assert_eq!(h.product_store.stock_of(product.id).await, Some(8));
}

#[tokio::test]
async fn webhook_alone_completes_the_order() {
    let product = Product::new("Mug", Money::from_pesos(80), 10);
    let h = harness(std::slice::from_ref(&product)).await;
    let identity = CartIdentity::from(SessionToken::from("sess-hook"));

    h.carts.add_item(&identity, product.id, 1).await.unwrap();
    let session = h
        .checkout
        .initiate_checkout(&identity, address(), contact())
        .await
        .unwrap();
    let intent_id = h.gateway.latest_intent_id().unwrap();
    h.gateway.mark_succeeded(&intent_id);

    let payload = succeeded_payload(&intent_id);
    h.checkout
        .handle_webhook(&payload, &signed_header(&payload, WEBHOOK_SECRET))
        .await
        .unwrap();

    let order = h.order_store.find_by_id(session.order_id).await.unwrap().unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Completed);
    assert_eq!(h.product_store.stock_of(product.id).await, Some(9));
}

#[tokio::test]
async fn concurrent_client_and_webhook_confirmations_settle_once() {
    let product = Product::new("Mug", Money::from_pesos(80), 10);
    let h = harness(std::slice::from_ref(&product)).await;
    let identity = CartIdentity::from(SessionToken::from("sess-race"));

    h.carts.add_item(&identity, product.id, 3).await.unwrap();
    let session = h
        .checkout
        .initiate_checkout(&identity, address(), contact())
        .await
        .unwrap();
    let intent_id = h.gateway.latest_intent_id().unwrap();
    h.gateway.mark_succeeded(&intent_id);

    let payload = succeeded_payload(&intent_id);
    let header = signed_header(&payload, WEBHOOK_SECRET);
    let (confirm, webhook) = tokio::join!(
        h.checkout.confirm_by_client(session.order_id, &intent_id),
        h.checkout.handle_webhook(&payload, &header)
    );
    confirm.unwrap();
    webhook.unwrap();

    assert_eq!(h.product_store.stock_of(product.id).await, Some(7));
}

#[tokio::test]
async fn failed_payment_settles_order_and_reopens_cart() {
    let product = Product::new("Tote bag", Money::from_pesos(120), 5);
    let h = harness(std::slice::from_ref(&product)).await;
    let identity = CartIdentity::from(SessionToken::from("sess-fail"));

    h.carts.add_item(&identity, product.id, 2).await.unwrap();
    let session = h
        .checkout
        .initiate_checkout(&identity, address(), contact())
        .await
        .unwrap();
    let intent_id = h.gateway.latest_intent_id().unwrap();
    h.gateway.mark_failed(&intent_id);

    let err = h
        .checkout
        .confirm_by_client(session.order_id, &intent_id)
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::PaymentNotSucceeded { .. }));

    let order = h.order_store.find_by_id(session.order_id).await.unwrap().unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Failed);

    // No stock moved, and the cart is usable again with its items intact.
    assert_eq!(h.product_store.stock_of(product.id).await, Some(5));
    let cart = h.cart_store.find_open(&identity).await.unwrap().unwrap();
    assert_eq!(cart.status, CartStatus::Active);
    assert_eq!(cart.line_quantity(product.id), 2);

    // The shopper can go around again.
    h.gateway.mark_succeeded(&intent_id);
    let retry = h
        .checkout
        .initiate_checkout(&identity, address(), contact())
        .await;
    assert!(retry.is_ok());
}

#[tokio::test]
async fn empty_cart_cannot_check_out() {
    let h = harness(&[]).await;
    let identity = CartIdentity::from(SessionToken::from("sess-empty"));

    // No cart at all.
    let err = h
        .checkout
        .initiate_checkout(&identity, address(), contact())
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::EmptyCart));

    // An existing but empty cart.
    h.carts.get_or_create(&identity).await.unwrap();
    let err = h
        .checkout
        .initiate_checkout(&identity, address(), contact())
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::EmptyCart));
}

#[tokio::test]
async fn stock_recheck_names_the_offending_product() {
    let product = Product::new("Tote bag", Money::from_pesos(120), 5);
    let h = harness(std::slice::from_ref(&product)).await;
    let identity = CartIdentity::from(SessionToken::from("sess-sold-out"));

    h.carts.add_item(&identity, product.id, 4).await.unwrap();
    // Someone else bought most of the stock after the add.
    h.product_store.set_stock(product.id, 1).await;

    let err = h
        .checkout
        .initiate_checkout(&identity, address(), contact())
        .await
        .unwrap_err();
    match err {
        CheckoutError::InsufficientStock {
            product_name,
            requested,
            available,
            ..
        } => {
            assert_eq!(product_name, "Tote bag");
            assert_eq!(requested, 4);
            assert_eq!(available, 1);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    // Nothing was committed.
    assert_eq!(h.gateway.intent_count(), 0);
    assert_eq!(h.order_store.order_count().await, 0);
}

#[tokio::test]
async fn provider_failure_aborts_with_no_partial_state() {
    let product = Product::new("Tote bag", Money::from_pesos(120), 5);
    let h = harness(std::slice::from_ref(&product)).await;
    let identity = CartIdentity::from(SessionToken::from("sess-outage"));

    h.carts.add_item(&identity, product.id, 1).await.unwrap();
    h.gateway.set_fail_on_create(true);

    let err = h
        .checkout
        .initiate_checkout(&identity, address(), contact())
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::Provider(_)));

    assert_eq!(h.order_store.order_count().await, 0);
    let cart = h.cart_store.find_open(&identity).await.unwrap().unwrap();
    assert_eq!(cart.status, CartStatus::Active);
}

#[tokio::test]
async fn second_checkout_on_a_parked_cart_is_rejected() {
    let product = Product::new("Tote bag", Money::from_pesos(120), 5);
    let h = harness(std::slice::from_ref(&product)).await;
    let identity = CartIdentity::from(SessionToken::from("sess-twice"));

    h.carts.add_item(&identity, product.id, 1).await.unwrap();
    h.checkout
        .initiate_checkout(&identity, address(), contact())
        .await
        .unwrap();

    let err = h
        .checkout
        .initiate_checkout(&identity, address(), contact())
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::CartNotReady { .. }));
    assert_eq!(h.gateway.intent_count(), 1);
}

#[tokio::test]
async fn tampered_webhook_never_reaches_order_state() {
    let product = Product::new("Mug", Money::from_pesos(80), 10);
    let h = harness(std::slice::from_ref(&product)).await;
    let identity = CartIdentity::from(SessionToken::from("sess-tamper"));

    h.carts.add_item(&identity, product.id, 1).await.unwrap();
    let session = h
        .checkout
        .initiate_checkout(&identity, address(), contact())
        .await
        .unwrap();
    let intent_id = h.gateway.latest_intent_id().unwrap();
    h.gateway.mark_succeeded(&intent_id);

    let payload = succeeded_payload(&intent_id);
    let err = h
        .checkout
        .handle_webhook(&payload, &signed_header(&payload, "wrong_secret"))
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::InvalidSignature(_)));

    let order = h.order_store.find_by_id(session.order_id).await.unwrap().unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(h.product_store.stock_of(product.id).await, Some(10));
}

#[tokio::test]
async fn webhook_for_unknown_intent_is_acknowledged() {
    let h = harness(&[]).await;
    let payload = succeeded_payload("pi_unknown");
    h.checkout
        .handle_webhook(&payload, &signed_header(&payload, WEBHOOK_SECRET))
        .await
        .unwrap();
}

#[tokio::test]
async fn confirm_rejects_mismatched_intent() {
    let product = Product::new("Mug", Money::from_pesos(80), 10);
    let h = harness(std::slice::from_ref(&product)).await;
    let identity = CartIdentity::from(UserId::new());

    h.carts.add_item(&identity, product.id, 1).await.unwrap();
    let session = h
        .checkout
        .initiate_checkout(&identity, address(), contact())
        .await
        .unwrap();

    let err = h
        .checkout
        .confirm_by_client(session.order_id, "pi_someone_elses")
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::IntentMismatch { .. }));
}
