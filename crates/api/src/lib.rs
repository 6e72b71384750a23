//! HTTP API server for the marketplace checkout core.
//!
//! Wires the cart service, the checkout/reconciliation service, and the
//! durable stores into an Axum router with structured logging (tracing)
//! and Prometheus metrics.

pub mod config;
pub mod error;
pub mod identity;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use cart::CartService;
use checkout::{CheckoutService, InMemoryPaymentGateway, PaymentGateway, WebhookVerifier};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{
    CartStore, InMemoryCartStore, InMemoryOrderStore, InMemoryProductStore, InventoryGate,
    OrderStore, ProductStore,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::Config;

/// Shared application state accessible from all handlers.
pub struct AppState<C, O, P, G>
where
    C: CartStore,
    O: OrderStore,
    P: ProductStore,
    G: PaymentGateway,
{
    pub cart_service: CartService<C, P>,
    pub checkout_service: CheckoutService<C, O, P, G>,
    pub orders: O,
}

/// Builds application state from the given stores and gateway.
pub fn create_state<C, O, P, G>(
    carts: C,
    orders: O,
    products: P,
    gateway: G,
    verifier: WebhookVerifier,
) -> Arc<AppState<C, O, P, G>>
where
    C: CartStore + Clone,
    O: OrderStore + Clone,
    P: ProductStore + Clone,
    G: PaymentGateway,
{
    Arc::new(AppState {
        cart_service: CartService::new(carts.clone(), InventoryGate::new(products.clone())),
        checkout_service: CheckoutService::new(
            carts,
            orders.clone(),
            InventoryGate::new(products),
            gateway,
            verifier,
        ),
        orders,
    })
}

/// The in-memory store handles behind [`create_default_state`], kept for
/// seeding products and driving the mock gateway in tests and local runs.
#[derive(Clone)]
pub struct MemoryHandles {
    pub carts: InMemoryCartStore,
    pub orders: InMemoryOrderStore,
    pub products: InMemoryProductStore,
    pub gateway: InMemoryPaymentGateway,
}

/// Default application state: in-memory stores and the mock gateway.
pub fn create_default_state(
    webhook_secret: &str,
) -> (
    Arc<AppState<InMemoryCartStore, InMemoryOrderStore, InMemoryProductStore, InMemoryPaymentGateway>>,
    MemoryHandles,
) {
    let handles = MemoryHandles {
        carts: InMemoryCartStore::new(),
        orders: InMemoryOrderStore::new(),
        products: InMemoryProductStore::new(),
        gateway: InMemoryPaymentGateway::new(),
    };
    let state = create_state(
        handles.carts.clone(),
        handles.orders.clone(),
        handles.products.clone(),
        handles.gateway.clone(),
        WebhookVerifier::new(webhook_secret),
    );
    (state, handles)
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<C, O, P, G>(
    state: Arc<AppState<C, O, P, G>>,
    metrics_handle: PrometheusHandle,
) -> Router
where
    C: CartStore + Clone + 'static,
    O: OrderStore + Clone + 'static,
    P: ProductStore + Clone + 'static,
    G: PaymentGateway + Clone + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/cart",
            get(routes::cart::get_cart::<C, O, P, G>).delete(routes::cart::clear_cart::<C, O, P, G>),
        )
        .route("/cart/summary", get(routes::cart::summary::<C, O, P, G>))
        .route("/cart/items", post(routes::cart::add_item::<C, O, P, G>))
        .route(
            "/cart/items/{product_id}",
            put(routes::cart::update_quantity::<C, O, P, G>)
                .delete(routes::cart::remove_item::<C, O, P, G>),
        )
        .route("/cart/merge", post(routes::cart::merge::<C, O, P, G>))
        .route("/checkout", post(routes::checkout::initiate::<C, O, P, G>))
        .route(
            "/checkout/confirm",
            post(routes::checkout::confirm::<C, O, P, G>),
        )
        .route(
            "/checkout/webhook",
            post(routes::checkout::webhook::<C, O, P, G>),
        )
        .route("/orders", get(routes::orders::list::<C, O, P, G>))
        .route("/orders/{id}", get(routes::orders::get::<C, O, P, G>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
