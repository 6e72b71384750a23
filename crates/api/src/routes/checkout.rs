//! Checkout, confirmation, and webhook endpoints.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use checkout::{PaymentGateway, SIGNATURE_HEADER};
use common::OrderId;
use domain::{ContactInfo, Order, ShippingAddress};
use serde::{Deserialize, Serialize};
use store::{CartStore, OrderStore, ProductStore};
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;
use crate::identity::ShopperIdentity;

// -- Request types --

#[derive(Deserialize)]
pub struct CheckoutRequest {
    pub shipping_address: ShippingAddress,
    pub contact: ContactInfo,
}

#[derive(Deserialize)]
pub struct ConfirmRequest {
    pub order_id: Uuid,
    pub payment_intent_id: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct CheckoutResponse {
    pub order_id: String,
    pub order_number: String,
    pub client_secret: String,
    pub totals: TotalsResponse,
}

#[derive(Serialize)]
pub struct TotalsResponse {
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub shipping_cents: i64,
    pub total_cents: i64,
}

#[derive(Serialize)]
pub struct PaymentMethodResponse {
    pub brand: String,
    pub last4: String,
    pub funding: String,
}

#[derive(Serialize)]
pub struct OrderSummaryResponse {
    pub order_id: String,
    pub order_number: String,
    pub payment_status: String,
    pub shipping_status: String,
    pub total_cents: i64,
    pub payment_method: Option<PaymentMethodResponse>,
}

#[derive(Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

impl From<&Order> for OrderSummaryResponse {
    fn from(order: &Order) -> Self {
        OrderSummaryResponse {
            order_id: order.id.to_string(),
            order_number: order.order_number.clone(),
            payment_status: order.payment_status.to_string(),
            shipping_status: order.shipping_status.to_string(),
            total_cents: order.totals.total.cents(),
            payment_method: order.payment_method.as_ref().map(|m| PaymentMethodResponse {
                brand: m.brand.clone(),
                last4: m.last4.clone(),
                funding: m.funding.clone(),
            }),
        }
    }
}

// -- Handlers --

/// POST /checkout — snapshot the cart into a provisional order and return
/// the provider's client secret.
#[tracing::instrument(skip(state, req))]
pub async fn initiate<C, O, P, G>(
    State(state): State<Arc<AppState<C, O, P, G>>>,
    ShopperIdentity(identity): ShopperIdentity,
    Json(req): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, ApiError>
where
    C: CartStore + Clone + 'static,
    O: OrderStore + Clone + 'static,
    P: ProductStore + Clone + 'static,
    G: PaymentGateway + Clone + 'static,
{
    let session = state
        .checkout_service
        .initiate_checkout(&identity, req.shipping_address, req.contact)
        .await?;

    Ok(Json(CheckoutResponse {
        order_id: session.order_id.to_string(),
        order_number: session.order_number,
        client_secret: session.client_secret,
        totals: TotalsResponse {
            subtotal_cents: session.totals.subtotal.cents(),
            tax_cents: session.totals.tax.cents(),
            shipping_cents: session.totals.shipping.cents(),
            total_cents: session.totals.total.cents(),
        },
    }))
}

/// POST /checkout/confirm — synchronous confirmation after the client-side
/// payment flow.
#[tracing::instrument(skip(state, req))]
pub async fn confirm<C, O, P, G>(
    State(state): State<Arc<AppState<C, O, P, G>>>,
    ShopperIdentity(_identity): ShopperIdentity,
    Json(req): Json<ConfirmRequest>,
) -> Result<Json<OrderSummaryResponse>, ApiError>
where
    C: CartStore + Clone + 'static,
    O: OrderStore + Clone + 'static,
    P: ProductStore + Clone + 'static,
    G: PaymentGateway + Clone + 'static,
{
    let order = state
        .checkout_service
        .confirm_by_client(OrderId::from_uuid(req.order_id), &req.payment_intent_id)
        .await?;
    Ok(Json(OrderSummaryResponse::from(&order)))
}

/// POST /checkout/webhook — asynchronous confirmation from the provider.
/// The raw body is verified against the signature header before parsing.
#[tracing::instrument(skip(state, headers, body))]
pub async fn webhook<C, O, P, G>(
    State(state): State<Arc<AppState<C, O, P, G>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError>
where
    C: CartStore + Clone + 'static,
    O: OrderStore + Clone + 'static,
    P: ProductStore + Clone + 'static,
    G: PaymentGateway + Clone + 'static,
{
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest("Missing webhook signature header".to_string()))?;

    state.checkout_service.handle_webhook(&body, signature).await?;
    Ok(Json(WebhookAck { received: true }))
}
