//! Order history and detail endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use checkout::PaymentGateway;
use common::{CartIdentity, OrderId};
use domain::Order;
use serde::Serialize;
use store::{CartStore, OrderStore, ProductStore};
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;
use crate::identity::{AuthenticatedUser, ShopperIdentity};
use crate::routes::checkout::OrderSummaryResponse;

#[derive(Serialize)]
pub struct OrderDetailResponse {
    #[serde(flatten)]
    pub summary: OrderSummaryResponse,
    pub items: Vec<OrderLineResponse>,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub shipping_cents: i64,
    pub created_at: String,
    pub paid_at: Option<String>,
}

#[derive(Serialize)]
pub struct OrderLineResponse {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
}

impl From<&Order> for OrderDetailResponse {
    fn from(order: &Order) -> Self {
        OrderDetailResponse {
            summary: OrderSummaryResponse::from(order),
            items: order
                .items
                .iter()
                .map(|line| OrderLineResponse {
                    product_id: line.product_id.to_string(),
                    product_name: line.product_name.clone(),
                    quantity: line.quantity,
                    unit_price_cents: line.unit_price.cents(),
                    subtotal_cents: line.subtotal.cents(),
                })
                .collect(),
            subtotal_cents: order.totals.subtotal.cents(),
            tax_cents: order.totals.tax.cents(),
            shipping_cents: order.totals.shipping.cents(),
            created_at: order.created_at.to_rfc3339(),
            paid_at: order.paid_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// GET /orders — the authenticated shopper's purchase history, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<C, O, P, G>(
    State(state): State<Arc<AppState<C, O, P, G>>>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Vec<OrderSummaryResponse>>, ApiError>
where
    C: CartStore + Clone + 'static,
    O: OrderStore + Clone + 'static,
    P: ProductStore + Clone + 'static,
    G: PaymentGateway + Clone + 'static,
{
    let orders = state.orders.list_for_customer(user).await?;
    Ok(Json(orders.iter().map(OrderSummaryResponse::from).collect()))
}

/// GET /orders/{id} — order detail. Users see their own orders; a guest
/// session can only see guest orders.
#[tracing::instrument(skip(state))]
pub async fn get<C, O, P, G>(
    State(state): State<Arc<AppState<C, O, P, G>>>,
    ShopperIdentity(identity): ShopperIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderDetailResponse>, ApiError>
where
    C: CartStore + Clone + 'static,
    O: OrderStore + Clone + 'static,
    P: ProductStore + Clone + 'static,
    G: PaymentGateway + Clone + 'static,
{
    let order_id = OrderId::from_uuid(id);
    let order = state
        .orders
        .find_by_id(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {order_id} not found")))?;

    let visible = match &identity {
        CartIdentity::User(user) => order.customer == Some(*user),
        CartIdentity::Session(_) => order.customer.is_none(),
    };
    if !visible {
        return Err(ApiError::NotFound(format!("Order {order_id} not found")));
    }

    Ok(Json(OrderDetailResponse::from(&order)))
}
