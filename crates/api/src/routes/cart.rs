//! Cart endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use checkout::PaymentGateway;
use common::{ProductId, SessionToken};
use domain::{Cart, CartSummary};
use serde::{Deserialize, Serialize};
use store::{CartStore, OrderStore, ProductStore};
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;
use crate::identity::{AuthenticatedUser, ShopperIdentity};

// -- Request types --

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub product_id: Uuid,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct MergeRequest {
    pub session_id: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct CartResponse {
    pub id: String,
    pub status: String,
    pub items: Vec<CartItemResponse>,
    pub item_count: u32,
    pub total_cents: i64,
}

#[derive(Serialize)]
pub struct CartItemResponse {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
}

#[derive(Serialize)]
pub struct SummaryResponse {
    pub item_count: u32,
    pub line_count: usize,
    pub total_cents: i64,
}

impl From<Cart> for CartResponse {
    fn from(cart: Cart) -> Self {
        CartResponse {
            id: cart.id.to_string(),
            status: cart.status.to_string(),
            item_count: cart.item_count(),
            total_cents: cart.total.cents(),
            items: cart
                .items
                .into_iter()
                .map(|item| CartItemResponse {
                    product_id: item.product_id.to_string(),
                    product_name: item.product_name,
                    quantity: item.quantity,
                    unit_price_cents: item.unit_price.cents(),
                    subtotal_cents: item.subtotal.cents(),
                })
                .collect(),
        }
    }
}

impl From<CartSummary> for SummaryResponse {
    fn from(summary: CartSummary) -> Self {
        SummaryResponse {
            item_count: summary.item_count,
            line_count: summary.line_count,
            total_cents: summary.total.cents(),
        }
    }
}

// -- Handlers --

/// GET /cart — the shopper's cart, lazily created.
#[tracing::instrument(skip(state))]
pub async fn get_cart<C, O, P, G>(
    State(state): State<Arc<AppState<C, O, P, G>>>,
    ShopperIdentity(identity): ShopperIdentity,
) -> Result<Json<CartResponse>, ApiError>
where
    C: CartStore + Clone + 'static,
    O: OrderStore + Clone + 'static,
    P: ProductStore + Clone + 'static,
    G: PaymentGateway + Clone + 'static,
{
    let cart = state.cart_service.get_or_create(&identity).await?;
    Ok(Json(cart.into()))
}

/// GET /cart/summary — item-count/total digest.
#[tracing::instrument(skip(state))]
pub async fn summary<C, O, P, G>(
    State(state): State<Arc<AppState<C, O, P, G>>>,
    ShopperIdentity(identity): ShopperIdentity,
) -> Result<Json<SummaryResponse>, ApiError>
where
    C: CartStore + Clone + 'static,
    O: OrderStore + Clone + 'static,
    P: ProductStore + Clone + 'static,
    G: PaymentGateway + Clone + 'static,
{
    let summary = state.cart_service.summary(&identity).await?;
    Ok(Json(summary.into()))
}

/// POST /cart/items — add a product to the cart.
#[tracing::instrument(skip(state, req))]
pub async fn add_item<C, O, P, G>(
    State(state): State<Arc<AppState<C, O, P, G>>>,
    ShopperIdentity(identity): ShopperIdentity,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<CartResponse>, ApiError>
where
    C: CartStore + Clone + 'static,
    O: OrderStore + Clone + 'static,
    P: ProductStore + Clone + 'static,
    G: PaymentGateway + Clone + 'static,
{
    let cart = state
        .cart_service
        .add_item(&identity, ProductId::from_uuid(req.product_id), req.quantity)
        .await?;
    Ok(Json(cart.into()))
}

/// PUT /cart/items/{product_id} — rewrite a line's quantity (0 removes).
#[tracing::instrument(skip(state, req))]
pub async fn update_quantity<C, O, P, G>(
    State(state): State<Arc<AppState<C, O, P, G>>>,
    ShopperIdentity(identity): ShopperIdentity,
    Path(product_id): Path<Uuid>,
    Json(req): Json<UpdateQuantityRequest>,
) -> Result<Json<CartResponse>, ApiError>
where
    C: CartStore + Clone + 'static,
    O: OrderStore + Clone + 'static,
    P: ProductStore + Clone + 'static,
    G: PaymentGateway + Clone + 'static,
{
    let cart = state
        .cart_service
        .set_quantity(&identity, ProductId::from_uuid(product_id), req.quantity)
        .await?;
    Ok(Json(cart.into()))
}

/// DELETE /cart/items/{product_id} — remove a line.
#[tracing::instrument(skip(state))]
pub async fn remove_item<C, O, P, G>(
    State(state): State<Arc<AppState<C, O, P, G>>>,
    ShopperIdentity(identity): ShopperIdentity,
    Path(product_id): Path<Uuid>,
) -> Result<Json<CartResponse>, ApiError>
where
    C: CartStore + Clone + 'static,
    O: OrderStore + Clone + 'static,
    P: ProductStore + Clone + 'static,
    G: PaymentGateway + Clone + 'static,
{
    let cart = state
        .cart_service
        .remove_item(&identity, ProductId::from_uuid(product_id))
        .await?;
    Ok(Json(cart.into()))
}

/// DELETE /cart — empty the cart.
#[tracing::instrument(skip(state))]
pub async fn clear_cart<C, O, P, G>(
    State(state): State<Arc<AppState<C, O, P, G>>>,
    ShopperIdentity(identity): ShopperIdentity,
) -> Result<Json<CartResponse>, ApiError>
where
    C: CartStore + Clone + 'static,
    O: OrderStore + Clone + 'static,
    P: ProductStore + Clone + 'static,
    G: PaymentGateway + Clone + 'static,
{
    let cart = state.cart_service.clear(&identity).await?;
    Ok(Json(cart.into()))
}

/// POST /cart/merge — fold the guest session cart into the user's on login.
#[tracing::instrument(skip(state, req))]
pub async fn merge<C, O, P, G>(
    State(state): State<Arc<AppState<C, O, P, G>>>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(req): Json<MergeRequest>,
) -> Result<Json<CartResponse>, ApiError>
where
    C: CartStore + Clone + 'static,
    O: OrderStore + Clone + 'static,
    P: ProductStore + Clone + 'static,
    G: PaymentGateway + Clone + 'static,
{
    if req.session_id.is_empty() {
        return Err(ApiError::BadRequest("Session id required".to_string()));
    }

    let session = SessionToken::from(req.session_id);
    let cart = match state
        .cart_service
        .merge_guest_into_user(&session, user)
        .await?
    {
        Some(cart) => cart,
        // Nothing to merge; the user's cart (possibly fresh) is the answer.
        None => {
            state
                .cart_service
                .get_or_create(&common::CartIdentity::User(user))
                .await?
        }
    };
    Ok(Json(cart.into()))
}
