//! Checkout orchestration: cart → provisional order → payment intent.

use common::CartIdentity;
use domain::{ContactInfo, Order, OrderTotals, ShippingAddress};
use store::{CartStore, InventoryGate, OrderStore, ProductStore, StoreError};

use crate::error::{CheckoutError, Result};
use crate::gateway::{IntentItemSummary, IntentMetadata, PaymentGateway};
use crate::webhook::WebhookVerifier;

/// Currency all intents are created in.
pub const CURRENCY: &str = "mxn";

/// Attempts per cart-status write before giving up on version conflicts.
pub(crate) const MAX_WRITE_ATTEMPTS: usize = 5;

/// What the client needs to finish paying: the provider-side secret plus
/// the provisional order it will confirm against.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub order_id: common::OrderId,
    pub order_number: String,
    pub client_secret: String,
    pub totals: OrderTotals,
}

/// Orchestrates checkout initiation and owns payment reconciliation (see
/// [`crate::reconcile`] for the second half).
///
/// `initiate_checkout` never moves money or stock: it snapshots the cart
/// into a `pending` order and hands the provider's client secret back. The
/// reconciliation paths are the only code that completes orders and
/// decrements inventory.
pub struct CheckoutService<C, O, P, G>
where
    C: CartStore,
    O: OrderStore,
    P: ProductStore,
    G: PaymentGateway,
{
    pub(crate) carts: C,
    pub(crate) orders: O,
    pub(crate) inventory: InventoryGate<P>,
    pub(crate) gateway: G,
    pub(crate) verifier: WebhookVerifier,
}

impl<C, O, P, G> CheckoutService<C, O, P, G>
where
    C: CartStore,
    O: OrderStore,
    P: ProductStore,
    G: PaymentGateway,
{
    /// Creates a new checkout service.
    pub fn new(
        carts: C,
        orders: O,
        inventory: InventoryGate<P>,
        gateway: G,
        verifier: WebhookVerifier,
    ) -> Self {
        Self {
            carts,
            orders,
            inventory,
            gateway,
            verifier,
        }
    }

    /// Converts the identity's active cart into a provisional order and a
    /// payment intent.
    ///
    /// If the provider call fails nothing is committed and the cart stays
    /// active. If the order insert fails after the intent was created, the
    /// intent is orphaned on the provider side; it is logged and checkout
    /// aborts with the cart still active.
    #[tracing::instrument(skip(self, shipping_address, contact))]
    pub async fn initiate_checkout(
        &self,
        identity: &CartIdentity,
        shipping_address: ShippingAddress,
        contact: ContactInfo,
    ) -> Result<CheckoutSession> {
        metrics::counter!("checkouts_initiated_total").increment(1);
        let started = std::time::Instant::now();

        // 1. The identity needs an active, non-empty cart.
        let cart = self
            .carts
            .find_open(identity)
            .await?
            .ok_or(CheckoutError::EmptyCart)?;
        if !cart.status.can_begin_checkout() {
            return Err(CheckoutError::CartNotReady {
                status: cart.status,
            });
        }
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        // 2. Best-effort stock recheck. This takes no hold on the stock;
        // the decrement at reconciliation time is the real arbiter.
        for item in &cart.items {
            let product = self
                .inventory
                .product(item.product_id)
                .await?
                .ok_or(StoreError::ProductNotFound(item.product_id))?;
            if !product.has_stock(item.quantity) {
                return Err(CheckoutError::InsufficientStock {
                    product_id: item.product_id,
                    product_name: item.product_name.clone(),
                    requested: item.quantity,
                    available: product.stock,
                });
            }
        }

        // 3. Totals come from the cart's price snapshots, not live prices.
        let totals = OrderTotals::from_subtotal(cart.total);

        // 4. Create the intent. A provider failure aborts with no local state.
        let metadata = IntentMetadata {
            cart_id: cart.id,
            identity: identity.to_string(),
            items: cart
                .items
                .iter()
                .map(|item| IntentItemSummary {
                    product_id: item.product_id,
                    name: item.product_name.clone(),
                    quantity: item.quantity,
                    unit_price_cents: item.unit_price.cents(),
                })
                .collect(),
        };
        let intent = self
            .gateway
            .create_intent(totals.total.cents(), CURRENCY, metadata)
            .await?;
        metrics::counter!("payment_intents_created_total").increment(1);

        // 5. Record the provisional order before any money moves.
        let order = Order::from_cart(
            &cart,
            totals,
            shipping_address,
            contact,
            intent.id.clone(),
        );
        if let Err(e) = self.orders.insert(&order).await {
            tracing::warn!(
                intent_id = %intent.id,
                error = %e,
                "order insert failed after intent creation; the intent is orphaned"
            );
            return Err(e.into());
        }

        // 6. Park the cart. Items stay in place until confirmation.
        self.transition_cart_to_checkout(cart.id).await?;

        metrics::histogram!("checkout_initiation_seconds")
            .record(started.elapsed().as_secs_f64());
        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total_cents = totals.total.cents(),
            "checkout initiated"
        );

        Ok(CheckoutSession {
            order_id: order.id,
            order_number: order.order_number,
            client_secret: intent.client_secret,
            totals,
        })
    }

    async fn transition_cart_to_checkout(&self, cart_id: common::CartId) -> Result<()> {
        for _ in 0..MAX_WRITE_ATTEMPTS {
            let Some(mut cart) = self.carts.find_by_id(cart_id).await? else {
                return Err(StoreError::CartNotFound(cart_id).into());
            };
            if !cart.status.can_begin_checkout() {
                return Err(CheckoutError::CartNotReady {
                    status: cart.status,
                });
            }
            cart.begin_checkout();
            match self.carts.update(&cart).await {
                Ok(_) => return Ok(()),
                Err(StoreError::VersionConflict { .. }) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(CheckoutError::ConcurrencyExhausted)
    }
}
