//! Payment reconciliation: converging local order state with the
//! provider's authoritative status, exactly once.
//!
//! Two entry points race for the same order: the synchronous client
//! confirmation and the asynchronous webhook. Both funnel into
//! [`CheckoutService::finalize_order`], and the store-level payment-status
//! compare-and-swap decides the winner; the loser observes an
//! already-settled order and does nothing. Inventory is decremented only on
//! the winner's path, so duplicate delivery can never decrement twice.

use chrono::Utc;
use common::{CartId, OrderId};
use domain::{Order, PaymentMethodSummary, PaymentReceipt, PaymentStatus};
use store::{CartStore, OrderStore, ProductStore, StoreError};

use crate::error::{CheckoutError, Result};
use crate::gateway::{IntentStatus, PaymentGateway};
use crate::orchestrator::{CheckoutService, MAX_WRITE_ATTEMPTS};
use crate::webhook::WebhookEvent;

/// What a reconciliation pass did with an order.
#[derive(Debug, Clone)]
pub enum FinalizeOutcome {
    /// This call moved the order to `completed` and decremented stock.
    Completed(Order),
    /// The order was already in a terminal payment state; nothing changed.
    AlreadySettled(Order),
    /// The provider says the payment did not succeed; the order is `failed`
    /// and the cart was reopened for another attempt.
    Failed { status: IntentStatus },
}

impl<C, O, P, G> CheckoutService<C, O, P, G>
where
    C: CartStore,
    O: OrderStore,
    P: ProductStore,
    G: PaymentGateway,
{
    /// Synchronous confirmation, called right after the client-side payment
    /// flow reports success. The provider is still re-queried; the client's
    /// word is never trusted.
    #[tracing::instrument(skip(self))]
    pub async fn confirm_by_client(
        &self,
        order_id: OrderId,
        payment_intent_id: &str,
    ) -> Result<Order> {
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or(CheckoutError::OrderNotFound(order_id))?;
        if order.payment_intent_id != payment_intent_id {
            return Err(CheckoutError::IntentMismatch {
                order_id,
                intent_id: payment_intent_id.to_string(),
            });
        }

        match self.finalize_order(order).await? {
            FinalizeOutcome::Completed(order) => Ok(order),
            FinalizeOutcome::AlreadySettled(order) => {
                if order.payment_status == PaymentStatus::Completed {
                    Ok(order)
                } else {
                    Err(CheckoutError::PaymentNotSucceeded {
                        status: IntentStatus::Canceled,
                    })
                }
            }
            FinalizeOutcome::Failed { status } => {
                Err(CheckoutError::PaymentNotSucceeded { status })
            }
        }
    }

    /// Asynchronous confirmation from the provider. The signature is
    /// verified before the payload is even parsed; a tampered request never
    /// reaches order state.
    #[tracing::instrument(skip(self, payload, signature_header))]
    pub async fn handle_webhook(&self, payload: &[u8], signature_header: &str) -> Result<()> {
        self.verifier.verify(payload, signature_header)?;
        let event = WebhookEvent::parse(payload)?;
        metrics::counter!("webhook_events_total").increment(1);

        match event.event_type.as_str() {
            "payment_intent.succeeded" => {
                let intent_id = &event.data.object.id;
                match self.orders.find_by_intent(intent_id).await? {
                    Some(order) => {
                        self.finalize_order(order).await?;
                    }
                    None => {
                        tracing::warn!(%intent_id, "webhook for unknown payment intent");
                    }
                }
            }
            "payment_intent.payment_failed" => {
                let intent_id = &event.data.object.id;
                if let Some(order) = self.orders.find_by_intent(intent_id).await? {
                    self.fail_order(&order).await?;
                }
            }
            other => {
                tracing::debug!(event_type = other, "ignoring unhandled webhook event");
            }
        }

        Ok(())
    }

    /// The shared reconciliation path. Re-fetches the intent, settles the
    /// order through the store CAS, and only on the winning call
    /// decrements inventory and completes the cart.
    #[tracing::instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn finalize_order(&self, order: Order) -> Result<FinalizeOutcome> {
        // 1. Authoritative status, never the caller's.
        let intent = self.gateway.retrieve_intent(&order.payment_intent_id).await?;

        // 2. Anything but success settles the order as failed.
        if intent.status != IntentStatus::Succeeded {
            if !self.fail_order(&order).await? {
                let settled = self.reload(order.id).await?;
                return Ok(FinalizeOutcome::AlreadySettled(settled));
            }
            return Ok(FinalizeOutcome::Failed {
                status: intent.status,
            });
        }

        // 3. Gather the receipt before taking the CAS, so a provider
        // hiccup here leaves the order still pending for the other path.
        let payment_method = match &intent.payment_method {
            Some(pm_id) => {
                let details = self.gateway.retrieve_payment_method(pm_id).await?;
                Some(PaymentMethodSummary {
                    brand: details.brand,
                    last4: details.last4,
                    funding: details.funding,
                })
            }
            None => None,
        };
        let receipt = PaymentReceipt {
            charge_id: intent.latest_charge.clone(),
            payment_method,
            paid_at: Utc::now(),
        };

        // 4. The CAS: exactly one caller gets `true` per order, ever.
        if !self.orders.record_completion(order.id, &receipt).await? {
            let settled = self.reload(order.id).await?;
            return Ok(FinalizeOutcome::AlreadySettled(settled));
        }
        metrics::counter!("orders_completed_total").increment(1);

        // 5. Winner-only effects: decrement stock, then retire the cart.
        // A decrement failure after the order is completed leaves order and
        // stock disagreeing; surfaced as fatal, never retried (a retry
        // could decrement twice).
        for line in &order.items {
            if let Err(e) = self
                .inventory
                .decrement(line.product_id, line.quantity)
                .await
            {
                metrics::counter!("inventory_inconsistencies_total").increment(1);
                tracing::error!(
                    order_id = %order.id,
                    product_id = %line.product_id,
                    error = %e,
                    "inventory decrement failed after payment completion; manual reconciliation required"
                );
                return Err(CheckoutError::InventoryInconsistency {
                    order_id: order.id,
                    detail: e.to_string(),
                });
            }
        }

        if let Err(e) = self.complete_cart(order.cart_id).await {
            // The payment is settled and stock is correct; a cart that
            // failed to retire is an annoyance, not an inconsistency.
            tracing::warn!(cart_id = %order.cart_id, error = %e, "failed to retire cart");
        }

        let completed = self.reload(order.id).await?;
        tracing::info!(
            order_id = %completed.id,
            order_number = %completed.order_number,
            "payment reconciled, order completed"
        );
        Ok(FinalizeOutcome::Completed(completed))
    }

    /// Moves the order to `failed` and reopens its cart so the shopper can
    /// retry. Returns false if the order was already settled.
    async fn fail_order(&self, order: &Order) -> Result<bool> {
        let transitioned = self.orders.record_failure(order.id).await?;
        if transitioned {
            metrics::counter!("orders_payment_failed_total").increment(1);
            tracing::info!(order_id = %order.id, "payment failed, order settled as failed");
            if let Err(e) = self.reopen_cart(order.cart_id).await {
                tracing::warn!(cart_id = %order.cart_id, error = %e, "failed to reopen cart");
            }
        }
        Ok(transitioned)
    }

    async fn reload(&self, order_id: OrderId) -> Result<Order> {
        self.orders
            .find_by_id(order_id)
            .await?
            .ok_or(CheckoutError::OrderNotFound(order_id))
    }

    async fn complete_cart(&self, cart_id: CartId) -> Result<()> {
        for _ in 0..MAX_WRITE_ATTEMPTS {
            let Some(mut cart) = self.carts.find_by_id(cart_id).await? else {
                return Ok(());
            };
            cart.complete();
            match self.carts.update(&cart).await {
                Ok(_) => return Ok(()),
                Err(StoreError::VersionConflict { .. }) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(CheckoutError::ConcurrencyExhausted)
    }

    async fn reopen_cart(&self, cart_id: CartId) -> Result<()> {
        for _ in 0..MAX_WRITE_ATTEMPTS {
            let Some(mut cart) = self.carts.find_by_id(cart_id).await? else {
                return Ok(());
            };
            if cart.status.can_modify_items() {
                return Ok(());
            }
            cart.reopen();
            match self.carts.update(&cart).await {
                Ok(_) => return Ok(()),
                Err(StoreError::VersionConflict { .. }) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(CheckoutError::ConcurrencyExhausted)
    }
}
