//! Checkout and reconciliation error types.

use common::{OrderId, ProductId};
use domain::CartStatus;
use store::StoreError;
use thiserror::Error;

use crate::gateway::IntentStatus;

/// Errors that can occur during checkout and payment reconciliation.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The shopper has nothing to check out.
    #[error("Cart is empty")]
    EmptyCart,

    /// The cart is not in a status that allows starting a checkout.
    #[error("Cart is {status}, cannot begin checkout")]
    CartNotReady { status: CartStatus },

    /// The best-effort stock recheck found a line that can no longer be
    /// satisfied.
    #[error(
        "Insufficient stock for {product_name}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        product_name: String,
        requested: u32,
        available: u32,
    },

    /// The order was not found.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The supplied payment intent does not belong to the order.
    #[error("Payment intent {intent_id} does not belong to order {order_id}")]
    IntentMismatch {
        order_id: OrderId,
        intent_id: String,
    },

    /// The provider reports the payment has not succeeded.
    #[error("Payment has not succeeded: provider reports {status}")]
    PaymentNotSucceeded { status: IntentStatus },

    /// The webhook signature header failed verification.
    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),

    /// The payment provider call itself failed.
    #[error("Payment provider error: {0}")]
    Provider(String),

    /// A stock decrement failed after the order was already marked
    /// completed. Stock and order state disagree; this is not retried
    /// because a retry could decrement twice. Resolved out-of-band.
    #[error("Inventory inconsistency for order {order_id}: {detail}")]
    InventoryInconsistency { order_id: OrderId, detail: String },

    /// The cart-status write retry budget was exhausted.
    #[error("Cart was modified concurrently too many times, giving up")]
    ConcurrencyExhausted,

    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;
