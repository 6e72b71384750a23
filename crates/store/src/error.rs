use common::{CartId, OrderId, ProductId};
use thiserror::Error;

/// Errors that can occur when interacting with the durable stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A cart write lost an optimistic-concurrency race.
    /// The expected version did not match the stored version.
    #[error("Version conflict for cart {cart_id}: expected version {expected}, found {actual}")]
    VersionConflict {
        cart_id: CartId,
        expected: u64,
        actual: u64,
    },

    /// The identity already has an open (active or checking-out) cart.
    #[error("Identity {identity} already has an open cart")]
    DuplicateOpenCart { identity: String },

    /// The cart was not found.
    #[error("Cart not found: {0}")]
    CartNotFound(CartId),

    /// The order was not found.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The product was not found.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// A decrement would take stock below zero.
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
