//! Cart service error types.

use common::ProductId;
use domain::CartStatus;
use store::StoreError;
use thiserror::Error;

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The product does not exist in the catalog.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// The product exists but is not purchasable.
    #[error("Product {0} is not available for purchase")]
    ProductInactive(ProductId),

    /// The product has no line in the cart.
    #[error("Product {0} is not in the cart")]
    LineNotFound(ProductId),

    /// The identity has no open cart.
    #[error("Cart not found")]
    CartNotFound,

    /// The cart is not in a status that accepts item mutations.
    #[error("Cart is {status}, items can no longer be modified")]
    NotModifiable { status: CartStatus },

    /// Quantity must be at least one.
    #[error("Quantity must be greater than zero")]
    InvalidQuantity,

    /// Not enough stock to satisfy the requested quantity.
    /// `requested` counts units already in the cart.
    #[error(
        "Insufficient stock for {product_name}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        product_name: String,
        requested: u32,
        available: u32,
        in_cart: u32,
    },

    /// The write retry budget was exhausted under concurrent mutation.
    #[error("Cart was modified concurrently too many times, giving up")]
    ConcurrencyExhausted,

    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience type alias for cart results.
pub type Result<T> = std::result::Result<T, CartError>;
