//! Store traits the services are written against.

use async_trait::async_trait;
use common::{CartId, CartIdentity, OrderId, ProductId, UserId};
use domain::{Cart, Order, PaymentReceipt, Product};

use crate::error::Result;

/// Durable cart storage.
///
/// At most one open (active or checking-out) cart may exist per identity;
/// `insert` enforces this. Writes go through a per-cart version
/// compare-and-swap so concurrent mutations for the same identity serialize
/// instead of overwriting each other.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Returns the identity's open cart, if any.
    async fn find_open(&self, identity: &CartIdentity) -> Result<Option<Cart>>;

    /// Returns a cart by id regardless of status.
    async fn find_by_id(&self, id: CartId) -> Result<Option<Cart>>;

    /// Inserts a new cart. Fails with `DuplicateOpenCart` if the identity
    /// already has an open cart.
    async fn insert(&self, cart: &Cart) -> Result<()>;

    /// Writes the cart if the stored version equals `cart.version`, bumping
    /// the version by one. Fails with `VersionConflict` otherwise.
    /// Returns the new version.
    async fn update(&self, cart: &Cart) -> Result<u64>;

    /// Deletes a cart. Removing an absent cart is not an error.
    async fn delete(&self, id: CartId) -> Result<()>;
}

/// Durable order storage.
///
/// `record_completion` and `record_failure` are the only ways an order
/// leaves `pending`/`processing`, and both are single compare-and-swaps:
/// whichever of the client-confirmation and webhook paths lands first wins,
/// the other observes `false` and must treat the order as already settled.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts a new provisional order.
    async fn insert(&self, order: &Order) -> Result<()>;

    /// Returns an order by id.
    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>>;

    /// Returns the order referencing a payment intent, if any.
    async fn find_by_intent(&self, payment_intent_id: &str) -> Result<Option<Order>>;

    /// Returns a customer's orders, newest first.
    async fn list_for_customer(&self, customer: UserId) -> Result<Vec<Order>>;

    /// Atomically moves the order to `completed`, recording the receipt.
    /// Returns `true` if this call performed the transition, `false` if the
    /// order was already in a terminal payment state.
    async fn record_completion(&self, id: OrderId, receipt: &PaymentReceipt) -> Result<bool>;

    /// Atomically moves the order to `failed`. Returns `true` if this call
    /// performed the transition, `false` if already terminal.
    async fn record_failure(&self, id: OrderId) -> Result<bool>;
}

/// Read access to the product catalog plus the atomic stock decrement.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Returns a product by id.
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>>;

    /// Adds a product to the catalog.
    async fn insert(&self, product: &Product) -> Result<()>;

    /// Atomically decrements stock, rejecting the write with
    /// `InsufficientStock` if fewer than `quantity` units remain. The store
    /// must reject decrement-below-zero rather than clamp.
    async fn decrement_stock(&self, id: ProductId, quantity: u32) -> Result<()>;
}
