//! Domain model for the marketplace checkout core.
//!
//! This crate holds the pure data model shared by the stores and services:
//! - `Money` and the pricing rules (tax, shipping threshold)
//! - `Product` catalog snapshots
//! - `Cart` with its mutation/merge rules and status machine
//! - `Order` snapshots with independent payment and shipping state machines
//!
//! No I/O lives here; durability and orchestration are layered on top.

pub mod cart;
pub mod money;
pub mod order;
pub mod pricing;
pub mod product;

pub use cart::{Cart, CartItem, CartStatus, CartSummary};
pub use money::Money;
pub use order::{
    ContactInfo, Order, OrderLine, PaymentMethodSummary, PaymentReceipt, PaymentStatus,
    ShippingAddress, ShippingStatus, generate_order_number,
};
pub use pricing::{FLAT_SHIPPING_FEE, FREE_SHIPPING_THRESHOLD, OrderTotals, TAX_RATE_BASIS_POINTS};
pub use product::Product;
