//! The cart component: durable, identity-scoped carts with stock and
//! status validation on every mutation.
//!
//! Mutations never hold a lock across the product lookup: each operation
//! loads the cart, validates against the inventory gate, applies the change
//! to its own copy, and writes back through the store's version
//! compare-and-swap, retrying on conflict. Two concurrent adds for the same
//! identity therefore both land, one of them on a second attempt.

pub mod error;
pub mod service;

pub use error::CartError;
pub use service::CartService;
