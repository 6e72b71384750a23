//! Durable stores for the marketplace checkout core.
//!
//! The traits here are the only way the services touch shared state. Every
//! conditional transition the system relies on (cart version checks, the
//! payment-status compare-and-swap, the decrement-if-enough-stock rule)
//! is a single atomic operation of the backing store, so request handlers
//! never hold cross-call locks.
//!
//! Two implementations are provided: [`memory`] for tests and local runs,
//! and [`postgres`] backed by sqlx.

pub mod error;
pub mod inventory;
pub mod memory;
pub mod postgres;
pub mod traits;

pub use error::{Result, StoreError};
pub use inventory::InventoryGate;
pub use memory::{InMemoryCartStore, InMemoryOrderStore, InMemoryProductStore};
pub use postgres::{PostgresCartStore, PostgresOrderStore, PostgresProductStore, PostgresStore};
pub use traits::{CartStore, OrderStore, ProductStore};
