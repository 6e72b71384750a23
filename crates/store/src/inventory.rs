//! The single authority for stock availability and decrement.

use common::ProductId;
use domain::Product;

use crate::error::{Result, StoreError};
use crate::traits::ProductStore;

/// Wraps a [`ProductStore`] as the one component allowed to answer
/// "is N units of P available" and to take stock away.
///
/// `check_available` is a plain read and takes no hold on the stock, so
/// two checkouts racing for the last unit can both pass the check; the
/// loser surfaces later when its decrement is rejected.
#[derive(Debug, Clone)]
pub struct InventoryGate<P: ProductStore> {
    products: P,
}

impl<P: ProductStore> InventoryGate<P> {
    /// Creates a gate over the given product store.
    pub fn new(products: P) -> Self {
        Self { products }
    }

    /// Returns a product by id.
    pub async fn product(&self, id: ProductId) -> Result<Option<Product>> {
        self.products.find_by_id(id).await
    }

    /// Returns true if at least `quantity` units are currently in stock.
    /// Fails with `ProductNotFound` for unknown products.
    pub async fn check_available(&self, id: ProductId, quantity: u32) -> Result<bool> {
        let product = self
            .products
            .find_by_id(id)
            .await?
            .ok_or(StoreError::ProductNotFound(id))?;
        Ok(product.has_stock(quantity))
    }

    /// Atomically decrements stock by `quantity`.
    pub async fn decrement(&self, id: ProductId, quantity: u32) -> Result<()> {
        self.products.decrement_stock(id, quantity).await
    }
}
