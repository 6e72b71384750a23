//! Catalog product snapshot consumed by the cart and checkout flows.

use chrono::{DateTime, Utc};
use common::ProductId;
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// A product as the checkout core sees it: the catalog itself (creation,
/// provider ownership, images, categories) is managed elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Catalog identifier.
    pub id: ProductId,
    /// Display name, copied into cart lines and order snapshots.
    pub name: String,
    /// Current unit price.
    pub price: Money,
    /// Units currently available.
    pub stock: u32,
    /// Inactive products cannot be added to carts.
    pub active: bool,
    /// When the product entered the catalog.
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Creates an active product with the given price and stock.
    pub fn new(name: impl Into<String>, price: Money, stock: u32) -> Self {
        Self {
            id: ProductId::new(),
            name: name.into(),
            price,
            stock,
            active: true,
            created_at: Utc::now(),
        }
    }

    /// Returns true if at least `quantity` units are in stock.
    pub fn has_stock(&self, quantity: u32) -> bool {
        self.stock >= quantity
    }
}
