//! Shopping cart: identity-scoped collection of pending purchase lines.

mod state;

pub use state::CartStatus;

use chrono::{DateTime, Utc};
use common::{CartId, CartIdentity, ProductId};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::product::Product;

/// A single line in a cart. The unit price is a snapshot of the catalog
/// price at the time of the last mutation touching this line, and the
/// subtotal is always `quantity × unit_price`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub subtotal: Money,
}

/// Identity-scoped cart. All mutating methods recompute line subtotals and
/// the cart total, so a persisted cart never carries stale derived values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub identity: CartIdentity,
    pub items: Vec<CartItem>,
    pub status: CartStatus,
    pub total: Money,
    /// Optimistic-concurrency version, bumped by the store on every write.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Creates an empty active cart for the given identity.
    pub fn new(identity: CartIdentity) -> Self {
        let now = Utc::now();
        Self {
            id: CartId::new(),
            identity,
            items: Vec::new(),
            status: CartStatus::Active,
            total: Money::zero(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the line for a product, if present.
    pub fn line(&self, product_id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.product_id == product_id)
    }

    /// Returns the quantity of a product already in the cart (0 if absent).
    pub fn line_quantity(&self, product_id: ProductId) -> u32 {
        self.line(product_id).map_or(0, |item| item.quantity)
    }

    /// Returns true if the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the total number of units across all lines.
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Adds `quantity` units of a product, merging into an existing line
    /// (summing quantities and refreshing the price snapshot) or appending
    /// a new one.
    pub fn add_line(&mut self, product: &Product, quantity: u32) {
        match self
            .items
            .iter_mut()
            .find(|item| item.product_id == product.id)
        {
            Some(item) => {
                item.quantity += quantity;
                item.unit_price = product.price;
            }
            None => self.items.push(CartItem {
                product_id: product.id,
                product_name: product.name.clone(),
                quantity,
                unit_price: product.price,
                subtotal: Money::zero(),
            }),
        }
        self.recompute_totals();
    }

    /// Rewrites a line's quantity and refreshes its price snapshot.
    /// Returns false if the product has no line in this cart.
    pub fn set_line_quantity(&mut self, product: &Product, quantity: u32) -> bool {
        let Some(item) = self
            .items
            .iter_mut()
            .find(|item| item.product_id == product.id)
        else {
            return false;
        };
        item.quantity = quantity;
        item.unit_price = product.price;
        self.recompute_totals();
        true
    }

    /// Removes a product's line. Returns false if no line was present.
    pub fn remove_line(&mut self, product_id: ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.product_id != product_id);
        let removed = self.items.len() != before;
        if removed {
            self.recompute_totals();
        }
        removed
    }

    /// Empties the cart and resets the total.
    pub fn clear(&mut self) {
        self.items.clear();
        self.recompute_totals();
    }

    /// Merges a guest cart into this one: matching product lines sum
    /// quantities (keeping this cart's price snapshot); other lines append.
    pub fn merge_from(&mut self, guest: &Cart) {
        for incoming in &guest.items {
            match self
                .items
                .iter_mut()
                .find(|item| item.product_id == incoming.product_id)
            {
                Some(item) => item.quantity += incoming.quantity,
                None => self.items.push(incoming.clone()),
            }
        }
        self.recompute_totals();
    }

    /// Marks the cart as checking out. Items stay in place until payment
    /// confirmation so a failed payment leaves the cart usable.
    pub fn begin_checkout(&mut self) {
        self.status = CartStatus::CheckingOut;
        self.touch();
    }

    /// Returns the cart to `Active` after a failed payment so the shopper
    /// can adjust it and retry checkout. Items are untouched.
    pub fn reopen(&mut self) {
        self.status = CartStatus::Active;
        self.touch();
    }

    /// Marks the cart completed and empties it after a confirmed payment.
    pub fn complete(&mut self) {
        self.items.clear();
        self.status = CartStatus::Completed;
        self.recompute_totals();
    }

    /// Returns a digest of the cart for lightweight display.
    pub fn summary(&self) -> CartSummary {
        CartSummary {
            item_count: self.item_count(),
            line_count: self.items.len(),
            total: self.total,
        }
    }

    fn recompute_totals(&mut self) {
        for item in &mut self.items {
            item.subtotal = item.unit_price.multiply(item.quantity);
        }
        self.total = self.items.iter().map(|item| item.subtotal).sum();
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Item-count/total digest of a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSummary {
    pub item_count: u32,
    pub line_count: usize,
    pub total: Money,
}

impl CartSummary {
    /// The digest of a shopper with no cart.
    pub fn empty() -> Self {
        Self {
            item_count: 0,
            line_count: 0,
            total: Money::zero(),
        }
    }
}
