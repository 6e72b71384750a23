//! In-memory store implementations for testing and local runs.
//!
//! These provide the same conditional-write semantics as the PostgreSQL
//! implementation: version compare-and-swap on carts, terminal-state
//! guarding on order payment transitions, and reject-below-zero stock
//! decrements.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{CartId, CartIdentity, OrderId, ProductId, UserId};
use domain::{Cart, Order, PaymentReceipt, PaymentStatus, Product};
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::traits::{CartStore, OrderStore, ProductStore};

/// In-memory cart store.
#[derive(Clone, Default)]
pub struct InMemoryCartStore {
    carts: Arc<RwLock<HashMap<CartId, Cart>>>,
}

impl InMemoryCartStore {
    /// Creates a new empty cart store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of carts stored, any status.
    pub async fn cart_count(&self) -> usize {
        self.carts.read().await.len()
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn find_open(&self, identity: &CartIdentity) -> Result<Option<Cart>> {
        let carts = self.carts.read().await;
        Ok(carts
            .values()
            .find(|cart| cart.identity == *identity && cart.status.is_open())
            .cloned())
    }

    async fn find_by_id(&self, id: CartId) -> Result<Option<Cart>> {
        Ok(self.carts.read().await.get(&id).cloned())
    }

    async fn insert(&self, cart: &Cart) -> Result<()> {
        let mut carts = self.carts.write().await;
        if cart.status.is_open()
            && carts
                .values()
                .any(|existing| existing.identity == cart.identity && existing.status.is_open())
        {
            return Err(StoreError::DuplicateOpenCart {
                identity: cart.identity.to_string(),
            });
        }
        carts.insert(cart.id, cart.clone());
        Ok(())
    }

    async fn update(&self, cart: &Cart) -> Result<u64> {
        let mut carts = self.carts.write().await;
        let stored = carts
            .get_mut(&cart.id)
            .ok_or(StoreError::CartNotFound(cart.id))?;

        if stored.version != cart.version {
            return Err(StoreError::VersionConflict {
                cart_id: cart.id,
                expected: cart.version,
                actual: stored.version,
            });
        }

        let mut updated = cart.clone();
        updated.version = cart.version + 1;
        let new_version = updated.version;
        *stored = updated;
        Ok(new_version)
    }

    async fn delete(&self, id: CartId) -> Result<()> {
        self.carts.write().await.remove(&id);
        Ok(())
    }
}

/// In-memory order store.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: &Order) -> Result<()> {
        self.orders.write().await.insert(order.id, order.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn find_by_intent(&self, payment_intent_id: &str) -> Result<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders
            .values()
            .find(|order| order.payment_intent_id == payment_intent_id)
            .cloned())
    }

    async fn list_for_customer(&self, customer: UserId) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut result: Vec<Order> = orders
            .values()
            .filter(|order| order.customer == Some(customer))
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }

    async fn record_completion(&self, id: OrderId, receipt: &PaymentReceipt) -> Result<bool> {
        let mut orders = self.orders.write().await;
        let order = orders.get_mut(&id).ok_or(StoreError::OrderNotFound(id))?;

        if !order.payment_status.can_finalize() {
            return Ok(false);
        }
        order.apply_receipt(receipt);
        Ok(true)
    }

    async fn record_failure(&self, id: OrderId) -> Result<bool> {
        let mut orders = self.orders.write().await;
        let order = orders.get_mut(&id).ok_or(StoreError::OrderNotFound(id))?;

        if !order.payment_status.can_finalize() {
            return Ok(false);
        }
        order.payment_status = PaymentStatus::Failed;
        order.updated_at = Utc::now();
        Ok(true)
    }
}

/// In-memory product store.
#[derive(Clone, Default)]
pub struct InMemoryProductStore {
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
}

impl InMemoryProductStore {
    /// Creates a new empty product store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current stock of a product (test helper).
    pub async fn stock_of(&self, id: ProductId) -> Option<u32> {
        self.products.read().await.get(&id).map(|p| p.stock)
    }

    /// Marks a product active or inactive (test helper).
    pub async fn set_active(&self, id: ProductId, active: bool) {
        if let Some(product) = self.products.write().await.get_mut(&id) {
            product.active = active;
        }
    }

    /// Overwrites a product's stock (test helper).
    pub async fn set_stock(&self, id: ProductId, stock: u32) {
        if let Some(product) = self.products.write().await.get_mut(&id) {
            product.stock = stock;
        }
    }
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn insert(&self, product: &Product) -> Result<()> {
        self.products
            .write()
            .await
            .insert(product.id, product.clone());
        Ok(())
    }

    async fn decrement_stock(&self, id: ProductId, quantity: u32) -> Result<()> {
        let mut products = self.products.write().await;
        let product = products
            .get_mut(&id)
            .ok_or(StoreError::ProductNotFound(id))?;

        if product.stock < quantity {
            return Err(StoreError::InsufficientStock {
                product_id: id,
                requested: quantity,
                available: product.stock,
            });
        }
        product.stock -= quantity;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use common::SessionToken;
    use domain::Money;

    use super::*;

    fn session_cart(token: &str) -> Cart {
        Cart::new(CartIdentity::from(SessionToken::from(token)))
    }

    #[tokio::test]
    async fn insert_and_find_open_cart() {
        let store = InMemoryCartStore::new();
        let cart = session_cart("sess-1");
        store.insert(&cart).await.unwrap();

        let found = store.find_open(&cart.identity).await.unwrap().unwrap();
        assert_eq!(found.id, cart.id);
        assert!(
            store
                .find_open(&CartIdentity::from(SessionToken::from("other")))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn second_open_cart_for_identity_is_rejected() {
        let store = InMemoryCartStore::new();
        let cart = session_cart("sess-1");
        store.insert(&cart).await.unwrap();

        let duplicate = session_cart("sess-1");
        let err = store.insert(&duplicate).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateOpenCart { .. }));
    }

    #[tokio::test]
    async fn update_bumps_version_and_detects_conflicts() {
        let store = InMemoryCartStore::new();
        let cart = session_cart("sess-1");
        store.insert(&cart).await.unwrap();

        let new_version = store.update(&cart).await.unwrap();
        assert_eq!(new_version, 1);

        // A writer still holding version 0 loses the race.
        let err = store.update(&cart).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::VersionConflict {
                expected: 0,
                actual: 1,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn completion_is_recorded_exactly_once() {
        let store = InMemoryOrderStore::new();
        let mut cart = session_cart("sess-1");
        let product = Product::new("Tote bag", Money::from_pesos(120), 5);
        cart.add_line(&product, 1);
        let order = Order::from_cart(
            &cart,
            domain::OrderTotals::from_subtotal(cart.total),
            domain::ShippingAddress {
                street: "Calle 1".into(),
                city: "CDMX".into(),
                state: "CDMX".into(),
                postal_code: "06600".into(),
                country: "MX".into(),
            },
            domain::ContactInfo {
                name: "Ana".into(),
                phone: "555".into(),
                email: "ana@example.com".into(),
            },
            "pi_1".into(),
        );
        store.insert(&order).await.unwrap();

        let receipt = PaymentReceipt {
            charge_id: Some("ch_1".into()),
            payment_method: None,
            paid_at: Utc::now(),
        };

        assert!(store.record_completion(order.id, &receipt).await.unwrap());
        assert!(!store.record_completion(order.id, &receipt).await.unwrap());

        let stored = store.find_by_id(order.id).await.unwrap().unwrap();
        assert_eq!(stored.payment_status, PaymentStatus::Completed);
        assert_eq!(stored.charge_id.as_deref(), Some("ch_1"));
    }

    #[tokio::test]
    async fn failure_does_not_override_completion() {
        let store = InMemoryOrderStore::new();
        let mut cart = session_cart("sess-1");
        cart.add_line(&Product::new("Mug", Money::from_pesos(80), 5), 1);
        let order = Order::from_cart(
            &cart,
            domain::OrderTotals::from_subtotal(cart.total),
            domain::ShippingAddress {
                street: "Calle 1".into(),
                city: "CDMX".into(),
                state: "CDMX".into(),
                postal_code: "06600".into(),
                country: "MX".into(),
            },
            domain::ContactInfo {
                name: "Ana".into(),
                phone: "555".into(),
                email: "ana@example.com".into(),
            },
            "pi_2".into(),
        );
        store.insert(&order).await.unwrap();

        let receipt = PaymentReceipt {
            charge_id: None,
            payment_method: None,
            paid_at: Utc::now(),
        };
        assert!(store.record_completion(order.id, &receipt).await.unwrap());
        assert!(!store.record_failure(order.id).await.unwrap());

        let stored = store.find_by_id(order.id).await.unwrap().unwrap();
        assert_eq!(stored.payment_status, PaymentStatus::Completed);
    }

    #[tokio::test]
    async fn decrement_rejects_below_zero() {
        let store = InMemoryProductStore::new();
        let product = Product::new("Tote bag", Money::from_pesos(120), 3);
        store.insert(&product).await.unwrap();

        store.decrement_stock(product.id, 2).await.unwrap();
        let err = store.decrement_stock(product.id, 2).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::InsufficientStock {
                requested: 2,
                available: 1,
                ..
            }
        ));
        assert_eq!(store.stock_of(product.id).await, Some(1));
    }

    #[tokio::test]
    async fn concurrent_decrements_cannot_both_take_the_last_units() {
        let store = InMemoryProductStore::new();
        let product = Product::new("Tote bag", Money::from_pesos(120), 3);
        store.insert(&product).await.unwrap();

        let (a, b) = tokio::join!(
            store.decrement_stock(product.id, 2),
            store.decrement_stock(product.id, 2)
        );
        assert!(a.is_ok() != b.is_ok());
        assert_eq!(store.stock_of(product.id).await, Some(1));
    }
}
