//! PostgreSQL-backed store implementation.
//!
//! All conditional transitions are single `UPDATE ... WHERE <precondition>`
//! statements, so the database is the arbiter of every race: cart version
//! CAS, the payment-status CAS, and the stock decrement floor.

use async_trait::async_trait;
use common::{CartId, CartIdentity, OrderId, ProductId, SessionToken, UserId};
use domain::{
    Cart, CartItem, CartStatus, ContactInfo, Money, Order, OrderLine, OrderTotals,
    PaymentMethodSummary, PaymentReceipt, PaymentStatus, Product, ShippingAddress, ShippingStatus,
};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::traits::{CartStore, OrderStore, ProductStore};

/// Entry point for the PostgreSQL backend: owns the pool and hands out the
/// per-entity stores, which all share it.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the given database URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPool::connect(url).await?;
        tracing::info!("connected to PostgreSQL store");
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    /// Returns the cart store backed by this pool.
    pub fn carts(&self) -> PostgresCartStore {
        PostgresCartStore {
            pool: self.pool.clone(),
        }
    }

    /// Returns the order store backed by this pool.
    pub fn orders(&self) -> PostgresOrderStore {
        PostgresOrderStore {
            pool: self.pool.clone(),
        }
    }

    /// Returns the product store backed by this pool.
    pub fn products(&self) -> PostgresProductStore {
        PostgresProductStore {
            pool: self.pool.clone(),
        }
    }
}

/// PostgreSQL-backed [`CartStore`].
#[derive(Clone)]
pub struct PostgresCartStore {
    pool: PgPool,
}

/// PostgreSQL-backed [`OrderStore`].
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

/// PostgreSQL-backed [`ProductStore`].
#[derive(Clone)]
pub struct PostgresProductStore {
    pool: PgPool,
}

const CART_COLUMNS: &str =
    "id, user_id, session_token, status, items, total_cents, version, created_at, updated_at";

const ORDER_COLUMNS: &str = "id, order_number, customer_id, cart_id, items, subtotal_cents, \
     tax_cents, shipping_cents, total_cents, shipping_address, contact, payment_status, \
     shipping_status, payment_intent_id, charge_id, payment_method, paid_at, created_at, updated_at";

fn row_to_cart(row: &PgRow) -> Result<Cart> {
    let user_id: Option<Uuid> = row.try_get("user_id")?;
    let session_token: Option<String> = row.try_get("session_token")?;
    let identity = match (user_id, session_token) {
        (Some(user), None) => CartIdentity::User(UserId::from_uuid(user)),
        (None, Some(token)) => CartIdentity::Session(SessionToken::new(token)),
        _ => {
            return Err(StoreError::Serialization(serde_json::Error::io(
                std::io::Error::other("cart row must carry exactly one of user_id/session_token"),
            )));
        }
    };

    let items: Vec<CartItem> = serde_json::from_value(row.try_get("items")?)?;
    let status = CartStatus::parse(&row.try_get::<String, _>("status")?)
        .ok_or_else(|| unknown_status("status"))?;

    Ok(Cart {
        id: CartId::from_uuid(row.try_get("id")?),
        identity,
        items,
        status,
        total: Money::from_cents(row.try_get("total_cents")?),
        version: row.try_get::<i64, _>("version")? as u64,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_order(row: &PgRow) -> Result<Order> {
    let items: Vec<OrderLine> = serde_json::from_value(row.try_get("items")?)?;
    let shipping_address: ShippingAddress =
        serde_json::from_value(row.try_get("shipping_address")?)?;
    let contact: ContactInfo = serde_json::from_value(row.try_get("contact")?)?;
    let payment_method: Option<PaymentMethodSummary> = row
        .try_get::<Option<serde_json::Value>, _>("payment_method")?
        .map(serde_json::from_value)
        .transpose()?;

    let payment_status = PaymentStatus::parse(&row.try_get::<String, _>("payment_status")?)
        .ok_or_else(|| unknown_status("payment_status"))?;
    let shipping_status = ShippingStatus::parse(&row.try_get::<String, _>("shipping_status")?)
        .ok_or_else(|| unknown_status("shipping_status"))?;

    Ok(Order {
        id: OrderId::from_uuid(row.try_get("id")?),
        order_number: row.try_get("order_number")?,
        customer: row
            .try_get::<Option<Uuid>, _>("customer_id")?
            .map(UserId::from_uuid),
        cart_id: CartId::from_uuid(row.try_get("cart_id")?),
        items,
        totals: OrderTotals {
            subtotal: Money::from_cents(row.try_get("subtotal_cents")?),
            tax: Money::from_cents(row.try_get("tax_cents")?),
            shipping: Money::from_cents(row.try_get("shipping_cents")?),
            total: Money::from_cents(row.try_get("total_cents")?),
        },
        shipping_address,
        contact,
        payment_status,
        shipping_status,
        payment_intent_id: row.try_get("payment_intent_id")?,
        charge_id: row.try_get("charge_id")?,
        payment_method,
        paid_at: row.try_get("paid_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_product(row: &PgRow) -> Result<Product> {
    Ok(Product {
        id: ProductId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        price: Money::from_cents(row.try_get("price_cents")?),
        stock: row.try_get::<i32, _>("stock")? as u32,
        active: row.try_get("active")?,
        created_at: row.try_get("created_at")?,
    })
}

fn unknown_status(column: &str) -> StoreError {
    StoreError::Serialization(serde_json::Error::io(std::io::Error::other(format!(
        "unknown {column} value in row"
    ))))
}

fn identity_columns(identity: &CartIdentity) -> (Option<Uuid>, Option<String>) {
    match identity {
        CartIdentity::User(user) => (Some(user.as_uuid()), None),
        CartIdentity::Session(token) => (None, Some(token.as_str().to_string())),
    }
}

#[async_trait]
impl CartStore for PostgresCartStore {
    async fn find_open(&self, identity: &CartIdentity) -> Result<Option<Cart>> {
        let row = match identity {
            CartIdentity::User(user) => {
                sqlx::query(&format!(
                    "SELECT {CART_COLUMNS} FROM carts \
                     WHERE user_id = $1 AND status IN ('active', 'checking_out')"
                ))
                .bind(user.as_uuid())
                .fetch_optional(&self.pool)
                .await?
            }
            CartIdentity::Session(token) => {
                sqlx::query(&format!(
                    "SELECT {CART_COLUMNS} FROM carts \
                     WHERE session_token = $1 AND status IN ('active', 'checking_out')"
                ))
                .bind(token.as_str())
                .fetch_optional(&self.pool)
                .await?
            }
        };

        row.as_ref().map(row_to_cart).transpose()
    }

    async fn find_by_id(&self, id: CartId) -> Result<Option<Cart>> {
        let row = sqlx::query(&format!("SELECT {CART_COLUMNS} FROM carts WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_cart).transpose()
    }

    async fn insert(&self, cart: &Cart) -> Result<()> {
        let (user_id, session_token) = identity_columns(&cart.identity);
        let items = serde_json::to_value(&cart.items)?;

        sqlx::query(
            "INSERT INTO carts \
             (id, user_id, session_token, status, items, total_cents, version, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(cart.id.as_uuid())
        .bind(user_id)
        .bind(session_token)
        .bind(cart.status.as_str())
        .bind(items)
        .bind(cart.total.cents())
        .bind(cart.version as i64)
        .bind(cart.created_at)
        .bind(cart.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            // The partial unique indexes on open carts turn the
            // one-open-cart-per-identity rule into a constraint violation.
            if let sqlx::Error::Database(ref db_err) = e
                && db_err
                    .constraint()
                    .is_some_and(|c| c.starts_with("carts_open"))
            {
                return StoreError::DuplicateOpenCart {
                    identity: cart.identity.to_string(),
                };
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }

    async fn update(&self, cart: &Cart) -> Result<u64> {
        let (user_id, session_token) = identity_columns(&cart.identity);
        let items = serde_json::to_value(&cart.items)?;

        let result = sqlx::query(
            "UPDATE carts SET user_id = $2, session_token = $3, status = $4, items = $5, \
             total_cents = $6, version = version + 1, updated_at = $7 \
             WHERE id = $1 AND version = $8",
        )
        .bind(cart.id.as_uuid())
        .bind(user_id)
        .bind(session_token)
        .bind(cart.status.as_str())
        .bind(items)
        .bind(cart.total.cents())
        .bind(cart.updated_at)
        .bind(cart.version as i64)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(cart.version + 1);
        }

        let actual: Option<i64> = sqlx::query_scalar("SELECT version FROM carts WHERE id = $1")
            .bind(cart.id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        match actual {
            Some(actual) => Err(StoreError::VersionConflict {
                cart_id: cart.id,
                expected: cart.version,
                actual: actual as u64,
            }),
            None => Err(StoreError::CartNotFound(cart.id)),
        }
    }

    async fn delete(&self, id: CartId) -> Result<()> {
        sqlx::query("DELETE FROM carts WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

impl PostgresOrderStore {
    async fn require_order_exists(&self, id: OrderId) -> Result<()> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM orders WHERE id = $1)")
            .bind(id.as_uuid())
            .fetch_one(&self.pool)
            .await?;
        if exists {
            Ok(())
        } else {
            Err(StoreError::OrderNotFound(id))
        }
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn insert(&self, order: &Order) -> Result<()> {
        let items = serde_json::to_value(&order.items)?;
        let shipping_address = serde_json::to_value(&order.shipping_address)?;
        let contact = serde_json::to_value(&order.contact)?;
        let payment_method = order
            .payment_method
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        sqlx::query(
            "INSERT INTO orders \
             (id, order_number, customer_id, cart_id, items, subtotal_cents, tax_cents, \
              shipping_cents, total_cents, shipping_address, contact, payment_status, \
              shipping_status, payment_intent_id, charge_id, payment_method, paid_at, \
              created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, \
              $18, $19)",
        )
        .bind(order.id.as_uuid())
        .bind(&order.order_number)
        .bind(order.customer.as_ref().map(UserId::as_uuid))
        .bind(order.cart_id.as_uuid())
        .bind(items)
        .bind(order.totals.subtotal.cents())
        .bind(order.totals.tax.cents())
        .bind(order.totals.shipping.cents())
        .bind(order.totals.total.cents())
        .bind(shipping_address)
        .bind(contact)
        .bind(order.payment_status.as_str())
        .bind(order.shipping_status.as_str())
        .bind(&order.payment_intent_id)
        .bind(order.charge_id.as_deref())
        .bind(payment_method)
        .bind(order.paid_at)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_order).transpose()
    }

    async fn find_by_intent(&self, payment_intent_id: &str) -> Result<Option<Order>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE payment_intent_id = $1"
        ))
        .bind(payment_intent_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_order).transpose()
    }

    async fn list_for_customer(&self, customer: UserId) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE customer_id = $1 ORDER BY created_at DESC"
        ))
        .bind(customer.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_order).collect()
    }

    async fn record_completion(&self, id: OrderId, receipt: &PaymentReceipt) -> Result<bool> {
        let payment_method = receipt
            .payment_method
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        let result = sqlx::query(
            "UPDATE orders SET payment_status = 'completed', charge_id = $2, \
             payment_method = $3, paid_at = $4, updated_at = NOW() \
             WHERE id = $1 AND payment_status IN ('pending', 'processing')",
        )
        .bind(id.as_uuid())
        .bind(receipt.charge_id.as_deref())
        .bind(payment_method)
        .bind(receipt.paid_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }
        self.require_order_exists(id).await?;
        Ok(false)
    }

    async fn record_failure(&self, id: OrderId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE orders SET payment_status = 'failed', updated_at = NOW() \
             WHERE id = $1 AND payment_status IN ('pending', 'processing')",
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }
        self.require_order_exists(id).await?;
        Ok(false)
    }
}

#[async_trait]
impl ProductStore for PostgresProductStore {
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            "SELECT id, name, price_cents, stock, active, created_at FROM products WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_product).transpose()
    }

    async fn insert(&self, product: &Product) -> Result<()> {
        sqlx::query(
            "INSERT INTO products (id, name, price_cents, stock, active, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(product.price.cents())
        .bind(product.stock as i32)
        .bind(product.active)
        .bind(product.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn decrement_stock(&self, id: ProductId, quantity: u32) -> Result<()> {
        let result =
            sqlx::query("UPDATE products SET stock = stock - $2 WHERE id = $1 AND stock >= $2")
                .bind(id.as_uuid())
                .bind(quantity as i32)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        let available: Option<i32> = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        match available {
            Some(available) => Err(StoreError::InsufficientStock {
                product_id: id,
                requested: quantity,
                available: available as u32,
            }),
            None => Err(StoreError::ProductNotFound(id)),
        }
    }
}
