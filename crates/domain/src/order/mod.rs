//! Orders: immutable checkout snapshots with evolving payment state.

mod state;

pub use state::{PaymentStatus, ShippingStatus};

use chrono::{DateTime, Utc};
use common::{CartId, OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cart::Cart;
use crate::money::Money;
use crate::pricing::OrderTotals;

/// One line of an order: a frozen copy of the cart line at checkout time.
/// Catalog price changes after checkout never touch these values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub subtotal: Money,
}

/// Where the order ships to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String {
    "MX".to_string()
}

/// Who to contact about the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub name: String,
    pub phone: String,
    pub email: String,
}

/// Card summary returned by the payment provider after confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethodSummary {
    pub brand: String,
    pub last4: String,
    pub funding: String,
}

/// Everything reconciliation records on an order when payment completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub charge_id: Option<String>,
    pub payment_method: Option<PaymentMethodSummary>,
    pub paid_at: DateTime<Utc>,
}

/// A checkout attempt. The item snapshot and totals are immutable once the
/// order exists; only the payment/shipping statuses and the payment
/// references evolve. An order that never receives a confirmation stays
/// `pending` indefinitely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Human-facing unique order number, generated once at creation.
    pub order_number: String,
    /// None for guest checkouts.
    pub customer: Option<UserId>,
    /// The cart this order was snapshotted from.
    pub cart_id: CartId,
    pub items: Vec<OrderLine>,
    pub totals: OrderTotals,
    pub shipping_address: ShippingAddress,
    pub contact: ContactInfo,
    pub payment_status: PaymentStatus,
    pub shipping_status: ShippingStatus,
    /// External payment-intent reference, set at creation.
    pub payment_intent_id: String,
    /// Charge reference, populated on successful confirmation.
    pub charge_id: Option<String>,
    /// Card summary, populated on successful confirmation.
    pub payment_method: Option<PaymentMethodSummary>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Snapshots a cart into a provisional order in `pending`/`pending`.
    /// No money has moved and no stock has been touched at this point.
    pub fn from_cart(
        cart: &Cart,
        totals: OrderTotals,
        shipping_address: ShippingAddress,
        contact: ContactInfo,
        payment_intent_id: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: OrderId::new(),
            order_number: generate_order_number(),
            customer: cart.identity.user_id(),
            cart_id: cart.id,
            items: cart
                .items
                .iter()
                .map(|item| OrderLine {
                    product_id: item.product_id,
                    product_name: item.product_name.clone(),
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    subtotal: item.subtotal,
                })
                .collect(),
            totals,
            shipping_address,
            contact,
            payment_status: PaymentStatus::Pending,
            shipping_status: ShippingStatus::Pending,
            payment_intent_id,
            charge_id: None,
            payment_method: None,
            paid_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a payment receipt, moving the order to `completed`.
    ///
    /// Callers must have won the store-level status compare-and-swap first;
    /// this only mirrors the transition onto an in-memory value.
    pub fn apply_receipt(&mut self, receipt: &PaymentReceipt) {
        self.payment_status = PaymentStatus::Completed;
        self.charge_id = receipt.charge_id.clone();
        self.payment_method = receipt.payment_method.clone();
        self.paid_at = Some(receipt.paid_at);
        self.updated_at = Utc::now();
    }
}

/// Generates a unique human-facing order number, e.g. `ORD-1719855600123-a3f9c1`.
pub fn generate_order_number() -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix = Uuid::new_v4().simple().to_string();
    format!("ORD-{millis}-{}", &suffix[..6])
}

#[cfg(test)]
mod tests {
    use common::{CartIdentity, SessionToken};

    use super::*;
    use crate::product::Product;

    fn checkout_fixtures() -> (Cart, ShippingAddress, ContactInfo) {
        let mut cart = Cart::new(CartIdentity::from(SessionToken::from("sess-1")));
        cart.add_line(&Product::new("Tote bag", Money::from_pesos(120), 10), 2);
        let address = ShippingAddress {
            street: "Av. Reforma 222".to_string(),
            city: "CDMX".to_string(),
            state: "CDMX".to_string(),
            postal_code: "06600".to_string(),
            country: "MX".to_string(),
        };
        let contact = ContactInfo {
            name: "Ana Pérez".to_string(),
            phone: "+52 55 0000 0000".to_string(),
            email: "ana@example.com".to_string(),
        };
        (cart, address, contact)
    }

    #[test]
    fn from_cart_snapshots_lines_and_starts_pending() {
        let (cart, address, contact) = checkout_fixtures();
        let totals = OrderTotals::from_subtotal(cart.total);
        let order = Order::from_cart(&cart, totals, address, contact, "pi_123".to_string());

        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].quantity, 2);
        assert_eq!(order.items[0].subtotal, Money::from_pesos(240));
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.shipping_status, ShippingStatus::Pending);
        assert_eq!(order.payment_intent_id, "pi_123");
        assert!(order.customer.is_none());
        assert!(order.charge_id.is_none());
    }

    #[test]
    fn snapshot_is_detached_from_the_cart() {
        let (mut cart, address, contact) = checkout_fixtures();
        let totals = OrderTotals::from_subtotal(cart.total);
        let order = Order::from_cart(&cart, totals, address, contact, "pi_123".to_string());

        cart.clear();
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.totals.subtotal, Money::from_pesos(240));
    }

    #[test]
    fn authenticated_cart_records_customer() {
        let user = common::UserId::new();
        let mut cart = Cart::new(CartIdentity::from(user));
        cart.add_line(&Product::new("Mug", Money::from_pesos(80), 5), 1);
        let (_, address, contact) = checkout_fixtures();

        let totals = OrderTotals::from_subtotal(cart.total);
        let order = Order::from_cart(&cart, totals, address, contact, "pi_9".to_string());
        assert_eq!(order.customer, Some(user));
    }

    #[test]
    fn apply_receipt_records_payment_details() {
        let (cart, address, contact) = checkout_fixtures();
        let totals = OrderTotals::from_subtotal(cart.total);
        let mut order = Order::from_cart(&cart, totals, address, contact, "pi_123".to_string());

        let receipt = PaymentReceipt {
            charge_id: Some("ch_1".to_string()),
            payment_method: Some(PaymentMethodSummary {
                brand: "visa".to_string(),
                last4: "4242".to_string(),
                funding: "credit".to_string(),
            }),
            paid_at: Utc::now(),
        };
        order.apply_receipt(&receipt);

        assert_eq!(order.payment_status, PaymentStatus::Completed);
        assert_eq!(order.charge_id.as_deref(), Some("ch_1"));
        assert!(order.paid_at.is_some());
    }

    #[test]
    fn order_numbers_are_unique_and_prefixed() {
        let a = generate_order_number();
        let b = generate_order_number();
        assert!(a.starts_with("ORD-"));
        assert_ne!(a, b);
    }
}
