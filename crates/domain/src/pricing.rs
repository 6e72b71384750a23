//! Order pricing rules: tax and shipping on top of the cart subtotal.

use serde::{Deserialize, Serialize};

use crate::money::Money;

/// Sales tax applied to the subtotal, in basis points (16% IVA).
pub const TAX_RATE_BASIS_POINTS: i64 = 1_600;

/// Orders with a subtotal strictly above this ship for free.
pub const FREE_SHIPPING_THRESHOLD: Money = Money::from_pesos(500);

/// Flat shipping fee charged below the free-shipping threshold.
pub const FLAT_SHIPPING_FEE: Money = Money::from_pesos(50);

/// Monetary breakdown of an order: `total = subtotal + tax + shipping`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub shipping: Money,
    pub total: Money,
}

impl OrderTotals {
    /// Computes tax and shipping for a subtotal and returns the breakdown.
    ///
    /// Tax is rounded half-up to the nearest cent.
    pub fn from_subtotal(subtotal: Money) -> Self {
        let tax = Money::from_cents((subtotal.cents() * TAX_RATE_BASIS_POINTS + 5_000) / 10_000);
        let shipping = if subtotal > FREE_SHIPPING_THRESHOLD {
            Money::zero()
        } else {
            FLAT_SHIPPING_FEE
        };
        Self {
            subtotal,
            tax,
            shipping,
            total: subtotal + tax + shipping,
        }
    }
}
