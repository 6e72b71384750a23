//! Payment and shipping state machines for orders.
//!
//! The two machines are independent: payment progresses as money moves,
//! shipping progresses as fulfillment happens.

use serde::{Deserialize, Serialize};

/// Payment state of an order.
///
/// State transitions:
/// ```text
/// Pending ──► Processing ──┬──► Completed
///     │                    └──► Failed
///     └───────────────────────► Completed | Failed
/// ```
///
/// `Completed` and `Failed` are terminal here; `Refunded` exists as
/// vocabulary for downstream tooling but no flow in this system produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Order created, no confirmation received yet.
    #[default]
    Pending,

    /// A confirmation is being reconciled.
    Processing,

    /// Payment confirmed by the provider (terminal state).
    Completed,

    /// Provider reported the payment did not succeed (terminal state).
    Failed,

    /// Payment was returned to the shopper (terminal state, unused).
    Refunded,
}

impl PaymentStatus {
    /// Returns true if reconciliation may still move this order to a
    /// terminal payment state.
    pub fn can_finalize(&self) -> bool {
        matches!(self, PaymentStatus::Pending | PaymentStatus::Processing)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Completed | PaymentStatus::Failed | PaymentStatus::Refunded
        )
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Processing => "processing",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    /// Parses a status from its string name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "processing" => Some(PaymentStatus::Processing),
            "completed" => Some(PaymentStatus::Completed),
            "failed" => Some(PaymentStatus::Failed),
            "refunded" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fulfillment state of an order, independent of payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ShippingStatus {
    /// Not yet handed to fulfillment.
    #[default]
    Pending,

    /// Being prepared for shipment.
    Processing,

    /// Handed to the carrier.
    Shipped,

    /// Received by the shopper (terminal state).
    Delivered,

    /// Fulfillment cancelled (terminal state).
    Cancelled,
}

impl ShippingStatus {
    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ShippingStatus::Delivered | ShippingStatus::Cancelled)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ShippingStatus::Pending => "pending",
            ShippingStatus::Processing => "processing",
            ShippingStatus::Shipped => "shipped",
            ShippingStatus::Delivered => "delivered",
            ShippingStatus::Cancelled => "cancelled",
        }
    }

    /// Parses a status from its string name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ShippingStatus::Pending),
            "processing" => Some(ShippingStatus::Processing),
            "shipped" => Some(ShippingStatus::Shipped),
            "delivered" => Some(ShippingStatus::Delivered),
            "cancelled" => Some(ShippingStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for ShippingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
