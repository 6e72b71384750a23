//! Payment provider trait and types.
//!
//! The provider is a black box to the rest of the system: create an intent,
//! re-fetch its authoritative status, look up the payment method used.
//! Webhook signature verification lives in [`crate::webhook`] since it does
//! not need a provider round-trip.

mod mock;

pub use mock::InMemoryPaymentGateway;

use async_trait::async_trait;
use common::{CartId, ProductId};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Status of a payment intent as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    /// Created, waiting for the shopper to submit payment.
    RequiresPayment,
    /// Payment submitted, provider still working.
    Processing,
    /// Money captured.
    Succeeded,
    /// Payment failed or was abandoned.
    Canceled,
}

impl IntentStatus {
    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentStatus::RequiresPayment => "requires_payment",
            IntentStatus::Processing => "processing",
            IntentStatus::Succeeded => "succeeded",
            IntentStatus::Canceled => "canceled",
        }
    }
}

impl std::fmt::Display for IntentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of creating a payment intent.
#[derive(Debug, Clone)]
pub struct CreatedIntent {
    /// Provider-side intent id.
    pub id: String,
    /// Secret the browser needs to confirm the payment client-side.
    pub client_secret: String,
}

/// A payment intent as re-fetched from the provider.
#[derive(Debug, Clone)]
pub struct PaymentIntent {
    pub id: String,
    pub status: IntentStatus,
    /// Charge reference once money moved.
    pub latest_charge: Option<String>,
    /// Payment-method reference once the shopper submitted one.
    pub payment_method: Option<String>,
}

/// Card summary for an order receipt.
#[derive(Debug, Clone)]
pub struct PaymentMethodDetails {
    pub brand: String,
    pub last4: String,
    pub funding: String,
}

/// One line of the item summary attached to an intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentItemSummary {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

/// Order-identifying metadata attached to every created intent, for
/// reconciliation and auditing on the provider side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentMetadata {
    pub cart_id: CartId,
    /// `user:<id>` or `session:<token>`.
    pub identity: String,
    pub items: Vec<IntentItemSummary>,
}

/// Operations the checkout core needs from the payment provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a payment intent for `amount_cents` in `currency`.
    async fn create_intent(
        &self,
        amount_cents: i64,
        currency: &str,
        metadata: IntentMetadata,
    ) -> Result<CreatedIntent>;

    /// Re-fetches the authoritative state of an intent.
    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent>;

    /// Looks up the payment method used for a confirmed intent.
    async fn retrieve_payment_method(&self, payment_method_id: &str)
    -> Result<PaymentMethodDetails>;
}
