//! Checkout orchestration and payment reconciliation.
//!
//! Two components share this crate because they share one invariant: the
//! orchestrator creates provisional orders without moving money or stock,
//! and reconciliation is the only code allowed to complete an order and
//! decrement inventory. That happens exactly once, no matter how many
//! confirmations (client call, webhook, or both) arrive for the same
//! payment.

pub mod error;
pub mod gateway;
pub mod orchestrator;
pub mod reconcile;
pub mod webhook;

pub use error::CheckoutError;
pub use gateway::{
    CreatedIntent, InMemoryPaymentGateway, IntentItemSummary, IntentMetadata, IntentStatus,
    PaymentGateway, PaymentIntent, PaymentMethodDetails,
};
pub use orchestrator::{CheckoutService, CheckoutSession, CURRENCY};
pub use reconcile::FinalizeOutcome;
pub use webhook::{SIGNATURE_HEADER, WebhookEvent, WebhookVerifier};
