//! In-memory payment gateway for tests and local runs.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::error::CheckoutError;
use crate::gateway::{
    CreatedIntent, IntentMetadata, IntentStatus, PaymentGateway, PaymentIntent,
    PaymentMethodDetails,
};

#[derive(Debug)]
struct StoredIntent {
    intent: PaymentIntent,
    amount_cents: i64,
    currency: String,
    metadata: IntentMetadata,
}

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    intents: HashMap<String, StoredIntent>,
    next_id: u32,
    fail_on_create: bool,
}

/// In-memory payment gateway. Intents start in `RequiresPayment`; tests
/// drive them to `Succeeded`/`Canceled` with the `mark_*` hooks, standing in
/// for the shopper confirming in the browser.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<InMemoryGatewayState>>,
}

impl InMemoryPaymentGateway {
    /// Creates a new in-memory gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the gateway to fail on the next create call.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create = fail;
    }

    /// Moves an intent to `Succeeded`, attaching a charge and payment
    /// method the way a completed client-side confirmation would.
    pub fn mark_succeeded(&self, intent_id: &str) {
        let mut state = self.state.write().unwrap();
        if let Some(stored) = state.intents.get_mut(intent_id) {
            stored.intent.status = IntentStatus::Succeeded;
            stored.intent.latest_charge = Some(format!("ch_{}", &intent_id[3..]));
            stored.intent.payment_method = Some(format!("pm_{}", &intent_id[3..]));
        }
    }

    /// Moves an intent to `Canceled`.
    pub fn mark_failed(&self, intent_id: &str) {
        let mut state = self.state.write().unwrap();
        if let Some(stored) = state.intents.get_mut(intent_id) {
            stored.intent.status = IntentStatus::Canceled;
        }
    }

    /// Returns the number of intents created.
    pub fn intent_count(&self) -> usize {
        self.state.read().unwrap().intents.len()
    }

    /// Returns the id of the most recently created intent.
    pub fn latest_intent_id(&self) -> Option<String> {
        let state = self.state.read().unwrap();
        let n = state.next_id;
        if n == 0 {
            None
        } else {
            Some(format!("pi_{n:04}"))
        }
    }

    /// Returns the amount and currency an intent was created for.
    pub fn amount_of(&self, intent_id: &str) -> Option<(i64, String)> {
        let state = self.state.read().unwrap();
        state
            .intents
            .get(intent_id)
            .map(|stored| (stored.amount_cents, stored.currency.clone()))
    }

    /// Returns the metadata an intent was created with.
    pub fn metadata_of(&self, intent_id: &str) -> Option<IntentMetadata> {
        let state = self.state.read().unwrap();
        state
            .intents
            .get(intent_id)
            .map(|stored| stored.metadata.clone())
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn create_intent(
        &self,
        amount_cents: i64,
        currency: &str,
        metadata: IntentMetadata,
    ) -> Result<CreatedIntent, CheckoutError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_create {
            return Err(CheckoutError::Provider(
                "intent creation refused".to_string(),
            ));
        }

        state.next_id += 1;
        let id = format!("pi_{:04}", state.next_id);
        let client_secret = format!("{id}_secret_test");
        state.intents.insert(
            id.clone(),
            StoredIntent {
                intent: PaymentIntent {
                    id: id.clone(),
                    status: IntentStatus::RequiresPayment,
                    latest_charge: None,
                    payment_method: None,
                },
                amount_cents,
                currency: currency.to_string(),
                metadata,
            },
        );

        Ok(CreatedIntent { id, client_secret })
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent, CheckoutError> {
        let state = self.state.read().unwrap();
        state
            .intents
            .get(intent_id)
            .map(|stored| stored.intent.clone())
            .ok_or_else(|| CheckoutError::Provider(format!("no such payment intent: {intent_id}")))
    }

    async fn retrieve_payment_method(
        &self,
        payment_method_id: &str,
    ) -> Result<PaymentMethodDetails, CheckoutError> {
        let state = self.state.read().unwrap();
        let known = state
            .intents
            .values()
            .any(|stored| stored.intent.payment_method.as_deref() == Some(payment_method_id));
        if known {
            Ok(PaymentMethodDetails {
                brand: "visa".to_string(),
                last4: "4242".to_string(),
                funding: "credit".to_string(),
            })
        } else {
            Err(CheckoutError::Provider(format!(
                "no such payment method: {payment_method_id}"
            )))
        }
    }
}
