//! Payment gateway trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::OrderId;
use domain::Money;
use serde::Serialize;
use thiserror::Error;

/// Error from the external payment gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The gateway refused to create the intent.
    #[error("intent creation declined: {0}")]
    Declined(String),

    /// The gateway could not be reached.
    #[error("gateway unreachable: {0}")]
    Unreachable(String),
}

/// A short-lived payment-collection object created by the gateway and
/// referenced by the order for later reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayIntent {
    /// The gateway's reference for this intent.
    pub intent_id: String,
    /// Amount the intent collects, echoed back by the gateway.
    pub amount: Money,
    /// Currency code, echoed back by the gateway.
    pub currency: String,
}

/// Trait for the external payment gateway's order-creation call.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a payment intent for `amount`, tagged with the order ID
    /// so the later callback can be reconciled against the order.
    async fn create_intent(
        &self,
        amount: Money,
        currency: &str,
        order_id: OrderId,
    ) -> Result<GatewayIntent, GatewayError>;
}

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    intents: HashMap<String, (OrderId, Money)>,
    next_id: u32,
    fail_on_create: bool,
}

/// In-memory payment gateway for testing and local wiring.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGateway {
    state: Arc<RwLock<InMemoryGatewayState>>,
}

impl InMemoryGateway {
    /// Creates a new in-memory gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the gateway to fail on the next create call.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create = fail;
    }

    /// Returns the number of intents created.
    pub fn intent_count(&self) -> usize {
        self.state.read().unwrap().intents.len()
    }

    /// Returns true if an intent exists with the given ID.
    pub fn has_intent(&self, intent_id: &str) -> bool {
        self.state.read().unwrap().intents.contains_key(intent_id)
    }
}

#[async_trait]
impl PaymentGateway for InMemoryGateway {
    async fn create_intent(
        &self,
        amount: Money,
        currency: &str,
        order_id: OrderId,
    ) -> Result<GatewayIntent, GatewayError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_create {
            return Err(GatewayError::Unreachable("connection refused".to_string()));
        }

        state.next_id += 1;
        let intent_id = format!("intent_{:04}", state.next_id);
        state.intents.insert(intent_id.clone(), (order_id, amount));

        Ok(GatewayIntent {
            intent_id,
            amount,
            currency: currency.to_string(),
        })
    }
}
