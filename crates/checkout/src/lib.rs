//! Order transaction core.
//!
//! Turns a validated cart into a durable order: reserves stock,
//! persists the order atomically, requests a payment intent from the
//! external gateway, and later finalizes the payment from the
//! gateway's signed callback or reverses the reservation on
//! cancellation.
//!
//! All cross-row consistency is delegated to the store's transaction
//! (`store::StoreTx`); the service itself is stateless and may run on
//! any number of concurrent instances.

mod compensator;
mod coordinator;
mod error;
pub mod gateway;
pub mod signature;
mod verifier;

use std::time::Duration;

pub use coordinator::PlacedOrder;
pub use error::{CheckoutError, Result};
pub use gateway::{GatewayError, GatewayIntent, InMemoryGateway, PaymentGateway};

use store::Store;

/// Default bound on the gateway intent-creation call.
pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(5);

/// The order transaction service: coordinator, payment verifier, and
/// cancellation compensator over one store and one gateway.
pub struct CheckoutService<S, G> {
    store: S,
    gateway: G,
    secret: Vec<u8>,
    currency: String,
    gateway_timeout: Duration,
}

impl<S, G> CheckoutService<S, G>
where
    S: Store,
    G: PaymentGateway,
{
    /// Creates a new checkout service.
    ///
    /// `secret` is the signing secret shared with the payment gateway;
    /// `currency` is the single currency this storefront charges in.
    pub fn new(store: S, gateway: G, secret: impl Into<Vec<u8>>, currency: impl Into<String>) -> Self {
        Self {
            store,
            gateway,
            secret: secret.into(),
            currency: currency.into(),
            gateway_timeout: DEFAULT_GATEWAY_TIMEOUT,
        }
    }

    /// Overrides the bound on the gateway call.
    pub fn with_gateway_timeout(mut self, timeout: Duration) -> Self {
        self.gateway_timeout = timeout;
        self
    }

    /// Gets a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }
}
