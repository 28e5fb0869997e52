//! Payment verification from the gateway's signed callback.

use common::{OrderId, UserId};

use crate::error::{CheckoutError, Result};
use crate::gateway::PaymentGateway;
use crate::{CheckoutService, signature};
use store::Store;

impl<S, G> CheckoutService<S, G>
where
    S: Store,
    G: PaymentGateway,
{
    /// Finalizes an order's payment from a gateway callback.
    ///
    /// The expected signature is recomputed over
    /// `"{gateway_order_ref}|{gateway_payment_ref}"` with the shared
    /// secret and compared in constant time. A mismatch changes
    /// nothing: the order stays pending rather than being failed,
    /// since a bad callback may be attacker noise rather than a
    /// genuine failed payment.
    ///
    /// On match, the store applies one ownership-scoped atomic update,
    /// so two concurrent callbacks for the same order can both run and
    /// only produce identical state. Repeats with the same payment
    /// reference are no-ops.
    #[tracing::instrument(skip(self, gateway_order_ref, gateway_payment_ref, signature))]
    pub async fn verify_payment(
        &self,
        order_id: OrderId,
        user_id: UserId,
        gateway_order_ref: &str,
        gateway_payment_ref: &str,
        signature: &str,
    ) -> Result<()> {
        if !signature::verify(&self.secret, gateway_order_ref, gateway_payment_ref, signature) {
            metrics::counter!("payment_signature_rejected_total").increment(1);
            tracing::warn!(%order_id, "payment callback signature mismatch");
            return Err(CheckoutError::InvalidSignature);
        }

        let updated = self
            .store
            .confirm_payment(order_id, user_id, gateway_payment_ref)
            .await?;
        if !updated {
            return Err(CheckoutError::OrderNotFound(order_id));
        }

        metrics::counter!("payments_verified_total").increment(1);
        tracing::info!(%order_id, payment_ref = gateway_payment_ref, "payment verified");
        Ok(())
    }
}
