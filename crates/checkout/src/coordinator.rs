//! Order placement: the coordinator of the transaction core.

use common::{OrderId, UserId};
use domain::{CartItem, Money, Order, OrderLine};
use serde::Serialize;

use crate::error::{CheckoutError, Result};
use crate::gateway::{GatewayIntent, PaymentGateway};
use crate::CheckoutService;
use store::{Store, StoreTx};

/// Client-facing descriptor of a successfully placed order.
#[derive(Debug, Clone, Serialize)]
pub struct PlacedOrder {
    pub order_id: OrderId,
    /// Sum of line totals, computed from prices frozen at call time.
    pub total: Money,
    pub lines: Vec<OrderLine>,
    /// Gateway intent the client completes payment against.
    pub intent: GatewayIntent,
}

impl<S, G> CheckoutService<S, G>
where
    S: Store,
    G: PaymentGateway,
{
    /// Places an order for the given cart.
    ///
    /// The whole operation is one store transaction: product reads,
    /// order and line inserts, and stock decrements all roll back
    /// unless the gateway intent was created and the commit succeeded.
    /// Cart items are processed in client-submitted order and any
    /// single failing line aborts the entire order.
    #[tracing::instrument(skip(self, cart, delivery_address, phone), fields(lines = cart.len()))]
    pub async fn place_order(
        &self,
        user_id: UserId,
        cart: &[CartItem],
        delivery_address: &str,
        phone: &str,
    ) -> Result<PlacedOrder> {
        metrics::counter!("orders_attempted_total").increment(1);
        let start = std::time::Instant::now();

        let mut tx = self.store.begin().await?;

        // Validate each line against the locked product row and freeze
        // its price. Availability is remembered for the error report
        // should the conditional decrement still miss.
        let mut lines = Vec::with_capacity(cart.len());
        let mut available = Vec::with_capacity(cart.len());
        let mut total = Money::zero();
        for item in cart {
            let product = tx
                .product_for_update(item.product_id)
                .await?
                .filter(|p| p.is_orderable())
                .ok_or(CheckoutError::ProductNotFound(item.product_id))?;

            if !product.has_stock_for(item.quantity) {
                return Err(CheckoutError::InsufficientStock {
                    product_id: item.product_id,
                    requested: item.quantity,
                    available: product.stock,
                });
            }

            total += product.price.times(item.quantity);
            lines.push(OrderLine {
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price: product.price,
            });
            available.push(product.stock);
        }

        let order = Order::place(OrderId::new(), user_id, total, delivery_address, phone);
        let order_id = order.id;
        tx.insert_order(&order).await?;
        tx.insert_lines(order_id, &lines).await?;

        // Reserve stock with the conditional decrement; the row locks
        // from the reads above make this a formality within one
        // transaction, but it stays conditional to defend against
        // lost updates.
        for (line, &had) in lines.iter().zip(&available) {
            if !tx.reserve_stock(line.product_id, line.quantity).await? {
                return Err(CheckoutError::InsufficientStock {
                    product_id: line.product_id,
                    requested: line.quantity,
                    available: had,
                });
            }
        }

        // The gateway call is the only network-bound step; commit only
        // happens once the intent exists, so stock is never held for an
        // order with no way to pay it.
        let intent = tokio::time::timeout(
            self.gateway_timeout,
            self.gateway.create_intent(total, &self.currency, order_id),
        )
        .await
        .map_err(|_| CheckoutError::GatewayUnavailable("intent creation timed out".to_string()))?
        .map_err(|e| CheckoutError::GatewayUnavailable(e.to_string()))?;

        tx.commit().await?;

        metrics::counter!("orders_placed_total").increment(1);
        metrics::histogram!("order_placement_duration_seconds")
            .record(start.elapsed().as_secs_f64());
        tracing::info!(%order_id, total = %total, intent_id = %intent.intent_id, "order placed");

        Ok(PlacedOrder {
            order_id,
            total,
            lines,
            intent,
        })
    }
}
