//! Cancellation: the compensator that reverses a reservation.

use common::{OrderId, UserId};

use crate::CheckoutService;
use crate::error::{CheckoutError, Result};
use crate::gateway::PaymentGateway;
use store::{Store, StoreTx};

impl<S, G> CheckoutService<S, G>
where
    S: Store,
    G: PaymentGateway,
{
    /// Cancels a non-finalized order and restores its reserved stock.
    ///
    /// Mirror of the reservation made at placement: each line credits
    /// back exactly the quantity it decremented, regardless of any
    /// interim stock changes for the product. Only orders still in
    /// placed or confirmed state can be cancelled; once fulfillment has
    /// started the compensator refuses.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: OrderId, user_id: UserId) -> Result<()> {
        let mut tx = self.store.begin().await?;

        let order = tx
            .order_for_user(order_id, user_id)
            .await?
            .ok_or(CheckoutError::OrderNotFound(order_id))?;

        if !order.status.can_cancel() {
            return Err(CheckoutError::InvalidState {
                order_id,
                status: order.status,
            });
        }

        let lines = tx.order_lines(order_id).await?;
        for line in &lines {
            // Restoration is unconditional: what the reservation took is
            // what comes back, even if an admin edited stock in between.
            // A deactivated product still gets its units back; flag it
            // so the conflict is visible in the logs.
            if let Some(product) = tx.product_for_update(line.product_id).await?
                && !product.active
            {
                tracing::warn!(
                    %order_id,
                    product_id = %line.product_id,
                    quantity = line.quantity,
                    "restoring stock to a deactivated product"
                );
            }
            tx.restore_stock(line.product_id, line.quantity).await?;
        }

        tx.mark_cancelled(order_id).await?;
        tx.commit().await?;

        metrics::counter!("orders_cancelled_total").increment(1);
        tracing::info!(%order_id, lines = lines.len(), "order cancelled, stock restored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ProductId;
    use domain::{CartItem, Money, OrderStatus, Product};
    use store::MemoryStore;

    use crate::gateway::InMemoryGateway;

    const SECRET: &str = "test-gateway-secret";

    fn checkout(store: MemoryStore) -> CheckoutService<MemoryStore, InMemoryGateway> {
        CheckoutService::new(store, InMemoryGateway::new(), SECRET, "INR")
    }

    async fn seed_and_place(store: &MemoryStore, stock: u32, quantity: u32) -> OrderId {
        store
            .insert_product(&Product {
                id: ProductId::new(7),
                name: "Widget".to_string(),
                price: Money::from_cents(6000),
                stock,
                active: true,
            })
            .await
            .unwrap();

        let checkout = checkout(store.clone());
        let placed = checkout
            .place_order(
                UserId::new(1),
                &[CartItem {
                    product_id: ProductId::new(7),
                    quantity,
                }],
                "221B Baker Street, London",
                "+442071234567",
            )
            .await
            .unwrap();
        placed.order_id
    }

    #[tokio::test]
    async fn test_cancel_restores_stock() {
        let store = MemoryStore::new();
        let order_id = seed_and_place(&store, 5, 3).await;
        assert_eq!(
            store.product(ProductId::new(7)).await.unwrap().unwrap().stock,
            2
        );

        checkout(store.clone())
            .cancel_order(order_id, UserId::new(1))
            .await
            .unwrap();

        let product = store.product(ProductId::new(7)).await.unwrap().unwrap();
        assert_eq!(product.stock, 5);
        let (order, _) = store.order(order_id, UserId::new(1)).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_unknown_order() {
        let store = MemoryStore::new();
        let result = checkout(store)
            .cancel_order(OrderId::new(), UserId::new(1))
            .await;
        assert!(matches!(result, Err(CheckoutError::OrderNotFound(_))));
    }

    #[tokio::test]
    async fn test_cancel_is_owner_scoped() {
        let store = MemoryStore::new();
        let order_id = seed_and_place(&store, 5, 3).await;

        let result = checkout(store.clone())
            .cancel_order(order_id, UserId::new(2))
            .await;

        assert!(matches!(result, Err(CheckoutError::OrderNotFound(_))));
        assert_eq!(
            store.product(ProductId::new(7)).await.unwrap().unwrap().stock,
            2
        );
    }

    #[tokio::test]
    async fn test_cancel_refused_once_fulfillment_started() {
        let store = MemoryStore::new();
        let order_id = seed_and_place(&store, 5, 3).await;

        // Fulfillment moves the order along; simulate via direct edit.
        {
            let (mut order, lines) =
                store.order(order_id, UserId::new(1)).await.unwrap().unwrap();
            order.status = OrderStatus::Processing;
            let mut tx = store.begin().await.unwrap();
            tx.insert_order(&order).await.unwrap();
            tx.insert_lines(order_id, &lines).await.unwrap();
            tx.commit().await.unwrap();
        }

        let result = checkout(store.clone())
            .cancel_order(order_id, UserId::new(1))
            .await;

        assert!(matches!(
            result,
            Err(CheckoutError::InvalidState {
                status: OrderStatus::Processing,
                ..
            })
        ));
        // Stock stays reserved.
        assert_eq!(
            store.product(ProductId::new(7)).await.unwrap().unwrap().stock,
            2
        );
    }

    #[tokio::test]
    async fn test_cancel_twice_fails_second_time() {
        let store = MemoryStore::new();
        let order_id = seed_and_place(&store, 5, 3).await;
        let checkout = checkout(store.clone());

        checkout.cancel_order(order_id, UserId::new(1)).await.unwrap();
        let result = checkout.cancel_order(order_id, UserId::new(1)).await;

        assert!(matches!(
            result,
            Err(CheckoutError::InvalidState {
                status: OrderStatus::Cancelled,
                ..
            })
        ));
        // Stock is restored exactly once.
        assert_eq!(
            store.product(ProductId::new(7)).await.unwrap().unwrap().stock,
            5
        );
    }

    #[tokio::test]
    async fn test_restoration_ignores_interim_admin_edits() {
        let store = MemoryStore::new();
        let order_id = seed_and_place(&store, 5, 3).await;

        // Admin restock while the order is open.
        store
            .insert_product(&Product {
                id: ProductId::new(7),
                name: "Widget".to_string(),
                price: Money::from_cents(6000),
                stock: 10,
                active: true,
            })
            .await
            .unwrap();

        checkout(store.clone())
            .cancel_order(order_id, UserId::new(1))
            .await
            .unwrap();

        // The reserved 3 come back on top of whatever the admin set.
        assert_eq!(
            store.product(ProductId::new(7)).await.unwrap().unwrap().stock,
            13
        );
    }
}
