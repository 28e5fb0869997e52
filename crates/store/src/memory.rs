use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{OrderId, ProductId, UserId};
use domain::{Order, OrderLine, OrderStatus, PaymentStatus, Product};
use tokio::sync::RwLock;

use crate::{
    Result,
    store::{Store, StoreTx},
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    products: HashMap<ProductId, Product>,
    orders: HashMap<OrderId, Order>,
    lines: HashMap<OrderId, Vec<OrderLine>>,
}

/// In-memory order store for testing.
///
/// Provides the same interface as the PostgreSQL implementation. A
/// transaction stages a copy of the whole state and swaps it back on
/// commit, so dropping the transaction discards every change — the
/// same all-or-nothing behavior the coordinator relies on.
///
/// Commit is last-writer-wins over the whole snapshot: anything
/// another writer committed between `begin` and `commit` is lost.
/// Fine for the sequential test flows this backend exists for; use
/// [`crate::PgStore`] wherever transactions actually interleave.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>> {
        let staged = self.state.read().await.clone();
        Ok(Box::new(MemoryStoreTx {
            shared: self.state.clone(),
            staged,
        }))
    }

    async fn confirm_payment(
        &self,
        order_id: OrderId,
        user_id: UserId,
        payment_ref: &str,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        let Some(order) = state.orders.get_mut(&order_id) else {
            return Ok(false);
        };
        if order.user_id != user_id {
            return Ok(false);
        }

        // Same predicate as the SQL update: the order must still be
        // placed or confirmed (a cancelled order never comes back), and
        // pending rows match while a completed row matches only with
        // the identical payment ref.
        let status_allows = matches!(
            order.status,
            OrderStatus::Placed | OrderStatus::Confirmed
        );
        let payment_allows = order.payment_status == PaymentStatus::Pending
            || (order.payment_status == PaymentStatus::Completed
                && order.payment_ref.as_deref() == Some(payment_ref));
        if !status_allows || !payment_allows {
            return Ok(false);
        }

        order.payment_status = PaymentStatus::Completed;
        order.status = OrderStatus::Confirmed;
        order.payment_ref = Some(payment_ref.to_string());
        order.updated_at = Utc::now();
        Ok(true)
    }

    async fn insert_product(&self, product: &Product) -> Result<()> {
        self.state
            .write()
            .await
            .products
            .insert(product.id, product.clone());
        Ok(())
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.state.read().await.products.get(&id).cloned())
    }

    async fn order(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<Option<(Order, Vec<OrderLine>)>> {
        let state = self.state.read().await;
        let order = state
            .orders
            .get(&order_id)
            .filter(|o| o.user_id == user_id)
            .cloned();
        Ok(order.map(|o| {
            let lines = state.lines.get(&order_id).cloned().unwrap_or_default();
            (o, lines)
        }))
    }
}

struct MemoryStoreTx {
    shared: Arc<RwLock<MemoryState>>,
    staged: MemoryState,
}

#[async_trait]
impl StoreTx for MemoryStoreTx {
    async fn product_for_update(&mut self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.staged.products.get(&id).cloned())
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        self.staged.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn insert_lines(&mut self, order_id: OrderId, lines: &[OrderLine]) -> Result<()> {
        self.staged.lines.insert(order_id, lines.to_vec());
        Ok(())
    }

    async fn reserve_stock(&mut self, id: ProductId, quantity: u32) -> Result<bool> {
        let Some(product) = self.staged.products.get_mut(&id) else {
            return Ok(false);
        };
        if product.stock < quantity {
            return Ok(false);
        }
        product.stock -= quantity;
        Ok(true)
    }

    async fn restore_stock(&mut self, id: ProductId, quantity: u32) -> Result<()> {
        if let Some(product) = self.staged.products.get_mut(&id) {
            product.stock += quantity;
        }
        Ok(())
    }

    async fn order_for_user(
        &mut self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<Option<Order>> {
        Ok(self
            .staged
            .orders
            .get(&order_id)
            .filter(|o| o.user_id == user_id)
            .cloned())
    }

    async fn order_lines(&mut self, order_id: OrderId) -> Result<Vec<OrderLine>> {
        Ok(self.staged.lines.get(&order_id).cloned().unwrap_or_default())
    }

    async fn mark_cancelled(&mut self, order_id: OrderId) -> Result<()> {
        if let Some(order) = self.staged.orders.get_mut(&order_id) {
            order.status = OrderStatus::Cancelled;
            order.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> Result<()> {
        *self.shared.write().await = std::mem::take(&mut self.staged);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::Money;

    fn widget(stock: u32) -> Product {
        Product {
            id: ProductId::new(7),
            name: "Widget".to_string(),
            price: Money::from_cents(6000),
            stock,
            active: true,
        }
    }

    #[tokio::test]
    async fn dropped_transaction_discards_changes() {
        let store = MemoryStore::new();
        store.insert_product(&widget(5)).await.unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            assert!(tx.reserve_stock(ProductId::new(7), 3).await.unwrap());
            // dropped without commit
        }

        let product = store.product(ProductId::new(7)).await.unwrap().unwrap();
        assert_eq!(product.stock, 5);
    }

    #[tokio::test]
    async fn committed_transaction_applies_changes() {
        let store = MemoryStore::new();
        store.insert_product(&widget(5)).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert!(tx.reserve_stock(ProductId::new(7), 3).await.unwrap());
        tx.commit().await.unwrap();

        let product = store.product(ProductId::new(7)).await.unwrap().unwrap();
        assert_eq!(product.stock, 2);
    }

    #[tokio::test]
    async fn reserve_fails_without_mutation_when_stock_short() {
        let store = MemoryStore::new();
        store.insert_product(&widget(2)).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert!(!tx.reserve_stock(ProductId::new(7), 3).await.unwrap());
        tx.commit().await.unwrap();

        let product = store.product(ProductId::new(7)).await.unwrap().unwrap();
        assert_eq!(product.stock, 2);
    }

    #[tokio::test]
    async fn confirm_payment_is_idempotent() {
        let store = MemoryStore::new();
        let order = Order::place(
            OrderId::new(),
            UserId::new(1),
            Money::from_cents(18000),
            "221B Baker Street, London",
            "+442071234567",
        );
        let mut tx = store.begin().await.unwrap();
        tx.insert_order(&order).await.unwrap();
        tx.commit().await.unwrap();

        assert!(store
            .confirm_payment(order.id, UserId::new(1), "pay_001")
            .await
            .unwrap());
        assert!(store
            .confirm_payment(order.id, UserId::new(1), "pay_001")
            .await
            .unwrap());
        // A different reference must not overwrite a completed payment.
        assert!(!store
            .confirm_payment(order.id, UserId::new(1), "pay_002")
            .await
            .unwrap());

        let (stored, _) = store.order(order.id, UserId::new(1)).await.unwrap().unwrap();
        assert_eq!(stored.payment_status, PaymentStatus::Completed);
        assert_eq!(stored.status, OrderStatus::Confirmed);
        assert_eq!(stored.payment_ref.as_deref(), Some("pay_001"));
    }

    #[tokio::test]
    async fn confirm_payment_rejects_cancelled_order() {
        let store = MemoryStore::new();
        let order = Order::place(
            OrderId::new(),
            UserId::new(1),
            Money::from_cents(1000),
            "221B Baker Street, London",
            "+442071234567",
        );
        let mut tx = store.begin().await.unwrap();
        tx.insert_order(&order).await.unwrap();
        tx.mark_cancelled(order.id).await.unwrap();
        tx.commit().await.unwrap();

        assert!(!store
            .confirm_payment(order.id, UserId::new(1), "pay_001")
            .await
            .unwrap());

        let (stored, _) = store.order(order.id, UserId::new(1)).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Cancelled);
        assert_eq!(stored.payment_status, PaymentStatus::Pending);
        assert!(stored.payment_ref.is_none());
    }

    #[tokio::test]
    async fn confirm_payment_checks_ownership() {
        let store = MemoryStore::new();
        let order = Order::place(
            OrderId::new(),
            UserId::new(1),
            Money::from_cents(1000),
            "221B Baker Street, London",
            "+442071234567",
        );
        let mut tx = store.begin().await.unwrap();
        tx.insert_order(&order).await.unwrap();
        tx.commit().await.unwrap();

        assert!(!store
            .confirm_payment(order.id, UserId::new(2), "pay_001")
            .await
            .unwrap());
    }
}
