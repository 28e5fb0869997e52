//! Storage traits for the order transaction core.
//!
//! The seam is transaction-shaped: the coordinator and compensator open
//! a [`StoreTx`], perform their dependent steps against it, and commit
//! only once everything (including the external gateway call) has
//! succeeded. Dropping a transaction without committing rolls it back,
//! so every early-return error path leaves no partial state behind.

use async_trait::async_trait;
use common::{OrderId, ProductId, UserId};
use domain::{Order, OrderLine, Product};

use crate::Result;

/// Backend-agnostic handle to the order store.
#[async_trait]
pub trait Store: Send + Sync {
    /// Opens a transaction covering orders, order lines, and stock.
    async fn begin(&self) -> Result<Box<dyn StoreTx>>;

    /// Atomically finalizes payment for an order owned by `user_id`.
    ///
    /// Sets `payment_status = completed`, records the gateway payment
    /// reference, and advances the order to confirmed — all in one
    /// predicated update so that ownership and current status are
    /// checked in the same statement that mutates the row. Only orders
    /// still in placed or confirmed state match; a cancelled order is
    /// never revived by a late callback. Returns false when no row
    /// matched.
    ///
    /// Idempotent: a repeat call with the same payment reference
    /// matches the already-completed row and rewrites identical values.
    async fn confirm_payment(
        &self,
        order_id: OrderId,
        user_id: UserId,
        payment_ref: &str,
    ) -> Result<bool>;

    /// Inserts a catalog product. Used by seeding and tests; catalog
    /// management itself lives outside this core.
    async fn insert_product(&self, product: &Product) -> Result<()>;

    /// Reads a product without locking it.
    async fn product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Reads an order with its lines, scoped to the owning user.
    async fn order(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<Option<(Order, Vec<OrderLine>)>>;
}

/// A single atomic unit of work against the store.
///
/// Implementations must roll back all changes if the transaction is
/// dropped without [`StoreTx::commit`] being called.
#[async_trait]
pub trait StoreTx: Send {
    /// Reads a product row, taking a row-level lock where the backend
    /// supports one, so concurrent placements serialize per product.
    async fn product_for_update(&mut self, id: ProductId) -> Result<Option<Product>>;

    /// Inserts a new order header.
    async fn insert_order(&mut self, order: &Order) -> Result<()>;

    /// Inserts the order's lines, preserving their submitted order.
    async fn insert_lines(&mut self, order_id: OrderId, lines: &[OrderLine]) -> Result<()>;

    /// Decrements a product's stock by `quantity`, conditioned on
    /// `stock >= quantity`. Returns false (and changes nothing) when
    /// stock is insufficient.
    async fn reserve_stock(&mut self, id: ProductId, quantity: u32) -> Result<bool>;

    /// Increments a product's stock by `quantity`, unconditionally.
    /// Mirror of [`StoreTx::reserve_stock`] for cancellation.
    async fn restore_stock(&mut self, id: ProductId, quantity: u32) -> Result<()>;

    /// Reads an order header scoped to the owning user, locking it
    /// where the backend supports row locks.
    async fn order_for_user(&mut self, order_id: OrderId, user_id: UserId)
    -> Result<Option<Order>>;

    /// Reads all lines of an order.
    async fn order_lines(&mut self, order_id: OrderId) -> Result<Vec<OrderLine>>;

    /// Marks an order cancelled.
    async fn mark_cancelled(&mut self, order_id: OrderId) -> Result<()>;

    /// Commits the transaction, making all changes visible.
    async fn commit(self: Box<Self>) -> Result<()>;
}
