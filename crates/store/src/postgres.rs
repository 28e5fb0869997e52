use async_trait::async_trait;
use chrono::Utc;
use common::{OrderId, ProductId, UserId};
use domain::{Money, Order, OrderLine, Product};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Result,
    store::{Store, StoreTx},
};

/// PostgreSQL-backed order store.
///
/// Cross-row consistency comes from database transactions: product
/// reads take `FOR UPDATE` row locks and the stock decrement is
/// predicated on `stock >= quantity`, so two concurrent placements of
/// the same product serialize on its row and at most one wins the last
/// unit.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            stock: row.try_get::<i32, _>("stock")?.max(0) as u32,
            active: row.try_get("active")?,
        })
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: UserId::new(row.try_get("user_id")?),
            total: Money::from_cents(row.try_get("total_cents")?),
            payment_status: row.try_get::<String, _>("payment_status")?.parse()?,
            status: row.try_get::<String, _>("order_status")?.parse()?,
            delivery_address: row.try_get("delivery_address")?,
            phone: row.try_get("phone")?,
            payment_ref: row.try_get("payment_ref")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_line(row: PgRow) -> Result<OrderLine> {
        Ok(OrderLine {
            product_id: ProductId::new(row.try_get("product_id")?),
            quantity: row.try_get::<i32, _>("quantity")?.max(0) as u32,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
        })
    }
}

const ORDER_COLUMNS: &str = "id, user_id, total_cents, payment_status, order_status, \
     delivery_address, phone, payment_ref, created_at, updated_at";

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgStoreTx { tx }))
    }

    async fn confirm_payment(
        &self,
        order_id: OrderId,
        user_id: UserId,
        payment_ref: &str,
    ) -> Result<bool> {
        // Ownership and current status are part of the update predicate,
        // not a separate read, so concurrent callbacks cannot race a
        // check-then-act window. A completed order only matches when the
        // payment reference is the same, which makes repeats no-ops and
        // keeps a completed payment from ever being overwritten. The
        // order-status gate keeps a late callback from resurrecting a
        // cancelled order whose stock was already restored.
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET payment_status = 'completed',
                order_status = 'confirmed',
                payment_ref = $3,
                updated_at = $4
            WHERE id = $1
              AND user_id = $2
              AND order_status IN ('placed', 'confirmed')
              AND (payment_status = 'pending'
                   OR (payment_status = 'completed' AND payment_ref = $3))
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(user_id.as_i64())
        .bind(payment_ref)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn insert_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, price_cents, stock, active)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(product.id.as_i64())
        .bind(&product.name)
        .bind(product.price.cents())
        .bind(product.stock as i32)
        .bind(product.active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query("SELECT id, name, price_cents, stock, active FROM products WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn order(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<Option<(Order, Vec<OrderLine>)>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND user_id = $2"
        ))
        .bind(order_id.as_uuid())
        .bind(user_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let order = Self::row_to_order(row)?;

        let lines = sqlx::query(
            r#"
            SELECT product_id, quantity, unit_price_cents
            FROM order_items
            WHERE order_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Self::row_to_line)
        .collect::<Result<Vec<_>>>()?;

        Ok(Some((order, lines)))
    }
}

/// A transaction over the PostgreSQL store. Dropping it without
/// committing rolls back (sqlx transaction semantics).
pub struct PgStoreTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgStoreTx {
    async fn product_for_update(&mut self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            "SELECT id, name, price_cents, stock, active FROM products WHERE id = $1 FOR UPDATE",
        )
        .bind(id.as_i64())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(PgStore::row_to_product).transpose()
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders
                (id, user_id, total_cents, payment_status, order_status,
                 delivery_address, phone, payment_ref, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_i64())
        .bind(order.total.cents())
        .bind(order.payment_status.as_str())
        .bind(order.status.as_str())
        .bind(&order.delivery_address)
        .bind(&order.phone)
        .bind(order.payment_ref.as_deref())
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn insert_lines(&mut self, order_id: OrderId, lines: &[OrderLine]) -> Result<()> {
        for line in lines {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, product_id, quantity, unit_price_cents)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(order_id.as_uuid())
            .bind(line.product_id.as_i64())
            .bind(line.quantity as i32)
            .bind(line.unit_price.cents())
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    async fn reserve_stock(&mut self, id: ProductId, quantity: u32) -> Result<bool> {
        // Conditional decrement defends against lost updates even though
        // product_for_update already holds the row lock.
        let result = sqlx::query(
            "UPDATE products SET stock = stock - $2 WHERE id = $1 AND stock >= $2",
        )
        .bind(id.as_i64())
        .bind(quantity as i32)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn restore_stock(&mut self, id: ProductId, quantity: u32) -> Result<()> {
        sqlx::query("UPDATE products SET stock = stock + $2 WHERE id = $1")
            .bind(id.as_i64())
            .bind(quantity as i32)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn order_for_user(
        &mut self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<Option<Order>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND user_id = $2 FOR UPDATE"
        ))
        .bind(order_id.as_uuid())
        .bind(user_id.as_i64())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(PgStore::row_to_order).transpose()
    }

    async fn order_lines(&mut self, order_id: OrderId) -> Result<Vec<OrderLine>> {
        let rows = sqlx::query(
            r#"
            SELECT product_id, quantity, unit_price_cents
            FROM order_items
            WHERE order_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(PgStore::row_to_line).collect()
    }

    async fn mark_cancelled(&mut self, order_id: OrderId) -> Result<()> {
        sqlx::query("UPDATE orders SET order_status = 'cancelled', updated_at = $2 WHERE id = $1")
            .bind(order_id.as_uuid())
            .bind(Utc::now())
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
