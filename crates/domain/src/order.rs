use chrono::{DateTime, Utc};
use common::{OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::{Money, OrderStatus, PaymentStatus};

/// A cart entry as submitted by the client.
///
/// Shape validation (positive quantity, well-formed ID) happens at the
/// request boundary; the core re-validates existence and stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// One line of an order, with the unit price frozen at order time.
///
/// The frozen price is deliberate denormalization: later product price
/// changes must not alter historical order totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderLine {
    /// Returns the total for this line (quantity × frozen unit price).
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// An order header.
///
/// Created once by the coordinator; the payment fields are mutated only
/// by the payment verifier, and `status` moves to cancelled only
/// through the compensator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    /// Sum of line totals, computed server-side at creation.
    pub total: Money,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub delivery_address: String,
    pub phone: String,
    /// Gateway payment reference, set when payment completes.
    pub payment_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Creates a freshly placed order awaiting payment.
    pub fn place(
        id: OrderId,
        user_id: UserId,
        total: Money,
        delivery_address: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            total,
            payment_status: PaymentStatus::Pending,
            status: OrderStatus::Placed,
            delivery_address: delivery_address.into(),
            phone: phone.into(),
            payment_ref: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Computes the order total from its lines.
pub fn order_total(lines: &[OrderLine]) -> Money {
    lines.iter().map(OrderLine::line_total).sum()
}
