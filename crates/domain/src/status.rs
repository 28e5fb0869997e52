//! Payment and order status machines.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when parsing a status string from storage.
#[derive(Debug, Error)]
#[error("unknown {kind} status: {value}")]
pub struct StatusParseError {
    pub kind: &'static str,
    pub value: String,
}

/// Payment lifecycle of an order.
///
/// Transitions: `Pending → {Completed, Failed}`. A completed payment is
/// terminal; it is never overwritten, not even by the gateway callback
/// that produced it (a repeat callback is an idempotent no-op).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    /// Returns true once the payment has reached a non-pending state.
    pub fn is_settled(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }

    /// Returns the status name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "completed" => Ok(PaymentStatus::Completed),
            "failed" => Ok(PaymentStatus::Failed),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(StatusParseError {
                kind: "payment",
                value: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fulfillment lifecycle of an order.
///
/// State transitions:
/// ```text
/// Placed ──► Confirmed ──► Processing ──► Shipped ──► Delivered
///    │           │
///    └───────────┴──► Cancelled
/// ```
///
/// Once an order is processing, cancellation is no longer permitted
/// through the compensator; fulfillment owns the later transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Placed,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Returns true if the order can still be cancelled by its owner.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Placed | OrderStatus::Confirmed)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Returns the status name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Placed => "placed",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "placed" => Ok(OrderStatus::Placed),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(StatusParseError {
                kind: "order",
                value: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
