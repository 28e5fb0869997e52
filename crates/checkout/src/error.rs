//! Checkout error types.

use common::{OrderId, ProductId};
use domain::OrderStatus;
use store::StoreError;
use thiserror::Error;

/// Errors surfaced by the order transaction core.
///
/// All variants are recoverable from the caller's perspective; any
/// error raised inside a transactional step rolls the whole transaction
/// back before it surfaces, so no partial state is ever visible.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// A cart line references a product that is missing or inactive.
    #[error("Product {0} not found")]
    ProductNotFound(ProductId),

    /// A cart line asks for more units than are in stock. Retrying
    /// re-reads current stock; nothing was committed.
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// The payment gateway failed or timed out while creating the
    /// intent. The reserved stock and the order were rolled back.
    #[error("Payment gateway unavailable: {0}")]
    GatewayUnavailable(String),

    /// The callback signature did not match. No database change is
    /// made: a bad callback may be attacker noise, not a failed payment.
    #[error("Invalid payment callback signature")]
    InvalidSignature,

    /// No order matched the given ID and owner.
    #[error("Order {0} not found")]
    OrderNotFound(OrderId),

    /// The order is past the point where the operation is allowed.
    #[error("Order {order_id} cannot be cancelled in state {status}")]
    InvalidState {
        order_id: OrderId,
        status: OrderStatus,
    },

    /// A storage failure. The caller may retry the whole operation;
    /// nothing was committed.
    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),
}

/// Result type for checkout operations.
pub type Result<T> = std::result::Result<T, CheckoutError>;
