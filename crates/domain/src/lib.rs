//! Domain model for the order transaction core.
//!
//! Owns the `Product`, `Order`, and `OrderLine` records, the money
//! representation, and the payment/order status machines. Persistence
//! and orchestration live in the `store` and `checkout` crates.

mod money;
mod order;
mod product;
mod status;

pub use money::Money;
pub use order::{CartItem, Order, OrderLine, order_total};
pub use product::Product;
pub use status::{OrderStatus, PaymentStatus, StatusParseError};
