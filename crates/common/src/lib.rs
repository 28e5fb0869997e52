//! Shared identifier types used across the order transaction core.

mod types;

pub use types::{OrderId, ProductId, UserId};
