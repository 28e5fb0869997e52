use common::ProductId;
use serde::{Deserialize, Serialize};

use crate::Money;

/// A catalog product with its live stock counter.
///
/// Stock is mutated only through the store's atomic conditional
/// updates, never by rewriting the whole row. Products are deactivated
/// instead of deleted so that historical order lines keep a valid
/// reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Current unit price. Order lines freeze their own copy.
    pub price: Money,
    pub stock: u32,
    pub active: bool,
}

impl Product {
    /// Returns true if this product can be sold at all.
    pub fn is_orderable(&self) -> bool {
        self.active
    }

    /// Returns true if the requested quantity can be reserved.
    pub fn has_stock_for(&self, quantity: u32) -> bool {
        self.stock >= quantity
    }
}
