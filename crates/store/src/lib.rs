//! Storage layer for the order transaction core.
//!
//! Exposes a transaction-shaped [`Store`]/[`StoreTx`] seam with two
//! backends: [`PgStore`] over PostgreSQL (sqlx) and [`MemoryStore`]
//! for tests.

mod error;
mod memory;
mod postgres;
mod store;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use postgres::{PgStore, PgStoreTx};
pub use store::{Store, StoreTx};
