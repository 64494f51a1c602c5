//! Data models
//!
//! Records exchanged between the edge service, its stores and the remote
//! backend. All record IDs are `i64` snowflakes, timestamps are Unix millis
//! and money amounts are `f64` rounded to two decimals.

pub mod customer;
pub mod discount;
pub mod expense;
pub mod product;
pub mod sync;
pub mod transaction;

// Re-exports
pub use customer::*;
pub use discount::*;
pub use expense::*;
pub use product::*;
pub use sync::*;
pub use transaction::*;
