//! Discount Pricing Module
//!
//! Pure per-line discount computation over a cart and a rule set.
//! Rules are matched by scope and active window, never stacked.

mod calculator;
mod engine;
pub mod matcher;

pub use calculator::*;
pub use engine::*;
pub use matcher::*;
