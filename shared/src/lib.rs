//! Shared types for the TokoKu POS core
//!
//! Data models, the unified error system and small utilities used by the
//! edge service and by anything that consumes its records.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use error::{AppError, AppResult, ErrorCategory, ErrorCode};
pub use serde::{Deserialize, Serialize};
