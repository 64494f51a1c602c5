//! Product Model

use serde::{Deserialize, Serialize};

/// Stock level below which a product counts as low stock
pub const LOW_STOCK_THRESHOLD: i64 = 10;

/// Product entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    /// Unit selling price
    pub price: f64,
    /// Units currently available
    pub stock: i64,
    /// Category name (e.g. "Buah Lokal")
    pub category: String,
    pub barcode: Option<String>,
    pub created_at: i64,
}

impl Product {
    pub fn is_low_stock(&self) -> bool {
        self.stock < LOW_STOCK_THRESHOLD
    }
}

/// Create product payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCreate {
    pub name: String,
    pub price: f64,
    pub stock: i64,
    pub category: String,
    pub barcode: Option<String>,
}
