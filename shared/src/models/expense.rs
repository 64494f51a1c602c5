//! Expense Model

use super::transaction::PaymentMethod;
use serde::{Deserialize, Serialize};

/// Expense category
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    Operational,
    /// Stock purchases
    Inventory,
    Salary,
    /// Electricity, water
    Utilities,
    Rent,
    Maintenance,
    Marketing,
    #[default]
    Other,
}

/// Operating expense entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    /// Expense date (Unix millis)
    pub date: i64,
    pub description: String,
    pub amount: f64,
    #[serde(default)]
    pub category: ExpenseCategory,
    pub payment_method: Option<PaymentMethod>,
}
