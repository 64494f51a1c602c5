//! Customer and Debt Models

use super::transaction::PaymentMethod;
use serde::{Deserialize, Serialize};

/// Customer entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: i64,
}

/// Debt lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DebtStatus {
    Pending,
    Partial,
    Paid,
    Overdue,
}

/// A payment made against a debt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtPayment {
    pub date: i64,
    pub amount: f64,
    #[serde(default)]
    pub method: PaymentMethod,
    #[serde(default)]
    pub notes: String,
}

/// Customer debt (created by credit sales or manually)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Debt {
    pub id: i64,
    pub customer_id: i64,
    pub customer_name: String,
    pub transaction_id: Option<i64>,
    pub amount: f64,
    pub paid: f64,
    /// max(0, amount − paid)
    pub remaining: f64,
    /// Due date (Unix millis)
    pub due_date: i64,
    pub status: DebtStatus,
    #[serde(default)]
    pub payments: Vec<DebtPayment>,
    #[serde(default)]
    pub notes: String,
    pub created_at: i64,
}

/// Create debt payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtCreate {
    pub customer_id: i64,
    pub customer_name: String,
    pub transaction_id: Option<i64>,
    pub amount: f64,
    pub due_date: i64,
    #[serde(default)]
    pub notes: String,
}
