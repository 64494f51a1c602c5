//! Sales Transaction Model

use serde::{Deserialize, Serialize};

/// Payment method
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Transfer,
    Qris,
    /// Paid later; creates a customer debt
    Credit,
}

impl PaymentMethod {
    pub fn is_credit(&self) -> bool {
        matches!(self, PaymentMethod::Credit)
    }
}

/// One sold line inside a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionItem {
    pub product_id: i64,
    pub name: String,
    pub price: f64,
    pub quantity: i64,
    /// price × quantity
    pub subtotal: f64,
    pub discount: f64,
    /// subtotal − discount
    pub total: f64,
}

/// Completed sale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub items: Vec<TransactionItem>,
    pub subtotal: f64,
    pub discount: f64,
    pub total: f64,
    pub payment_method: PaymentMethod,
    pub customer_name: Option<String>,
    #[serde(default)]
    pub is_voided: bool,
    pub created_at: i64,
}

/// Create transaction payload (produced by checkout)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionCreate {
    pub items: Vec<TransactionItem>,
    pub subtotal: f64,
    pub discount: f64,
    pub total: f64,
    pub payment_method: PaymentMethod,
    pub customer_name: Option<String>,
}
