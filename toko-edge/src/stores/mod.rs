//! Persistence collaborators
//!
//! The POS core never talks to a concrete database. Checkout, debts and
//! reports go through these traits; the local store, a hosted backend and
//! the in-memory stores in [`memory`] are interchangeable.

mod error;
pub mod memory;

pub use error::{Resource, StoreError, StoreResult};
pub use memory::{MemoryCatalog, MemoryCustomers, MemoryExpenses, MemoryOrders};

use async_trait::async_trait;
use shared::models::{
    Customer, Debt, DebtCreate, DiscountRule, Expense, Product, Transaction, TransactionCreate,
};

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn get_product(&self, id: i64) -> StoreResult<Product>;

    async fn list_products(&self) -> StoreResult<Vec<Product>>;

    /// Rules that are enabled and inside their window at `now`
    async fn list_active_discount_rules(&self, now: i64) -> StoreResult<Vec<DiscountRule>>;

    /// Add `delta` to a product's stock and return the new level.
    ///
    /// Fails with [`StoreError::InsufficientStock`] if the result would be
    /// negative; stock is unchanged in that case.
    async fn adjust_stock(&self, id: i64, delta: i64) -> StoreResult<i64>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn create_transaction(&self, data: TransactionCreate) -> StoreResult<Transaction>;

    /// Mark a transaction voided (used to undo a failed checkout)
    async fn void_transaction(&self, id: i64) -> StoreResult<()>;

    /// Non-voided transactions created in `[from, to)`
    async fn list_transactions(&self, from: i64, to: i64) -> StoreResult<Vec<Transaction>>;
}

#[async_trait]
pub trait CustomerStore: Send + Sync {
    /// Case-insensitive exact name lookup
    async fn find_customer_by_name(&self, name: &str) -> StoreResult<Option<Customer>>;

    async fn create_customer(&self, name: &str) -> StoreResult<Customer>;

    async fn get_customer(&self, id: i64) -> StoreResult<Customer>;

    async fn find_or_create_customer(&self, name: &str) -> StoreResult<Customer> {
        match self.find_customer_by_name(name).await? {
            Some(customer) => Ok(customer),
            None => self.create_customer(name).await,
        }
    }

    async fn create_debt(&self, data: DebtCreate) -> StoreResult<Debt>;

    async fn get_debt(&self, id: i64) -> StoreResult<Debt>;

    async fn update_debt(&self, debt: &Debt) -> StoreResult<()>;

    async fn list_debts(&self) -> StoreResult<Vec<Debt>>;
}

#[async_trait]
pub trait ExpenseStore: Send + Sync {
    async fn create_expense(&self, expense: Expense) -> StoreResult<Expense>;

    /// Expenses dated in `[from, to)`
    async fn list_expenses(&self, from: i64, to: i64) -> StoreResult<Vec<Expense>>;
}
