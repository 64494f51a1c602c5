//! In-memory stores
//!
//! Used by tests and by the demo binary when no backend is configured.
//! Each store keeps its records behind a `parking_lot::RwLock`; no lock is
//! held across an `.await`.

use async_trait::async_trait;
use parking_lot::RwLock;
use shared::models::{
    Customer, Debt, DebtCreate, DebtStatus, DiscountRule, Expense, Product, ProductCreate,
    Transaction, TransactionCreate,
};
use shared::util::snowflake_id;
use std::collections::HashMap;
use std::sync::Arc;

use super::{
    CatalogStore, CustomerStore, ExpenseStore, OrderStore, Resource, StoreError, StoreResult,
};
use crate::utils::clock::{Clock, system_clock};

// =============================================================================
// Catalog
// =============================================================================

#[derive(Default)]
pub struct MemoryCatalog {
    products: RwLock<HashMap<i64, Product>>,
    rules: RwLock<Vec<DiscountRule>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_product(&self, product: Product) {
        self.products.write().insert(product.id, product);
    }

    pub fn create_product(&self, data: ProductCreate, created_at: i64) -> Product {
        let product = Product {
            id: snowflake_id(),
            name: data.name,
            price: data.price,
            stock: data.stock,
            category: data.category,
            barcode: data.barcode,
            created_at,
        };
        self.insert_product(product.clone());
        product
    }

    /// Store a rule after validating it. Rules keep insertion order.
    pub fn insert_rule(&self, rule: DiscountRule) -> Result<(), shared::AppError> {
        rule.validate()?;
        let mut rules = self.rules.write();
        match rules.iter_mut().find(|r| r.id == rule.id) {
            Some(existing) => *existing = rule,
            None => rules.push(rule),
        }
        Ok(())
    }

    pub fn stock_of(&self, id: i64) -> Option<i64> {
        self.products.read().get(&id).map(|p| p.stock)
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn get_product(&self, id: i64) -> StoreResult<Product> {
        self.products
            .read()
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound {
                resource: Resource::Product,
                id,
            })
    }

    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        let mut products: Vec<Product> = self.products.read().values().cloned().collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    async fn list_active_discount_rules(&self, now: i64) -> StoreResult<Vec<DiscountRule>> {
        Ok(self
            .rules
            .read()
            .iter()
            .filter(|r| r.is_in_force(now))
            .cloned()
            .collect())
    }

    async fn adjust_stock(&self, id: i64, delta: i64) -> StoreResult<i64> {
        let mut products = self.products.write();
        let product = products
            .get_mut(&id)
            .ok_or(StoreError::NotFound {
                resource: Resource::Product,
                id,
            })?;

        let next = product.stock + delta;
        if next < 0 {
            return Err(StoreError::InsufficientStock {
                product_id: id,
                available: product.stock,
                requested: -delta,
            });
        }
        product.stock = next;
        Ok(next)
    }
}

// =============================================================================
// Orders
// =============================================================================

pub struct MemoryOrders {
    transactions: RwLock<HashMap<i64, Transaction>>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryOrders {
    fn default() -> Self {
        Self::with_clock(system_clock())
    }
}

impl MemoryOrders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            transactions: RwLock::new(HashMap::new()),
            clock,
        }
    }

    pub fn insert(&self, tx: Transaction) {
        self.transactions.write().insert(tx.id, tx);
    }

    pub fn get(&self, id: i64) -> Option<Transaction> {
        self.transactions.read().get(&id).cloned()
    }

    /// Every stored transaction including voided ones
    pub fn all(&self) -> Vec<Transaction> {
        let mut all: Vec<Transaction> = self.transactions.read().values().cloned().collect();
        all.sort_by_key(|t| t.created_at);
        all
    }
}

#[async_trait]
impl OrderStore for MemoryOrders {
    async fn create_transaction(&self, data: TransactionCreate) -> StoreResult<Transaction> {
        let tx = Transaction {
            id: snowflake_id(),
            items: data.items,
            subtotal: data.subtotal,
            discount: data.discount,
            total: data.total,
            payment_method: data.payment_method,
            customer_name: data.customer_name,
            is_voided: false,
            created_at: self.clock.now_millis(),
        };
        self.insert(tx.clone());
        Ok(tx)
    }

    async fn void_transaction(&self, id: i64) -> StoreResult<()> {
        let mut transactions = self.transactions.write();
        let tx = transactions
            .get_mut(&id)
            .ok_or(StoreError::NotFound {
                resource: Resource::Transaction,
                id,
            })?;
        if tx.is_voided {
            return Err(StoreError::AlreadyVoided(id));
        }
        tx.is_voided = true;
        Ok(())
    }

    async fn list_transactions(&self, from: i64, to: i64) -> StoreResult<Vec<Transaction>> {
        Ok(self
            .all()
            .into_iter()
            .filter(|t| !t.is_voided && t.created_at >= from && t.created_at < to)
            .collect())
    }
}

// =============================================================================
// Customers & debts
// =============================================================================

pub struct MemoryCustomers {
    customers: RwLock<Vec<Customer>>,
    debts: RwLock<HashMap<i64, Debt>>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryCustomers {
    fn default() -> Self {
        Self::with_clock(system_clock())
    }
}

impl MemoryCustomers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            customers: RwLock::new(Vec::new()),
            debts: RwLock::new(HashMap::new()),
            clock,
        }
    }

    pub fn customers(&self) -> Vec<Customer> {
        self.customers.read().clone()
    }

    pub fn insert_debt(&self, debt: Debt) {
        self.debts.write().insert(debt.id, debt);
    }
}

#[async_trait]
impl CustomerStore for MemoryCustomers {
    async fn find_customer_by_name(&self, name: &str) -> StoreResult<Option<Customer>> {
        let needle = name.trim().to_lowercase();
        Ok(self
            .customers
            .read()
            .iter()
            .find(|c| c.name.trim().to_lowercase() == needle)
            .cloned())
    }

    async fn create_customer(&self, name: &str) -> StoreResult<Customer> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::Invalid("customer name is empty".to_string()));
        }
        let customer = Customer {
            id: snowflake_id(),
            name: name.to_string(),
            phone: None,
            address: None,
            created_at: self.clock.now_millis(),
        };
        self.customers.write().push(customer.clone());
        Ok(customer)
    }

    async fn get_customer(&self, id: i64) -> StoreResult<Customer> {
        self.customers
            .read()
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or(StoreError::NotFound {
                resource: Resource::Customer,
                id,
            })
    }

    async fn create_debt(&self, data: DebtCreate) -> StoreResult<Debt> {
        if !data.amount.is_finite() || data.amount <= 0.0 {
            return Err(StoreError::Invalid(format!(
                "debt amount must be positive, got {}",
                data.amount
            )));
        }
        let debt = Debt {
            id: snowflake_id(),
            customer_id: data.customer_id,
            customer_name: data.customer_name,
            transaction_id: data.transaction_id,
            amount: data.amount,
            paid: 0.0,
            remaining: data.amount,
            due_date: data.due_date,
            status: DebtStatus::Pending,
            payments: Vec::new(),
            notes: data.notes,
            created_at: self.clock.now_millis(),
        };
        self.insert_debt(debt.clone());
        Ok(debt)
    }

    async fn get_debt(&self, id: i64) -> StoreResult<Debt> {
        self.debts
            .read()
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound {
                resource: Resource::Debt,
                id,
            })
    }

    async fn update_debt(&self, debt: &Debt) -> StoreResult<()> {
        let mut debts = self.debts.write();
        match debts.get_mut(&debt.id) {
            Some(existing) => {
                *existing = debt.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound {
                resource: Resource::Debt,
                id: debt.id,
            }),
        }
    }

    async fn list_debts(&self) -> StoreResult<Vec<Debt>> {
        let mut debts: Vec<Debt> = self.debts.read().values().cloned().collect();
        debts.sort_by_key(|d| d.created_at);
        Ok(debts)
    }
}

// =============================================================================
// Expenses
// =============================================================================

#[derive(Default)]
pub struct MemoryExpenses {
    expenses: RwLock<Vec<Expense>>,
}

impl MemoryExpenses {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExpenseStore for MemoryExpenses {
    async fn create_expense(&self, expense: Expense) -> StoreResult<Expense> {
        if !expense.amount.is_finite() || expense.amount < 0.0 {
            return Err(StoreError::Invalid(format!(
                "expense amount must be non-negative, got {}",
                expense.amount
            )));
        }
        self.expenses.write().push(expense.clone());
        Ok(expense)
    }

    async fn list_expenses(&self, from: i64, to: i64) -> StoreResult<Vec<Expense>> {
        Ok(self
            .expenses
            .read()
            .iter()
            .filter(|e| e.date >= from && e.date < to)
            .cloned()
            .collect())
    }
}
