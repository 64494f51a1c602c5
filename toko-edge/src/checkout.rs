//! Checkout
//!
//! Turns a cart into a stored transaction. The side effects (stock, the
//! transaction record, the customer debt) live in separate stores, so they
//! run as a sequence with compensation: when a later step fails, the earlier
//! ones are undone before the error is returned.
//!
//! 1. price the cart (no mutation)
//! 2. decrement stock line by line
//! 3. create the transaction
//! 4. credit sale: find-or-create the customer, record the debt
//! 5. offline: queue the new records for sync
//! 6. clear the cart
//!
//! Undo runs in reverse order: void the transaction, then restore stock.
//! A customer created in step 4 is kept when its debt fails. Customers are
//! reusable name records with no balance of their own, so the next credit
//! sale under that name finds it.

use serde::Serialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{Customer, Debt, DebtCreate, PaymentMethod, SyncOperation, Transaction};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::cart::{Cart, CartError, CheckoutOrder};
use crate::core::Config;
use crate::pricing::{DiscountEngine, PricedCart, TieBreak};
use crate::stores::{CatalogStore, CustomerStore, OrderStore, StoreError};
use crate::sync::{EnqueueReceipt, SyncQueue};
use crate::utils::clock::Clock;

/// Days until a credit sale is due
pub const DEFAULT_DEBT_DUE_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStage {
    ReserveStock,
    CreateTransaction,
    RecordDebt,
}

impl fmt::Display for CheckoutStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CheckoutStage::ReserveStock => "reserve_stock",
            CheckoutStage::CreateTransaction => "create_transaction",
            CheckoutStage::RecordDebt => "record_debt",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Cart(#[from] CartError),

    #[error("Failed to load discount rules: {0}")]
    Pricing(StoreError),

    /// A step failed and the earlier steps were rolled back
    #[error("Checkout failed at {stage}: {source}")]
    Aborted {
        stage: CheckoutStage,
        source: StoreError,
        /// Undo steps that themselves failed; non-zero means manual repair
        compensation_failures: usize,
    },
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::Cart(e) => e.into(),
            CheckoutError::Pricing(e) => e.into(),
            CheckoutError::Aborted {
                source: source @ StoreError::InsufficientStock { .. },
                ..
            } => source.into(),
            CheckoutError::Aborted {
                stage,
                source,
                compensation_failures,
            } => AppError::with_message(
                ErrorCode::CheckoutRolledBack,
                format!("Checkout failed at {stage}: {source}"),
            )
            .with_detail("stage", stage.to_string())
            .with_detail("compensation_failures", compensation_failures),
        }
    }
}

/// Result of a successful checkout
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutReceipt {
    pub transaction: Transaction,
    pub breakdown: PricedCart,
    /// Credit sales only
    pub customer: Option<Customer>,
    pub debt: Option<Debt>,
    /// Sync items queued because the device was offline
    pub queued: Vec<EnqueueReceipt>,
}

pub struct CheckoutService {
    catalog: Arc<dyn CatalogStore>,
    orders: Arc<dyn OrderStore>,
    customers: Arc<dyn CustomerStore>,
    engine: DiscountEngine,
    sync: Option<Arc<SyncQueue>>,
    clock: Arc<dyn Clock>,
    debt_due_days: i64,
}

impl CheckoutService {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        orders: Arc<dyn OrderStore>,
        customers: Arc<dyn CustomerStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            engine: DiscountEngine::new(catalog.clone(), TieBreak::default()),
            catalog,
            orders,
            customers,
            sync: None,
            clock,
            debt_due_days: DEFAULT_DEBT_DUE_DAYS,
        }
    }

    /// Queue records for sync when the queue reports offline
    pub fn with_sync(mut self, queue: Arc<SyncQueue>) -> Self {
        self.sync = Some(queue);
        self
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.engine = DiscountEngine::new(self.catalog.clone(), tie_break);
        self
    }

    pub fn with_debt_due_days(mut self, days: i64) -> Self {
        self.debt_due_days = days;
        self
    }

    /// Apply `DISCOUNT_TIE_BREAK` and `DEBT_DUE_DAYS`
    pub fn with_config(self, config: &Config) -> Self {
        self.with_tie_break(config.discount_tie_break)
            .with_debt_due_days(config.debt_due_days)
    }

    pub fn engine(&self) -> &DiscountEngine {
        &self.engine
    }

    pub fn debt_due_days(&self) -> i64 {
        self.debt_due_days
    }

    /// Price the cart against the rules in force now
    pub async fn quote(&self, cart: &Cart) -> Result<PricedCart, CheckoutError> {
        let now = self.clock.now_millis();
        let rules = self
            .engine
            .load_rules(now)
            .await
            .map_err(CheckoutError::Pricing)?;
        Ok(cart.price(&rules, now, self.engine.tie_break())?)
    }

    /// Check out the cart. On success the cart is empty; on any error it is
    /// left as it was.
    pub async fn checkout(
        &self,
        cart: &mut Cart,
        payment_method: PaymentMethod,
        customer_name: Option<&str>,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        let now = self.clock.now_millis();
        let rules = self
            .engine
            .load_rules(now)
            .await
            .map_err(CheckoutError::Pricing)?;
        let order = cart.prepare_checkout(
            &rules,
            now,
            self.engine.tie_break(),
            payment_method,
            customer_name,
        )?;

        let reserved = self.reserve_stock(&order).await?;

        let transaction = match self.orders.create_transaction(order.to_transaction()).await {
            Ok(tx) => tx,
            Err(e) => {
                let compensation_failures = self.restore_stock(&reserved).await;
                return Err(self.aborted(CheckoutStage::CreateTransaction, e, compensation_failures));
            }
        };

        let (customer, debt) = match order.customer_name.as_deref() {
            Some(name) if payment_method.is_credit() => {
                match self.record_debt(name, &transaction, now).await {
                    Ok((customer, debt)) => (Some(customer), Some(debt)),
                    Err(e) => {
                        // Undo in reverse: the transaction first, then the stock
                        let mut compensation_failures = 0;
                        if let Err(void_err) = self.orders.void_transaction(transaction.id).await {
                            tracing::error!(
                                transaction_id = transaction.id,
                                "Failed to void transaction during rollback: {void_err}"
                            );
                            compensation_failures += 1;
                        }
                        compensation_failures += self.restore_stock(&reserved).await;
                        return Err(self.aborted(CheckoutStage::RecordDebt, e, compensation_failures));
                    }
                }
            }
            _ => (None, None),
        };

        let queued = self.queue_offline(&transaction, debt.as_ref(), &reserved);

        cart.clear();
        tracing::info!(
            transaction_id = transaction.id,
            total = transaction.total,
            discount = transaction.discount,
            payment = ?payment_method,
            queued = queued.len(),
            "Checkout completed"
        );

        Ok(CheckoutReceipt {
            transaction,
            breakdown: order.priced,
            customer,
            debt,
            queued,
        })
    }

    /// Decrement stock per line. Returns `(product_id, quantity, new_level)`
    /// for each line taken.
    async fn reserve_stock(
        &self,
        order: &CheckoutOrder,
    ) -> Result<Vec<(i64, i64, i64)>, CheckoutError> {
        let mut reserved = Vec::with_capacity(order.priced.lines.len());

        for line in &order.priced.lines {
            match self.catalog.adjust_stock(line.product_id, -line.quantity).await {
                Ok(level) => reserved.push((line.product_id, line.quantity, level)),
                Err(e) => {
                    let compensation_failures = self.restore_stock(&reserved).await;
                    return Err(self.aborted(CheckoutStage::ReserveStock, e, compensation_failures));
                }
            }
        }

        Ok(reserved)
    }

    /// Put reserved stock back; returns how many lines could not be restored
    async fn restore_stock(&self, reserved: &[(i64, i64, i64)]) -> usize {
        let mut failures = 0;
        for &(product_id, quantity, _) in reserved.iter().rev() {
            if let Err(e) = self.catalog.adjust_stock(product_id, quantity).await {
                tracing::error!(product_id, quantity, "Failed to restore stock: {e}");
                failures += 1;
            }
        }
        failures
    }

    async fn record_debt(
        &self,
        customer_name: &str,
        transaction: &Transaction,
        now: i64,
    ) -> Result<(Customer, Debt), StoreError> {
        let customer = self.customers.find_or_create_customer(customer_name).await?;
        let debt = self
            .customers
            .create_debt(DebtCreate {
                customer_id: customer.id,
                customer_name: customer.name.clone(),
                transaction_id: Some(transaction.id),
                amount: transaction.total,
                due_date: shared::util::add_days(now, self.debt_due_days),
                notes: format!("Transaksi #{}", transaction.id),
            })
            .await?;

        tracing::info!(
            debt_id = debt.id,
            customer = %customer.name,
            amount = debt.amount,
            "Credit sale recorded as debt"
        );
        Ok((customer, debt))
    }

    fn queue_offline(
        &self,
        transaction: &Transaction,
        debt: Option<&Debt>,
        reserved: &[(i64, i64, i64)],
    ) -> Vec<EnqueueReceipt> {
        let Some(queue) = self.sync.as_ref().filter(|q| !q.is_online()) else {
            return Vec::new();
        };

        let mut queued = Vec::new();
        match serde_json::to_value(transaction) {
            Ok(payload) => queued.push(queue.enqueue(SyncOperation::Create, "transactions", payload)),
            Err(e) => tracing::error!("Failed to serialize transaction for sync: {e}"),
        }
        if let Some(debt) = debt {
            match serde_json::to_value(debt) {
                Ok(payload) => queued.push(queue.enqueue(SyncOperation::Create, "debts", payload)),
                Err(e) => tracing::error!("Failed to serialize debt for sync: {e}"),
            }
        }
        for &(product_id, _, stock) in reserved {
            queued.push(queue.enqueue(
                SyncOperation::Update,
                "products",
                serde_json::json!({ "id": product_id, "stock": stock }),
            ));
        }
        queued
    }

    fn aborted(
        &self,
        stage: CheckoutStage,
        source: StoreError,
        compensation_failures: usize,
    ) -> CheckoutError {
        if compensation_failures > 0 {
            tracing::error!(%stage, compensation_failures, "Checkout rollback incomplete: {source}");
        } else {
            tracing::warn!(%stage, "Checkout rolled back: {source}");
        }
        CheckoutError::Aborted {
            stage,
            source,
            compensation_failures,
        }
    }
}
