//! Customer debt ledger
//!
//! Credit sales become debts. Payments reduce `remaining`; status follows
//! from amount, paid and due date.

use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::models::{Debt, DebtPayment, DebtStatus, PaymentMethod};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

use crate::pricing::{to_decimal, to_f64};
use crate::stores::{CustomerStore, StoreError};
use crate::utils::clock::Clock;

#[derive(Debug, Error)]
pub enum DebtError {
    #[error("Payment amount must be positive, got {0}")]
    InvalidAmount(f64),

    #[error("Debt already paid: {0}")]
    AlreadyPaid(i64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<DebtError> for AppError {
    fn from(err: DebtError) -> Self {
        let message = err.to_string();
        match err {
            DebtError::InvalidAmount(amount) => {
                AppError::with_message(ErrorCode::DebtPaymentInvalid, message)
                    .with_detail("amount", amount)
            }
            DebtError::AlreadyPaid(id) => {
                AppError::with_message(ErrorCode::DebtAlreadyPaid, message)
                    .with_detail("debt_id", id)
            }
            DebtError::Store(e) => e.into(),
        }
    }
}

/// Payment recorded against a debt
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentInput {
    pub amount: f64,
    pub method: Option<PaymentMethod>,
    pub notes: Option<String>,
    /// Defaults to now
    pub date: Option<i64>,
}

/// Status implied by amounts and due date at `now`
pub fn derive_status(debt: &Debt, now: i64) -> DebtStatus {
    if debt.remaining <= 0.0 {
        DebtStatus::Paid
    } else if debt.due_date < now {
        DebtStatus::Overdue
    } else if debt.paid > 0.0 {
        DebtStatus::Partial
    } else {
        DebtStatus::Pending
    }
}

/// Apply a payment to a debt in place.
///
/// Overpayment is accepted; `remaining` never goes below zero.
pub fn apply_payment(debt: &mut Debt, payment: DebtPayment, now: i64) -> Result<(), DebtError> {
    if !payment.amount.is_finite() || payment.amount <= 0.0 {
        return Err(DebtError::InvalidAmount(payment.amount));
    }
    if debt.status == DebtStatus::Paid {
        return Err(DebtError::AlreadyPaid(debt.id));
    }

    let paid = to_decimal(debt.paid) + to_decimal(payment.amount);
    let remaining = (to_decimal(debt.amount) - paid).max(rust_decimal::Decimal::ZERO);

    debt.paid = to_f64(paid);
    debt.remaining = to_f64(remaining);
    debt.payments.push(payment);
    debt.status = derive_status(debt, now);
    Ok(())
}

/// Outstanding credit across all unpaid debts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutstandingSummary {
    pub total_outstanding: f64,
    /// Distinct customers with an unpaid debt
    pub debtor_count: usize,
    pub overdue_count: usize,
    pub overdue_amount: f64,
}

pub fn summarize_outstanding(debts: &[Debt], now: i64) -> OutstandingSummary {
    let mut total = rust_decimal::Decimal::ZERO;
    let mut overdue_total = rust_decimal::Decimal::ZERO;
    let mut debtors = HashSet::new();
    let mut overdue_count = 0;

    for debt in debts.iter().filter(|d| d.status != DebtStatus::Paid) {
        let remaining = (to_decimal(debt.amount) - to_decimal(debt.paid))
            .max(rust_decimal::Decimal::ZERO);
        total += remaining;
        debtors.insert(debt.customer_id);
        if derive_status(debt, now) == DebtStatus::Overdue {
            overdue_count += 1;
            overdue_total += remaining;
        }
    }

    OutstandingSummary {
        total_outstanding: to_f64(total),
        debtor_count: debtors.len(),
        overdue_count,
        overdue_amount: to_f64(overdue_total),
    }
}

/// Debt operations over a [`CustomerStore`]
pub struct DebtLedger {
    customers: Arc<dyn CustomerStore>,
    clock: Arc<dyn Clock>,
}

impl DebtLedger {
    pub fn new(customers: Arc<dyn CustomerStore>, clock: Arc<dyn Clock>) -> Self {
        Self { customers, clock }
    }

    /// Record a payment and persist the updated debt
    pub async fn record_payment(&self, debt_id: i64, input: PaymentInput) -> Result<Debt, DebtError> {
        let now = self.clock.now_millis();
        let mut debt = self.customers.get_debt(debt_id).await?;

        let payment = DebtPayment {
            date: input.date.unwrap_or(now),
            amount: input.amount,
            method: input.method.unwrap_or_default(),
            notes: input.notes.unwrap_or_default(),
        };
        apply_payment(&mut debt, payment, now)?;
        self.customers.update_debt(&debt).await?;

        tracing::info!(
            debt_id = debt.id,
            customer = %debt.customer_name,
            amount = input.amount,
            remaining = debt.remaining,
            status = ?debt.status,
            "Debt payment recorded"
        );
        Ok(debt)
    }

    /// Re-derive every unpaid debt's status; returns how many changed
    pub async fn refresh_statuses(&self) -> Result<usize, DebtError> {
        let now = self.clock.now_millis();
        let mut changed = 0;

        for mut debt in self.customers.list_debts().await? {
            if debt.status == DebtStatus::Paid {
                continue;
            }
            let status = derive_status(&debt, now);
            if status != debt.status {
                debt.status = status;
                self.customers.update_debt(&debt).await?;
                changed += 1;
            }
        }

        if changed > 0 {
            tracing::info!(changed, "Debt statuses refreshed");
        }
        Ok(changed)
    }

    pub async fn outstanding(&self) -> Result<OutstandingSummary, DebtError> {
        let debts = self.customers.list_debts().await?;
        Ok(summarize_outstanding(&debts, self.clock.now_millis()))
    }

    /// Fails with `NotFound` for an unknown customer rather than returning
    /// an empty list
    pub async fn debts_for_customer(&self, customer_id: i64) -> Result<Vec<Debt>, DebtError> {
        self.customers.get_customer(customer_id).await?;
        Ok(self
            .customers
            .list_debts()
            .await?
            .into_iter()
            .filter(|d| d.customer_id == customer_id)
            .collect())
    }

    /// Remaining amount over the customer's unpaid debts
    pub async fn total_debt_for_customer(&self, customer_id: i64) -> Result<f64, DebtError> {
        let total: rust_decimal::Decimal = self
            .debts_for_customer(customer_id)
            .await?
            .iter()
            .filter(|d| d.status != DebtStatus::Paid)
            .map(|d| to_decimal(d.remaining))
            .sum();
        Ok(to_f64(total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryCustomers;
    use crate::utils::clock::ManualClock;
    use shared::models::DebtCreate;
    use shared::util::DAY_MILLIS;

    fn debt(amount: f64, due_date: i64) -> Debt {
        Debt {
            id: 1,
            customer_id: 10,
            customer_name: "Bu Sari".to_string(),
            transaction_id: None,
            amount,
            paid: 0.0,
            remaining: amount,
            due_date,
            status: DebtStatus::Pending,
            payments: vec![],
            notes: String::new(),
            created_at: 0,
        }
    }

    fn payment(amount: f64) -> DebtPayment {
        DebtPayment {
            date: 0,
            amount,
            method: PaymentMethod::Cash,
            notes: String::new(),
        }
    }

    #[test]
    fn test_partial_then_paid() {
        let mut d = debt(50_000.0, 10 * DAY_MILLIS);

        apply_payment(&mut d, payment(20_000.0), 0).unwrap();
        assert_eq!(d.paid, 20_000.0);
        assert_eq!(d.remaining, 30_000.0);
        assert_eq!(d.status, DebtStatus::Partial);

        apply_payment(&mut d, payment(30_000.0), 0).unwrap();
        assert_eq!(d.remaining, 0.0);
        assert_eq!(d.status, DebtStatus::Paid);
        assert_eq!(d.payments.len(), 2);
    }

    #[test]
    fn test_overpayment_clamps_remaining() {
        let mut d = debt(10_000.0, DAY_MILLIS);
        apply_payment(&mut d, payment(15_000.0), 0).unwrap();
        assert_eq!(d.paid, 15_000.0);
        assert_eq!(d.remaining, 0.0);
        assert_eq!(d.status, DebtStatus::Paid);
    }

    #[test]
    fn test_payment_rejected_when_invalid_or_settled() {
        let mut d = debt(10_000.0, DAY_MILLIS);
        assert!(matches!(
            apply_payment(&mut d, payment(0.0), 0),
            Err(DebtError::InvalidAmount(_))
        ));
        apply_payment(&mut d, payment(10_000.0), 0).unwrap();
        assert!(matches!(
            apply_payment(&mut d, payment(1.0), 0),
            Err(DebtError::AlreadyPaid(1))
        ));
    }

    #[test]
    fn test_overdue_after_due_date() {
        let d = debt(10_000.0, 1_000);
        assert_eq!(derive_status(&d, 1_000), DebtStatus::Pending);
        assert_eq!(derive_status(&d, 1_001), DebtStatus::Overdue);
    }

    #[test]
    fn test_summary_counts_distinct_debtors() {
        let mut a = debt(10_000.0, 1_000);
        a.id = 1;
        let mut b = debt(5_000.0, 1_000_000);
        b.id = 2;
        b.paid = 2_000.0;
        b.remaining = 3_000.0;
        b.status = DebtStatus::Partial;
        let mut c = debt(7_000.0, 1_000_000);
        c.id = 3;
        c.customer_id = 11;
        c.paid = 7_000.0;
        c.remaining = 0.0;
        c.status = DebtStatus::Paid;

        let summary = summarize_outstanding(&[a, b, c], 2_000);
        assert_eq!(summary.total_outstanding, 13_000.0);
        assert_eq!(summary.debtor_count, 1);
        assert_eq!(summary.overdue_count, 1);
        assert_eq!(summary.overdue_amount, 10_000.0);
    }

    #[tokio::test]
    async fn test_ledger_record_and_refresh() {
        let clock = Arc::new(ManualClock::new(0));
        let store = Arc::new(MemoryCustomers::with_clock(clock.clone()));
        let ledger = DebtLedger::new(store.clone(), clock.clone());

        let customer = store.create_customer("Pak Budi").await.unwrap();
        let created = store
            .create_debt(DebtCreate {
                customer_id: customer.id,
                customer_name: customer.name.clone(),
                transaction_id: None,
                amount: 40_000.0,
                due_date: 30 * DAY_MILLIS,
                notes: String::new(),
            })
            .await
            .unwrap();

        let updated = ledger
            .record_payment(
                created.id,
                PaymentInput {
                    amount: 15_000.0,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, DebtStatus::Partial);
        assert_eq!(updated.payments[0].method, PaymentMethod::Cash);

        assert_eq!(ledger.refresh_statuses().await.unwrap(), 0);
        clock.set(31 * DAY_MILLIS);
        assert_eq!(ledger.refresh_statuses().await.unwrap(), 1);
        assert_eq!(
            store.get_debt(created.id).await.unwrap().status,
            DebtStatus::Overdue
        );

        let summary = ledger.outstanding().await.unwrap();
        assert_eq!(summary.total_outstanding, 25_000.0);
        assert_eq!(summary.overdue_count, 1);
        assert_eq!(
            ledger.total_debt_for_customer(customer.id).await.unwrap(),
            25_000.0
        );
    }

    #[tokio::test]
    async fn test_missing_debt_maps_to_debt_not_found() {
        let clock = Arc::new(ManualClock::new(0));
        let ledger = DebtLedger::new(Arc::new(MemoryCustomers::new()), clock);
        let err = ledger
            .record_payment(404, PaymentInput {
                amount: 1.0,
                ..Default::default()
            })
            .await
            .unwrap_err();
        let app: AppError = err.into();
        assert_eq!(app.code, ErrorCode::DebtNotFound);
    }

    #[tokio::test]
    async fn test_unknown_customer_is_not_an_empty_ledger() {
        let clock = Arc::new(ManualClock::new(0));
        let ledger = DebtLedger::new(Arc::new(MemoryCustomers::new()), clock);
        let err = ledger.total_debt_for_customer(77).await.unwrap_err();
        let app: AppError = err.into();
        assert_eq!(app.code, ErrorCode::CustomerNotFound);
    }
}
