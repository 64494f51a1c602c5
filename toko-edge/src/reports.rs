//! Financial reports and dashboard figures

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::models::{Debt, Expense, ExpenseCategory, Product, Transaction};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::Config;
use crate::debts::summarize_outstanding;
use crate::pricing::{to_decimal, to_f64};
use crate::stores::{CatalogStore, CustomerStore, ExpenseStore, OrderStore, StoreResult};
use crate::utils::clock::Clock;

/// Estimated cost of goods as a share of gross revenue
pub const DEFAULT_COGS_RATIO: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CashFlowStatus {
    Positive,
    Negative,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowReport {
    pub from: i64,
    pub to: i64,
    /// Non-credit sales only
    pub income: f64,
    pub income_transactions: usize,
    pub expenses: f64,
    pub expense_count: usize,
    pub expenses_by_category: BTreeMap<ExpenseCategory, f64>,
    pub net_cash_flow: f64,
    pub status: CashFlowStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitLossReport {
    pub from: i64,
    pub to: i64,
    /// Net revenue plus discounts given
    pub gross_revenue: f64,
    pub discounts: f64,
    /// Sum of transaction totals, credit included
    pub net_revenue: f64,
    pub cost_of_goods: f64,
    pub gross_profit: f64,
    /// Percent of net revenue, 0 when there is no revenue
    pub gross_margin: f64,
    pub operating_expenses: f64,
    pub expenses_by_category: BTreeMap<ExpenseCategory, f64>,
    pub net_profit: f64,
    pub net_margin: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub product_count: usize,
    pub total_stock: i64,
    pub today_transactions: usize,
    pub today_cash_sales: f64,
    pub today_expenses: f64,
    /// Cash sales minus expenses
    pub today_net: f64,
    pub outstanding_credit: f64,
    pub debtor_count: usize,
    pub low_stock: Vec<Product>,
}

fn sum_by_category(expenses: &[Expense]) -> (Decimal, BTreeMap<ExpenseCategory, f64>) {
    let mut total = Decimal::ZERO;
    let mut grouped: BTreeMap<ExpenseCategory, Decimal> = BTreeMap::new();
    for expense in expenses {
        let amount = to_decimal(expense.amount);
        total += amount;
        *grouped.entry(expense.category).or_default() += amount;
    }
    (
        total,
        grouped.into_iter().map(|(k, v)| (k, to_f64(v))).collect(),
    )
}

fn percent_of(part: Decimal, whole: Decimal) -> f64 {
    if whole.is_zero() {
        return 0.0;
    }
    to_f64(part / whole * Decimal::ONE_HUNDRED)
}

pub fn cash_flow(transactions: &[Transaction], expenses: &[Expense], from: i64, to: i64) -> CashFlowReport {
    let cash: Vec<&Transaction> = transactions
        .iter()
        .filter(|t| !t.payment_method.is_credit())
        .collect();
    let income: Decimal = cash.iter().map(|t| to_decimal(t.total)).sum();
    let (expense_total, by_category) = sum_by_category(expenses);
    let net = income - expense_total;

    CashFlowReport {
        from,
        to,
        income: to_f64(income),
        income_transactions: cash.len(),
        expenses: to_f64(expense_total),
        expense_count: expenses.len(),
        expenses_by_category: by_category,
        net_cash_flow: to_f64(net),
        status: if net >= Decimal::ZERO {
            CashFlowStatus::Positive
        } else {
            CashFlowStatus::Negative
        },
    }
}

pub fn profit_loss(
    transactions: &[Transaction],
    expenses: &[Expense],
    cogs_ratio: f64,
    from: i64,
    to: i64,
) -> ProfitLossReport {
    let net_revenue: Decimal = transactions.iter().map(|t| to_decimal(t.total)).sum();
    let discounts: Decimal = transactions.iter().map(|t| to_decimal(t.discount)).sum();
    let gross_revenue = net_revenue + discounts;
    let cogs = gross_revenue * to_decimal(cogs_ratio);
    let gross_profit = net_revenue - cogs;
    let (operating, by_category) = sum_by_category(expenses);
    let net_profit = gross_profit - operating;

    ProfitLossReport {
        from,
        to,
        gross_revenue: to_f64(gross_revenue),
        discounts: to_f64(discounts),
        net_revenue: to_f64(net_revenue),
        cost_of_goods: to_f64(cogs),
        gross_profit: to_f64(gross_profit),
        gross_margin: percent_of(gross_profit, net_revenue),
        operating_expenses: to_f64(operating),
        expenses_by_category: by_category,
        net_profit: to_f64(net_profit),
        net_margin: percent_of(net_profit, net_revenue),
    }
}

pub fn dashboard(
    products: &[Product],
    today_transactions: &[Transaction],
    today_expenses: &[Expense],
    debts: &[Debt],
    now: i64,
) -> DashboardSummary {
    let cash_sales: Decimal = today_transactions
        .iter()
        .filter(|t| !t.payment_method.is_credit())
        .map(|t| to_decimal(t.total))
        .sum();
    let (expense_total, _) = sum_by_category(today_expenses);
    let outstanding = summarize_outstanding(debts, now);

    let mut low_stock: Vec<Product> = products.iter().filter(|p| p.is_low_stock()).cloned().collect();
    low_stock.sort_by_key(|p| p.stock);

    DashboardSummary {
        product_count: products.len(),
        total_stock: products.iter().map(|p| p.stock).sum(),
        today_transactions: today_transactions.len(),
        today_cash_sales: to_f64(cash_sales),
        today_expenses: to_f64(expense_total),
        today_net: to_f64(cash_sales - expense_total),
        outstanding_credit: outstanding.total_outstanding,
        debtor_count: outstanding.debtor_count,
        low_stock,
    }
}

/// Builds reports from the stores
pub struct ReportService {
    catalog: Arc<dyn CatalogStore>,
    orders: Arc<dyn OrderStore>,
    customers: Arc<dyn CustomerStore>,
    expenses: Arc<dyn ExpenseStore>,
    clock: Arc<dyn Clock>,
    cogs_ratio: f64,
}

impl ReportService {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        orders: Arc<dyn OrderStore>,
        customers: Arc<dyn CustomerStore>,
        expenses: Arc<dyn ExpenseStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog,
            orders,
            customers,
            expenses,
            clock,
            cogs_ratio: DEFAULT_COGS_RATIO,
        }
    }

    pub fn with_cogs_ratio(mut self, ratio: f64) -> Self {
        self.cogs_ratio = ratio;
        self
    }

    /// Apply `COGS_RATIO`
    pub fn with_config(self, config: &Config) -> Self {
        self.with_cogs_ratio(config.cogs_ratio)
    }

    pub fn cogs_ratio(&self) -> f64 {
        self.cogs_ratio
    }

    pub async fn cash_flow(&self, from: i64, to: i64) -> StoreResult<CashFlowReport> {
        let transactions = self.orders.list_transactions(from, to).await?;
        let expenses = self.expenses.list_expenses(from, to).await?;
        Ok(cash_flow(&transactions, &expenses, from, to))
    }

    pub async fn profit_loss(&self, from: i64, to: i64) -> StoreResult<ProfitLossReport> {
        let transactions = self.orders.list_transactions(from, to).await?;
        let expenses = self.expenses.list_expenses(from, to).await?;
        Ok(profit_loss(&transactions, &expenses, self.cogs_ratio, from, to))
    }

    /// Figures for the current UTC day
    pub async fn dashboard(&self) -> StoreResult<DashboardSummary> {
        let now = self.clock.now_millis();
        let from = shared::util::start_of_day(now);
        let to = shared::util::add_days(from, 1);

        let products = self.catalog.list_products().await?;
        let transactions = self.orders.list_transactions(from, to).await?;
        let expenses = self.expenses.list_expenses(from, to).await?;
        let debts = self.customers.list_debts().await?;

        Ok(dashboard(&products, &transactions, &expenses, &debts, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::PaymentMethod;

    fn tx(total: f64, discount: f64, method: PaymentMethod) -> Transaction {
        Transaction {
            id: 1,
            items: vec![],
            subtotal: total + discount,
            discount,
            total,
            payment_method: method,
            customer_name: None,
            is_voided: false,
            created_at: 0,
        }
    }

    fn expense(amount: f64, category: ExpenseCategory) -> Expense {
        Expense {
            id: 1,
            date: 0,
            description: "Biaya".to_string(),
            amount,
            category,
            payment_method: None,
        }
    }

    #[test]
    fn test_cash_flow_excludes_credit_sales() {
        let transactions = vec![
            tx(100_000.0, 0.0, PaymentMethod::Cash),
            tx(50_000.0, 0.0, PaymentMethod::Qris),
            tx(80_000.0, 0.0, PaymentMethod::Credit),
        ];
        let expenses = vec![
            expense(30_000.0, ExpenseCategory::Utilities),
            expense(20_000.0, ExpenseCategory::Utilities),
            expense(10_000.0, ExpenseCategory::Rent),
        ];

        let report = cash_flow(&transactions, &expenses, 0, 1);

        assert_eq!(report.income, 150_000.0);
        assert_eq!(report.income_transactions, 2);
        assert_eq!(report.expenses, 60_000.0);
        assert_eq!(report.expenses_by_category[&ExpenseCategory::Utilities], 50_000.0);
        assert_eq!(report.expenses_by_category[&ExpenseCategory::Rent], 10_000.0);
        assert_eq!(report.net_cash_flow, 90_000.0);
        assert_eq!(report.status, CashFlowStatus::Positive);
    }

    #[test]
    fn test_cash_flow_negative() {
        let report = cash_flow(&[], &[expense(5000.0, ExpenseCategory::Other)], 0, 1);
        assert_eq!(report.net_cash_flow, -5000.0);
        assert_eq!(report.status, CashFlowStatus::Negative);
    }

    #[test]
    fn test_profit_loss() {
        let transactions = vec![
            tx(90_000.0, 10_000.0, PaymentMethod::Cash),
            tx(10_000.0, 0.0, PaymentMethod::Credit),
        ];
        let expenses = vec![expense(20_000.0, ExpenseCategory::Salary)];

        let report = profit_loss(&transactions, &expenses, DEFAULT_COGS_RATIO, 0, 1);

        assert_eq!(report.net_revenue, 100_000.0);
        assert_eq!(report.discounts, 10_000.0);
        assert_eq!(report.gross_revenue, 110_000.0);
        assert_eq!(report.cost_of_goods, 66_000.0);
        assert_eq!(report.gross_profit, 34_000.0);
        assert_eq!(report.gross_margin, 34.0);
        assert_eq!(report.net_profit, 14_000.0);
        assert_eq!(report.net_margin, 14.0);
    }

    #[test]
    fn test_profit_loss_without_revenue_has_zero_margins() {
        let report = profit_loss(&[], &[], DEFAULT_COGS_RATIO, 0, 1);
        assert_eq!(report.gross_margin, 0.0);
        assert_eq!(report.net_margin, 0.0);
    }

    #[test]
    fn test_dashboard_low_stock_and_credit() {
        let product = |id: i64, stock: i64| Product {
            id,
            name: format!("P{}", id),
            price: 1000.0,
            stock,
            category: "Buah".to_string(),
            barcode: None,
            created_at: 0,
        };
        let products = vec![product(1, 50), product(2, 9), product(3, 0), product(4, 10)];
        let transactions = vec![
            tx(40_000.0, 0.0, PaymentMethod::Cash),
            tx(25_000.0, 0.0, PaymentMethod::Credit),
        ];
        let expenses = vec![expense(15_000.0, ExpenseCategory::Operational)];
        let debt = Debt {
            id: 1,
            customer_id: 7,
            customer_name: "Bu Sari".to_string(),
            transaction_id: None,
            amount: 25_000.0,
            paid: 5_000.0,
            remaining: 20_000.0,
            due_date: i64::MAX,
            status: shared::models::DebtStatus::Partial,
            payments: vec![],
            notes: String::new(),
            created_at: 0,
        };

        let summary = dashboard(&products, &transactions, &expenses, &[debt], 0);

        assert_eq!(summary.product_count, 4);
        assert_eq!(summary.total_stock, 69);
        assert_eq!(summary.today_transactions, 2);
        assert_eq!(summary.today_cash_sales, 40_000.0);
        assert_eq!(summary.today_net, 25_000.0);
        assert_eq!(summary.outstanding_credit, 20_000.0);
        assert_eq!(summary.debtor_count, 1);
        let low: Vec<i64> = summary.low_stock.iter().map(|p| p.id).collect();
        assert_eq!(low, vec![3, 2]);
    }
}
