//! 终端运行状态 - 存储、同步队列与业务服务的统一装配

use std::sync::Arc;

use super::Config;
use crate::checkout::CheckoutService;
use crate::debts::DebtLedger;
use crate::reports::ReportService;
use crate::stores::{MemoryCatalog, MemoryCustomers, MemoryExpenses, MemoryOrders};
use crate::sync::SyncQueue;
use crate::utils::clock::Clock;

/// 收银终端状态
///
/// 持有所有存储和服务的共享引用，clone 开销很小。
/// 业务服务按 [`Config`] 配置 (折扣平局策略、赊账天数、销货成本比例)。
#[derive(Clone)]
pub struct EdgeState {
    pub config: Config,
    pub catalog: Arc<MemoryCatalog>,
    pub orders: Arc<MemoryOrders>,
    pub customers: Arc<MemoryCustomers>,
    pub expenses: Arc<MemoryExpenses>,
    pub queue: Arc<SyncQueue>,
    pub checkout: Arc<CheckoutService>,
    pub debts: Arc<DebtLedger>,
    pub reports: Arc<ReportService>,
}

impl EdgeState {
    /// 装配内存存储和业务服务
    pub fn new(config: &Config, queue: Arc<SyncQueue>, clock: Arc<dyn Clock>) -> Self {
        let catalog = Arc::new(MemoryCatalog::new());
        let orders = Arc::new(MemoryOrders::with_clock(clock.clone()));
        let customers = Arc::new(MemoryCustomers::with_clock(clock.clone()));
        let expenses = Arc::new(MemoryExpenses::new());

        let checkout = CheckoutService::new(
            catalog.clone(),
            orders.clone(),
            customers.clone(),
            clock.clone(),
        )
        .with_sync(queue.clone())
        .with_config(config);
        let debts = DebtLedger::new(customers.clone(), clock.clone());
        let reports = ReportService::new(
            catalog.clone(),
            orders.clone(),
            customers.clone(),
            expenses.clone(),
            clock,
        )
        .with_config(config);

        tracing::debug!(
            tie_break = ?config.discount_tie_break,
            debt_due_days = config.debt_due_days,
            cogs_ratio = config.cogs_ratio,
            "Edge services assembled"
        );

        Self {
            config: config.clone(),
            catalog,
            orders,
            customers,
            expenses,
            queue,
            checkout: Arc::new(checkout),
            debts: Arc::new(debts),
            reports: Arc::new(reports),
        }
    }
}
