//! TokoKu Edge - 离线优先的收银核心
//!
//! # 架构概述
//!
//! - **购物车** (`cart`): 行项目、数量、手动折扣、结账前校验
//! - **定价** (`pricing`): 按范围和有效期匹配折扣规则，每行取最优
//! - **结账** (`checkout`): 扣库存 → 建交易 → 赊账记债，失败时回滚
//! - **赊账** (`debts`): 还款、状态推导、逾期统计
//! - **报表** (`reports`): 现金流、利润表、仪表盘
//! - **离线同步** (`sync`): redb 持久化队列，恢复联网后按序重放
//!
//! # 模块结构
//!
//! ```text
//! toko-edge/src/
//! ├── core/          # 配置、运行状态
//! ├── cart/          # 购物车
//! ├── pricing/       # 折扣引擎
//! ├── stores/        # 存储接口 + 内存实现
//! ├── sync/          # 离线队列、重放、后台任务
//! ├── checkout.rs    # 结账编排
//! ├── debts.rs       # 赊账
//! ├── reports.rs     # 报表
//! └── utils/         # 时钟、日志
//! ```

pub mod cart;
pub mod checkout;
pub mod core;
pub mod debts;
pub mod pricing;
pub mod reports;
pub mod stores;
pub mod sync;
pub mod utils;

// Re-export 公共类型
pub use cart::{Cart, CartError, CartLine};
pub use checkout::{CheckoutError, CheckoutReceipt, CheckoutService};
pub use core::{Config, EdgeState};
pub use debts::DebtLedger;
pub use pricing::{DiscountEngine, PricedCart, TieBreak};
pub use reports::ReportService;
pub use sync::{Connectivity, SyncError, SyncQueue, SyncWorker};

// Re-export unified error types from shared
pub use shared::error::{AppError, AppResult, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};
