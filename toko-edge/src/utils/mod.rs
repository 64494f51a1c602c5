//! 工具模块
//!
//! - [`clock`] - 可注入的时间源
//! - [`logger`] - 日志初始化

pub mod clock;
pub mod logger;

pub use clock::{Clock, ManualClock, SystemClock, system_clock};
