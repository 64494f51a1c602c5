//! 核心模块 - 终端配置与运行状态
//!
//! - [`Config`] - 环境变量配置
//! - [`EdgeState`] - 按配置装配的存储与业务服务

pub mod config;
pub mod state;

pub use config::Config;
pub use state::EdgeState;
