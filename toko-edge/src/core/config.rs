use shared::error::{AppError, ErrorCode};
use std::path::PathBuf;
use std::time::Duration;

use crate::checkout::DEFAULT_DEBT_DUE_DAYS;
use crate::pricing::TieBreak;
use crate::reports::DEFAULT_COGS_RATIO;
use crate::sync::{
    DEFAULT_MAX_RETRIES, DEFAULT_PROBE_INTERVAL_SECS, DEFAULT_RETRY_INTERVAL_SECS,
    DEFAULT_SETTLE_DELAY_MS,
};

/// 边缘节点配置 - 收银终端的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | /var/lib/tokoku/edge | 工作目录 (队列数据库、日志) |
/// | ENVIRONMENT | development | 运行环境 |
/// | SYNC_REMOTE_URL | (未设置) | 同步后端地址，未设置时仅离线运行 |
/// | SYNC_MAX_RETRIES | 3 | 单条操作最大重试次数 |
/// | SYNC_SETTLE_DELAY_MS | 1000 | 恢复联网后等待多久开始同步 |
/// | SYNC_RETRY_INTERVAL_SECS | 60 | 队列非空时的定期重试间隔 |
/// | SYNC_PROBE_INTERVAL_SECS | 15 | 后端健康检查间隔 |
/// | SYNC_REQUEST_TIMEOUT_MS | 30000 | 同步请求超时(毫秒) |
/// | DEBT_DUE_DAYS | 30 | 赊账到期天数 |
/// | DISCOUNT_TIE_BREAK | first | 折扣金额相同时取先/后定义的规则 |
/// | COGS_RATIO | 0.6 | 利润表估算的销货成本比例 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_JSON | false | JSON 格式日志 |
/// | LOG_DIR | (未设置) | 日志文件目录 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/tokoku SYNC_REMOTE_URL=https://toko.example.com cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储同步队列和日志
    pub work_dir: String,
    /// 运行环境: development | staging | production
    pub environment: String,

    // === 离线同步 ===
    /// 同步后端 URL
    pub sync_remote_url: Option<String>,
    pub sync_max_retries: u32,
    pub sync_settle_delay_ms: u64,
    pub sync_retry_interval_secs: u64,
    pub sync_probe_interval_secs: u64,
    pub sync_request_timeout_ms: u64,

    // === 收银 ===
    pub debt_due_days: i64,
    pub discount_tie_break: TieBreak,
    pub cogs_ratio: f64,

    // === 日志 ===
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<String>,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/tokoku/edge".into()),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),

            sync_remote_url: std::env::var("SYNC_REMOTE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            sync_max_retries: env_or("SYNC_MAX_RETRIES", DEFAULT_MAX_RETRIES),
            sync_settle_delay_ms: env_or("SYNC_SETTLE_DELAY_MS", DEFAULT_SETTLE_DELAY_MS),
            sync_retry_interval_secs: env_or("SYNC_RETRY_INTERVAL_SECS", DEFAULT_RETRY_INTERVAL_SECS),
            sync_probe_interval_secs: env_or("SYNC_PROBE_INTERVAL_SECS", DEFAULT_PROBE_INTERVAL_SECS),
            sync_request_timeout_ms: env_or("SYNC_REQUEST_TIMEOUT_MS", 30000),

            debt_due_days: env_or("DEBT_DUE_DAYS", DEFAULT_DEBT_DUE_DAYS),
            discount_tie_break: env_or("DISCOUNT_TIE_BREAK", TieBreak::default()),
            cogs_ratio: env_or("COGS_RATIO", DEFAULT_COGS_RATIO),

            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: env_or("LOG_JSON", false),
            log_dir: std::env::var("LOG_DIR").ok(),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, sync_remote_url: Option<String>) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.sync_remote_url = sync_remote_url;
        config
    }

    /// 校验配置取值范围
    ///
    /// 环境变量无法解析时已回退默认值，这里只拒绝能解析但不合理的值
    pub fn validate(&self) -> Result<(), AppError> {
        let invalid = |key: &str, reason: String| {
            AppError::with_message(ErrorCode::ConfigError, format!("{key}: {reason}"))
                .with_detail("key", key)
        };

        if !(0.0..=1.0).contains(&self.cogs_ratio) {
            return Err(invalid(
                "COGS_RATIO",
                format!("must be within 0..=1, got {}", self.cogs_ratio),
            ));
        }
        if self.debt_due_days < 0 {
            return Err(invalid(
                "DEBT_DUE_DAYS",
                format!("must not be negative, got {}", self.debt_due_days),
            ));
        }
        if self.sync_max_retries == 0 {
            return Err(invalid("SYNC_MAX_RETRIES", "must be at least 1".to_string()));
        }
        if let Some(url) = &self.sync_remote_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            return Err(invalid(
                "SYNC_REMOTE_URL",
                format!("must be an http(s) URL, got {url}"),
            ));
        }
        Ok(())
    }

    /// 同步队列数据库路径
    pub fn queue_db_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("sync_queue.redb")
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.sync_settle_delay_ms)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.sync_retry_interval_secs)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.sync_probe_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.sync_request_timeout_ms)
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
