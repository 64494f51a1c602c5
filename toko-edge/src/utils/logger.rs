//! Logging Infrastructure
//!
//! `tracing` subscriber setup: plain or JSON lines, stdout or a daily-rolling
//! file. `RUST_LOG` overrides the configured level when set.

use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Initialize the logger
pub fn init_logger() {
    init_logger_with_file(None, None, None);
}

/// Initialize the logger with optional JSON formatting and file output
pub fn init_logger_with_file(log_level: Option<&str>, json: Option<bool>, log_dir: Option<&str>) {
    let level = log_level.unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    // File output only if the directory exists
    let appender = log_dir.and_then(|dir| {
        let log_path = Path::new(dir);
        if log_path.is_dir() {
            Some(tracing_appender::rolling::daily(log_path, "toko-edge"))
        } else {
            None
        }
    });

    // try_init: a second call (tests) keeps the first subscriber
    let result = match (json.unwrap_or(false), appender) {
        (true, Some(file)) => subscriber.json().with_writer(file).try_init(),
        (true, None) => subscriber.json().try_init(),
        (false, Some(file)) => subscriber.with_ansi(false).with_writer(file).try_init(),
        (false, None) => subscriber.try_init(),
    };
    if let Err(e) = result {
        tracing::debug!("Logger already initialized: {e}");
    }
}
