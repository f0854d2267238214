//! 日志初始化：按天滚动的非阻塞文件日志
//!
//! 过滤规则取自 `RUST_LOG`，缺省为 `ztree=info`。

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub const LOG_FILE_PREFIX: &str = "ztree.log";

/// Keeps the background writer alive; pending lines are flushed on drop.
pub struct LoggingGuard {
    _guard: WorkerGuard,
    log_dir: PathBuf,
}

impl LoggingGuard {
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }
}

/// Install the global subscriber writing to `log_dir`.
///
/// Returns `None` when the directory cannot be created or a global
/// subscriber is already installed.
pub fn init(log_dir: &Path) -> Option<LoggingGuard> {
    std::fs::create_dir_all(log_dir).ok()?;

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ztree=info"));

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .with_file(true)
            .with_line_number(true),
    );

    if subscriber.try_init().is_err() {
        return None;
    }

    tracing::info!(log_dir = %log_dir.display(), "tracing initialized");

    Some(LoggingGuard {
        _guard: guard,
        log_dir: log_dir.to_path_buf(),
    })
}

#[cfg(test)]
#[path = "../tests/unit/logging.rs"]
mod tests;
