// ==========================================
// 日志系统初始化 + 运行日志
// ==========================================
// 使用 tracing 和 tracing-subscriber
// 支持环境变量配置日志级别
// 每次导入运行另写一份 <导入目录>/log.txt（tracing-appender 后台线程落盘）
// ==========================================

use chrono::Local;
use std::fmt::Debug;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_appender::non_blocking::{NonBlocking, NonBlockingBuilder, WorkerGuard};
use tracing_subscriber::{fmt, EnvFilter};

/// 运行日志文件名
pub const IMPORT_LOG_FILE_NAME: &str = "log.txt";

/// 初始化日志系统
///
/// # 环境变量
/// - RUST_LOG: 日志级别过滤器（默认: info）
///   例如: RUST_LOG=debug 或 RUST_LOG=data_import=trace
///
/// # 示例
/// ```no_run
/// use data_import::logging;
/// logging::init();
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true)
        .init();
}

/// 初始化测试环境的日志系统
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

// ==========================================
// ImportLogger - 单次运行日志
// ==========================================
// 写入: 带时间戳的文本行进入 NonBlocking 通道，由后台线程写文件，同时转发到 tracing
// 释放: close() 丢弃 WorkerGuard，等待剩余行落盘；之后只转发 tracing
pub struct ImportLogger {
    path: Option<PathBuf>,
    writer: Mutex<Option<LogWriter>>,
}

struct LogWriter {
    lines: NonBlocking,
    _guard: WorkerGuard,
}

impl Debug for ImportLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImportLogger")
            .field("path", &self.path)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl ImportLogger {
    /// 在导入目录下创建（覆盖）log.txt
    pub fn create(import_directory: &Path) -> std::io::Result<Self> {
        fs::create_dir_all(import_directory)?;
        let path = import_directory.join(IMPORT_LOG_FILE_NAME);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;

        // 不丢行: 通道满时写入方等待
        let (lines, guard) = NonBlockingBuilder::default()
            .lossy(false)
            .thread_name("import-log")
            .finish(file);

        Ok(Self {
            path: Some(path),
            writer: Mutex::new(Some(LogWriter {
                lines,
                _guard: guard,
            })),
        })
    }

    /// 只转发 tracing 的日志器（日志文件无法创建时使用）
    pub fn tracing_only() -> Self {
        Self {
            path: None,
            writer: Mutex::new(None),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn info(&self, message: &str) {
        tracing::info!(target: "import_log", "{}", message);
        self.write_line("INFO", message);
    }

    pub fn warn(&self, message: &str) {
        tracing::warn!(target: "import_log", "{}", message);
        self.write_line("WARN", message);
    }

    pub fn error(&self, message: &str) {
        tracing::error!(target: "import_log", "{}", message);
        self.write_line("ERROR", message);
    }

    /// 关闭日志文件（等待后台线程写完已提交的行）
    pub fn close(&self) {
        let writer = self.writer.lock().ok().and_then(|mut guard| guard.take());
        drop(writer);
    }

    pub fn is_closed(&self) -> bool {
        self.writer.lock().map(|g| g.is_none()).unwrap_or(true)
    }

    fn write_line(&self, level: &str, message: &str) {
        let Ok(mut guard) = self.writer.lock() else {
            return;
        };
        if let Some(writer) = guard.as_mut() {
            let line = format!(
                "{} [{}] {}\n",
                Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                level,
                message
            );
            if let Err(e) = writer.lines.write_all(line.as_bytes()) {
                tracing::warn!(error = %e, "运行日志写入失败");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_import_logger_writes_lines_until_closed() {
        let dir = tempdir().unwrap();
        let logger = ImportLogger::create(&dir.path().join("products")).unwrap();

        logger.info("开始导入");
        logger.error("文件不存在");
        logger.close();
        logger.warn("关闭后不写文件");

        let content = fs::read_to_string(logger.path().unwrap()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("[INFO] 开始导入"));
        assert!(lines[1].contains("[ERROR] 文件不存在"));
        assert!(logger.is_closed());
    }

    #[test]
    fn test_tracing_only_logger_has_no_file() {
        let logger = ImportLogger::tracing_only();
        logger.info("只输出到 tracing");
        assert!(logger.path().is_none());
        assert!(logger.is_closed());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_lines_written_from_runtime_are_flushed_on_close() {
        let dir = tempdir().unwrap();
        let logger = ImportLogger::create(dir.path()).unwrap();

        for i in 0..500 {
            logger.info(&format!("批次 {}", i));
        }
        logger.close();

        let content = fs::read_to_string(dir.path().join(IMPORT_LOG_FILE_NAME)).unwrap();
        assert_eq!(content.lines().count(), 500);
        assert!(content.lines().last().unwrap().ends_with("批次 499"));
    }
}
