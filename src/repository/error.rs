// ==========================================
// 批量数据导入引擎 - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("导入方案不存在: id={0}")]
    ProfileNotFound(i64),

    // ===== SQLite =====
    #[error("数据库打开失败: {0}")]
    DatabaseOpenError(String),

    #[error("数据库连接锁已失效: {0}")]
    LockPoisoned(String),

    #[error("数据库正忙: {0}")]
    Busy(String),

    #[error("SQLite 执行失败: {0}")]
    Sqlite(String),

    // ===== 方案数据 =====
    #[error("方案字段无效 (field={field}): {message}")]
    InvalidProfileField { field: String, message: String },
}

// busy_timeout 用尽后仍被锁定时单独区分，便于调用方重试
impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _)
                if matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) =>
            {
                RepositoryError::Busy(err.to_string())
            }
            _ => RepositoryError::Sqlite(err.to_string()),
        }
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_failure_is_distinguished() {
        let busy = rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(5), None);
        assert!(matches!(RepositoryError::from(busy), RepositoryError::Busy(_)));

        let other = rusqlite::Error::QueryReturnedNoRows;
        assert!(matches!(RepositoryError::from(other), RepositoryError::Sqlite(_)));
    }
}
