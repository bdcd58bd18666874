// ==========================================
// 批量数据导入引擎 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 运行级错误 =====
    #[error("没有执行所选导入的权限: {0}")]
    PermissionDenied(String),

    #[error("没有可导入的文件 (方案 {0})")]
    NoImportFiles(i64),

    #[error("导入已取消")]
    Cancelled,

    // ===== 文件相关错误 =====
    #[error("导入文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .csv/.txt/.tab/.xlsx/.xls/.ods）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    // ===== 配置错误 =====
    #[error("配置值格式错误 (key: {key}, value: {value}): {message}")]
    ConfigValueError {
        key: String,
        value: String,
        message: String,
    },

    // ===== 实体导入错误 =====
    #[error("未注册的实体导入器: {0}")]
    ImporterNotRegistered(String),

    #[error("实体导入失败: {0}")]
    EntityImportError(String),

    // ===== 依赖错误 =====
    #[error("数据仓储错误: {0}")]
    Repository(#[from] RepositoryError),

    #[error("JSON 处理失败: {0}")]
    Json(#[from] serde_json::Error),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    /// 拼接错误链上的全部消息（"a → b → c"）
    pub fn to_all_messages(&self) -> String {
        let mut messages = vec![self.to_string()];
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            let text = err.to_string();
            if messages.last() != Some(&text) {
                messages.push(text);
            }
            source = err.source();
        }
        messages.join(" → ")
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ImportError::Cancelled)
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for ImportError {
    fn from(err: rusqlite::Error) -> Self {
        ImportError::Repository(RepositoryError::from(err))
    }
}

/// Result 类型别名
pub type ImporterResult<T> = Result<T, ImportError>;

/// 从 panic 载荷中提取消息
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "未知 panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_all_messages_walks_source_chain() {
        let inner = anyhow::anyhow!("磁盘已满").context("写入批次失败");
        let err = ImportError::from(inner);

        let text = err.to_all_messages();
        assert!(text.contains("写入批次失败"));
        assert!(text.contains("磁盘已满"));
    }

    #[test]
    fn test_panic_message() {
        let payload = std::panic::catch_unwind(|| panic!("批次 {} 崩溃", 2)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "批次 2 崩溃");
    }

    #[test]
    fn test_is_cancelled() {
        assert!(ImportError::Cancelled.is_cancelled());
        assert!(!ImportError::NoImportFiles(1).is_cancelled());
    }
}
