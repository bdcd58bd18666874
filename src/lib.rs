// ==========================================
// 批量数据导入引擎 - 核心库
// ==========================================
// 职责: 按导入方案分批读取 CSV/Excel 文件，交给实体导入器处理，
//       汇总分组结果，并在运行结束时发布事件、发送报告、保存结果快照
// 技术栈: Rust + Tokio + SQLite
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 方案/请求/文件/结果
pub mod domain;

// 数据仓储层 - 导入方案存储
pub mod repository;

// 导入层 - 分批读取与编排
pub mod importer;

// 配置层 - 引擎配置
pub mod config;

// 外部协作服务 - 权限/邮件/文件枚举
pub mod services;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{AbortLevel, ImportEntityType, ImportMessageType, RelatedEntityType};

// 领域实体
pub use domain::{ImportFile, ImportProfile, ImportRequest, ImportResult, ImportResultInfo};

// 编排器与扩展点
pub use importer::{
    DataImporter, EntityImporter, EntityImporterFactory, ImportError, ImportExecuteContext,
    ImporterRegistry,
};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "批量数据导入引擎";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
