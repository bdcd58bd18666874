// ==========================================
// 批量数据导入引擎 - 配置层
// ==========================================
// 职责: 引擎配置读取与运行设置解析
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod import_config_trait;
pub mod import_settings;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use import_config_trait::ImportConfigReader;
pub use import_settings::ImportSettings;
