// ==========================================
// 批量数据导入引擎 - 领域模型层
// ==========================================
// 职责: 定义导入方案、请求、文件、结果与基础类型
// 红线: 不含数据访问逻辑,不含编排逻辑
// ==========================================

pub mod profile;
pub mod result;
pub mod types;

// 重导出核心类型
pub use profile::{group_import_files, ImportFile, ImportProfile, ImportRequest};
pub use result::{ImportMessage, ImportResult, ImportResultInfo, ImportRowInfo};
pub use types::{AbortLevel, ImportEntityType, ImportMessageType, RelatedEntityType};
