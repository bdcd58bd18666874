// ==========================================
// 批量数据导入引擎 - 外部协作服务
// ==========================================
// 职责: 权限判定 / 邮件发送 / 导入文件枚举
// 说明: 编排器只依赖 trait，宿主可替换实现
// ==========================================

pub mod file_provider;
pub mod mail;
pub mod permission;

pub use file_provider::{DirectoryImportFileProvider, ImportFileProvider, CONTENT_FOLDER};
pub use mail::{EmailAccount, LoggingMailService, MailMessage, MailService};
pub use permission::{
    ImportPrincipal, PermissionService, StaticPermissionService, IMPORT_EXECUTE_PERMISSION,
};
