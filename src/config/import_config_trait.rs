// ==========================================
// 批量数据导入引擎 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入引擎所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::importer::error::ImporterResult;
use async_trait::async_trait;
use std::path::PathBuf;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    // ===== 分批读取 =====

    /// 每批读取的行数
    ///
    /// # 默认值
    /// - 100
    async fn get_batch_size(&self) -> ImporterResult<usize>;

    /// 连续失败次数上限（达到即 Hard 中止）
    ///
    /// # 默认值
    /// - 11
    async fn get_max_consecutive_failures(&self) -> ImporterResult<usize>;

    // ===== 目录 =====

    /// 导入根目录（方案目录 = 根目录/folder_name）
    ///
    /// # 默认值
    /// - {data_dir}/data-import
    async fn get_import_root(&self) -> ImporterResult<PathBuf>;

    // ===== 完成报告 =====

    /// 店铺名称（报告标题）
    async fn get_store_name(&self) -> ImporterResult<String>;

    /// 站长邮箱（报告首选收件人）
    async fn get_webmaster_email(&self) -> ImporterResult<Option<String>>;

    /// 公司邮箱（报告次选收件人）
    async fn get_company_email(&self) -> ImporterResult<Option<String>>;

    /// 报告与日志使用的语言
    ///
    /// # 默认值
    /// - zh-CN
    async fn get_locale(&self) -> ImporterResult<String>;
}
