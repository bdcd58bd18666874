// ==========================================
// 批量数据导入引擎 - 运行设置
// ==========================================
// 职责: 将配置读取器的结果汇总为一次性解析的设置对象
// 说明: 引擎标识（写入日志头）显式传入，不读全局变量
// ==========================================

use crate::config::config_manager::defaults;
use crate::config::import_config_trait::ImportConfigReader;
use crate::importer::error::ImporterResult;
use std::path::PathBuf;

/// 导入引擎运行设置
#[derive(Debug, Clone)]
pub struct ImportSettings {
    /// 每批行数
    pub batch_size: usize,
    /// 连续失败次数上限
    pub max_consecutive_failures: usize,
    /// 导入根目录
    pub import_root: PathBuf,
    /// 引擎标识（名称 + 版本）
    pub engine_identity: String,
    /// 店铺名称
    pub store_name: String,
    pub webmaster_email: Option<String>,
    pub company_email: Option<String>,
    pub locale: String,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            batch_size: defaults::BATCH_SIZE,
            max_consecutive_failures: defaults::MAX_CONSECUTIVE_FAILURES,
            import_root: defaults::import_root(),
            engine_identity: default_engine_identity(),
            store_name: crate::APP_NAME.to_string(),
            webmaster_email: None,
            company_email: None,
            locale: defaults::LOCALE.to_string(),
        }
    }
}

impl ImportSettings {
    /// 从配置读取器加载
    pub async fn load(reader: &dyn ImportConfigReader) -> ImporterResult<Self> {
        Ok(Self {
            batch_size: reader.get_batch_size().await?,
            max_consecutive_failures: reader.get_max_consecutive_failures().await?,
            import_root: reader.get_import_root().await?,
            engine_identity: default_engine_identity(),
            store_name: reader.get_store_name().await?,
            webmaster_email: reader.get_webmaster_email().await?,
            company_email: reader.get_company_email().await?,
            locale: reader.get_locale().await?,
        })
    }

    pub fn with_import_root(mut self, import_root: impl Into<PathBuf>) -> Self {
        self.import_root = import_root.into();
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_max_consecutive_failures(mut self, max: usize) -> Self {
        self.max_consecutive_failures = max.max(1);
        self
    }
}

/// 默认引擎标识: "{APP_NAME} {VERSION}"
pub fn default_engine_identity() -> String {
    format!("{} {}", crate::APP_NAME, crate::VERSION)
}
