// ==========================================
// 批量数据导入引擎 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::import_config_trait::ImportConfigReader;
use crate::db::open_sqlite_connection;
use crate::importer::error::{ImportError, ImporterResult};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ImporterResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        crate::db::init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ImporterResult<Self> {
        {
            let conn_guard = conn
                .lock()
                .map_err(|e| ImportError::InternalError(format!("锁获取失败: {}", e)))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> ImporterResult<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ImportError::InternalError(format!("锁获取失败: {}", e)))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 写入 global scope 的配置值
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ImporterResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ImportError::InternalError(format!("锁获取失败: {}", e)))?;

        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES ('global', ?1, ?2, datetime('now'))
            ON CONFLICT(scope_id, key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> ImporterResult<String> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 读取非空字符串配置
    fn get_optional_text(&self, key: &str) -> ImporterResult<Option<String>> {
        Ok(self
            .get_config_value(key)?
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()))
    }

    /// 读取正整数配置，非法值回退默认值
    fn get_positive_usize(&self, key: &str, default: usize) -> ImporterResult<usize> {
        let value = self.get_config_or_default(key, &default.to_string())?;
        match value.trim().parse::<usize>() {
            Ok(v) if v > 0 => Ok(v),
            _ => {
                tracing::warn!(config_key = key, value = %value, "配置值非法，使用默认值 {}", default);
                Ok(default)
            }
        }
    }
}

#[async_trait]
impl ImportConfigReader for ConfigManager {
    // ===== 分批读取 =====

    async fn get_batch_size(&self) -> ImporterResult<usize> {
        self.get_positive_usize(config_keys::BATCH_SIZE, defaults::BATCH_SIZE)
    }

    async fn get_max_consecutive_failures(&self) -> ImporterResult<usize> {
        self.get_positive_usize(
            config_keys::MAX_CONSECUTIVE_FAILURES,
            defaults::MAX_CONSECUTIVE_FAILURES,
        )
    }

    // ===== 目录 =====

    async fn get_import_root(&self) -> ImporterResult<PathBuf> {
        Ok(self
            .get_optional_text(config_keys::IMPORT_ROOT)?
            .map(PathBuf::from)
            .unwrap_or_else(defaults::import_root))
    }

    // ===== 完成报告 =====

    async fn get_store_name(&self) -> ImporterResult<String> {
        Ok(self
            .get_optional_text(config_keys::STORE_NAME)?
            .unwrap_or_else(|| crate::APP_NAME.to_string()))
    }

    async fn get_webmaster_email(&self) -> ImporterResult<Option<String>> {
        self.get_optional_text(config_keys::WEBMASTER_EMAIL)
    }

    async fn get_company_email(&self) -> ImporterResult<Option<String>> {
        self.get_optional_text(config_keys::COMPANY_EMAIL)
    }

    async fn get_locale(&self) -> ImporterResult<String> {
        Ok(self
            .get_optional_text(config_keys::LOCALE)?
            .unwrap_or_else(|| defaults::LOCALE.to_string()))
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 分批读取
    pub const BATCH_SIZE: &str = "import_batch_size";
    pub const MAX_CONSECUTIVE_FAILURES: &str = "import_max_consecutive_failures";

    // 目录
    pub const IMPORT_ROOT: &str = "import_root";

    // 完成报告
    pub const STORE_NAME: &str = "store_name";
    pub const WEBMASTER_EMAIL: &str = "webmaster_email";
    pub const COMPANY_EMAIL: &str = "company_email";
    pub const LOCALE: &str = "locale";
}

// ==========================================
// 默认值
// ==========================================
pub mod defaults {
    use std::path::PathBuf;

    pub const BATCH_SIZE: usize = 100;
    pub const MAX_CONSECUTIVE_FAILURES: usize = 11;
    pub const LOCALE: &str = "zh-CN";

    /// 默认导入根目录: {data_dir}/data-import，取不到系统目录时使用当前目录
    pub fn import_root() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("data-import")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[tokio::test]
    async fn test_defaults_when_config_missing() {
        let manager = setup_manager();

        assert_eq!(manager.get_batch_size().await.unwrap(), 100);
        assert_eq!(manager.get_max_consecutive_failures().await.unwrap(), 11);
        assert_eq!(manager.get_locale().await.unwrap(), "zh-CN");
        assert!(manager.get_webmaster_email().await.unwrap().is_none());
        assert!(manager
            .get_import_root()
            .await
            .unwrap()
            .ends_with("data-import"));
    }

    #[tokio::test]
    async fn test_overrides_and_invalid_values() {
        let manager = setup_manager();
        manager.set_global_config_value(config_keys::BATCH_SIZE, "25").unwrap();
        manager
            .set_global_config_value(config_keys::MAX_CONSECUTIVE_FAILURES, "abc")
            .unwrap();
        manager
            .set_global_config_value(config_keys::WEBMASTER_EMAIL, " admin@shop.test ")
            .unwrap();
        manager.set_global_config_value(config_keys::COMPANY_EMAIL, "  ").unwrap();

        assert_eq!(manager.get_batch_size().await.unwrap(), 25);
        assert_eq!(manager.get_max_consecutive_failures().await.unwrap(), 11);
        assert_eq!(
            manager.get_webmaster_email().await.unwrap().as_deref(),
            Some("admin@shop.test")
        );
        assert!(manager.get_company_email().await.unwrap().is_none());

    }
}
