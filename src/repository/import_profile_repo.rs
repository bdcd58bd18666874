// ==========================================
// 批量数据导入引擎 - 导入方案数据仓储
// ==========================================
// 职责: import_profile 表的读取与结果快照回写
// 红线: Repository 不含业务逻辑，只做数据映射
// ==========================================

use crate::domain::profile::ImportProfile;
use crate::domain::types::ImportEntityType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// ImportProfileRepository Trait
// ==========================================
// 实现者: SqliteImportProfileRepository
#[async_trait]
pub trait ImportProfileRepository: Send + Sync {
    /// 按 ID 查询方案
    ///
    /// # 返回
    /// - Ok(None): 方案不存在
    async fn find_by_id(&self, profile_id: i64) -> RepositoryResult<Option<ImportProfile>>;

    /// 持久化方案（仅回写 result_info）
    async fn save_result_info(
        &self,
        profile_id: i64,
        result_info: Option<String>,
    ) -> RepositoryResult<()>;
}

// ==========================================
// SqliteImportProfileRepository
// ==========================================
pub struct SqliteImportProfileRepository {
    conn: Arc<Mutex<Connection>>,
}

const SELECT_COLUMNS: &str = r#"
    id, name, folder_name, entity_type, enabled, import_related_data,
    file_type_configuration, column_mapping, extra_data,
    skip_rows, take_rows, update_only, key_field_names, result_info
"#;

impl SqliteImportProfileRepository {
    /// 创建新的仓储实例（打开数据库并初始化表结构）
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseOpenError(e.to_string()))?;
        crate::db::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockPoisoned(e.to_string()))
    }

    /// 插入或替换方案
    pub fn upsert(&self, profile: &ImportProfile) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let key_fields = serde_json::to_string(&profile.key_field_names).map_err(|e| {
            RepositoryError::InvalidProfileField {
                field: "key_field_names".to_string(),
                message: e.to_string(),
            }
        })?;

        conn.execute(
            r#"
            INSERT OR REPLACE INTO import_profile (
                id, name, folder_name, entity_type, enabled, import_related_data,
                file_type_configuration, column_mapping, extra_data,
                skip_rows, take_rows, update_only, key_field_names, result_info
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
            params![
                profile.id,
                profile.name,
                profile.folder_name,
                profile.entity_type.as_str(),
                profile.enabled,
                profile.import_related_data,
                profile.file_type_configuration,
                profile.column_mapping,
                profile.extra_data,
                profile.skip as i64,
                profile.take,
                profile.update_only,
                key_fields,
                profile.result_info,
            ],
        )?;
        Ok(())
    }

    fn find_by_id_sync(&self, profile_id: i64) -> RepositoryResult<Option<ImportProfile>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM import_profile WHERE id = ?1", SELECT_COLUMNS);

        let raw = conn
            .query_row(&sql, params![profile_id], RawProfileRow::from_row)
            .optional()?;

        raw.map(RawProfileRow::into_profile).transpose()
    }

    fn save_result_info_sync(
        &self,
        profile_id: i64,
        result_info: Option<String>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE import_profile SET result_info = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![result_info, profile_id],
        )?;

        if rows == 0 {
            return Err(RepositoryError::ProfileNotFound(profile_id));
        }
        Ok(())
    }
}

#[async_trait]
impl ImportProfileRepository for SqliteImportProfileRepository {
    async fn find_by_id(&self, profile_id: i64) -> RepositoryResult<Option<ImportProfile>> {
        self.find_by_id_sync(profile_id)
    }

    async fn save_result_info(
        &self,
        profile_id: i64,
        result_info: Option<String>,
    ) -> RepositoryResult<()> {
        self.save_result_info_sync(profile_id, result_info)
    }
}

// 行映射中间结构（类型转换失败不能在 rusqlite 闭包内表达为业务错误）
struct RawProfileRow {
    id: i64,
    name: String,
    folder_name: String,
    entity_type: String,
    enabled: bool,
    import_related_data: bool,
    file_type_configuration: Option<String>,
    column_mapping: Option<String>,
    extra_data: Option<String>,
    skip_rows: i64,
    take_rows: i64,
    update_only: bool,
    key_field_names: Option<String>,
    result_info: Option<String>,
}

impl RawProfileRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            folder_name: row.get(2)?,
            entity_type: row.get(3)?,
            enabled: row.get(4)?,
            import_related_data: row.get(5)?,
            file_type_configuration: row.get(6)?,
            column_mapping: row.get(7)?,
            extra_data: row.get(8)?,
            skip_rows: row.get(9)?,
            take_rows: row.get(10)?,
            update_only: row.get(11)?,
            key_field_names: row.get(12)?,
            result_info: row.get(13)?,
        })
    }

    fn into_profile(self) -> RepositoryResult<ImportProfile> {
        let entity_type: ImportEntityType =
            self.entity_type
                .parse()
                .map_err(|message| RepositoryError::InvalidProfileField {
                    field: "entity_type".to_string(),
                    message,
                })?;

        let key_field_names = match self.key_field_names.as_deref().map(str::trim) {
            None | Some("") => Vec::new(),
            Some(raw) => serde_json::from_str::<Vec<String>>(raw).map_err(|e| {
                RepositoryError::InvalidProfileField {
                    field: "key_field_names".to_string(),
                    message: e.to_string(),
                }
            })?,
        };

        Ok(ImportProfile {
            id: self.id,
            name: self.name,
            folder_name: self.folder_name,
            entity_type,
            enabled: self.enabled,
            import_related_data: self.import_related_data,
            file_type_configuration: self.file_type_configuration,
            column_mapping: self.column_mapping,
            extra_data: self.extra_data,
            skip: self.skip_rows.max(0) as usize,
            take: self.take_rows,
            update_only: self.update_only,
            key_field_names,
            result_info: self.result_info,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_repo() -> SqliteImportProfileRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        SqliteImportProfileRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    #[tokio::test]
    async fn test_upsert_and_find_by_id() {
        let repo = setup_repo();

        let mut profile = ImportProfile::new(7, "商品导入", ImportEntityType::Product);
        profile.skip = 5;
        profile.take = 100;
        profile.key_field_names = vec!["Sku".to_string(), "Gtin".to_string()];
        profile.column_mapping = Some(r#"{"名称":{"property":"Name"}}"#.to_string());
        repo.upsert(&profile).unwrap();

        let loaded = repo.find_by_id(7).await.unwrap().expect("方案应存在");
        assert_eq!(loaded.name, "商品导入");
        assert_eq!(loaded.entity_type, ImportEntityType::Product);
        assert_eq!(loaded.skip, 5);
        assert_eq!(loaded.take, 100);
        assert_eq!(loaded.key_field_names, vec!["Sku", "Gtin"]);
        assert!(loaded.enabled);
        assert!(loaded.result_info.is_none());
    }

    #[tokio::test]
    async fn test_find_missing_profile_returns_none() {
        let repo = setup_repo();
        assert!(repo.find_by_id(404).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_result_info() {
        let repo = setup_repo();
        repo.upsert(&ImportProfile::new(1, "客户导入", ImportEntityType::Customer))
            .unwrap();

        repo.save_result_info(1, Some(r#"{"total_records":3}"#.to_string()))
            .await
            .unwrap();

        let loaded = repo.find_by_id(1).await.unwrap().unwrap();
        assert_eq!(loaded.result_info.as_deref(), Some(r#"{"total_records":3}"#));
    }

    #[tokio::test]
    async fn test_save_result_info_for_missing_profile_fails() {
        let repo = setup_repo();
        let result = repo.save_result_info(99, None).await;
        assert!(matches!(result, Err(RepositoryError::ProfileNotFound(_))));
    }
}
