// ==========================================
// 批量数据导入引擎 - 导入文件枚举
// ==========================================
// 目录约定:
//   导入目录 = <导入根目录>/<folder_name>
//   数据文件 = <导入目录>/Content/*.{csv,txt,tab,xlsx,xls,ods}
// 排序: 按文件名
// ==========================================

use crate::domain::profile::{ImportFile, ImportProfile};
use crate::importer::error::ImporterResult;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// 数据文件子目录
pub const CONTENT_FOLDER: &str = "Content";

/// 可导入的扩展名
pub const IMPORT_FILE_EXTENSIONS: [&str; 6] = ["csv", "txt", "tab", "xlsx", "xls", "ods"];

// ==========================================
// ImportFileProvider Trait
// ==========================================
// 实现者: DirectoryImportFileProvider
#[async_trait]
pub trait ImportFileProvider: Send + Sync {
    /// 方案的导入工作目录
    fn import_directory(&self, profile: &ImportProfile) -> PathBuf;

    /// 列出方案的导入文件
    ///
    /// # 参数
    /// - include_related: 是否包含关联数据文件
    async fn list_import_files(
        &self,
        profile: &ImportProfile,
        include_related: bool,
    ) -> ImporterResult<Vec<ImportFile>>;
}

// ==========================================
// DirectoryImportFileProvider - 本地目录
// ==========================================
#[derive(Debug, Clone)]
pub struct DirectoryImportFileProvider {
    import_root: PathBuf,
}

impl DirectoryImportFileProvider {
    pub fn new(import_root: impl Into<PathBuf>) -> Self {
        Self {
            import_root: import_root.into(),
        }
    }

    pub fn import_root(&self) -> &Path {
        &self.import_root
    }

    fn is_import_file(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                let ext = e.to_lowercase();
                IMPORT_FILE_EXTENSIONS.contains(&ext.as_str())
            })
            .unwrap_or(false)
    }
}

#[async_trait]
impl ImportFileProvider for DirectoryImportFileProvider {
    fn import_directory(&self, profile: &ImportProfile) -> PathBuf {
        self.import_root.join(&profile.folder_name)
    }

    async fn list_import_files(
        &self,
        profile: &ImportProfile,
        include_related: bool,
    ) -> ImporterResult<Vec<ImportFile>> {
        let content_dir = self.import_directory(profile).join(CONTENT_FOLDER);
        if !tokio::fs::try_exists(&content_dir).await? {
            tracing::debug!(dir = %content_dir.display(), "导入目录不存在");
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        let mut entries = tokio::fs::read_dir(&content_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_file() && Self::is_import_file(&path) {
                paths.push(path);
            }
        }
        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        let files = paths
            .into_iter()
            .map(ImportFile::new)
            .filter(|f| include_related || f.related_type.is_none())
            .collect();
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{ImportEntityType, RelatedEntityType};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_list_import_files_sorted_and_filtered() {
        let root = tempdir().unwrap();
        let profile = ImportProfile::new(1, "products", ImportEntityType::Product);
        let provider = DirectoryImportFileProvider::new(root.path());

        let content = provider.import_directory(&profile).join(CONTENT_FOLDER);
        std::fs::create_dir_all(&content).unwrap();
        for name in ["b.csv", "a.xlsx", "notes.md", "a-TierPrice.csv"] {
            std::fs::write(content.join(name), "x").unwrap();
        }

        let primary = provider.list_import_files(&profile, false).await.unwrap();
        let names: Vec<String> = primary.iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["a.xlsx", "b.csv"]);

        let all = provider.list_import_files(&profile, true).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].related_type, Some(RelatedEntityType::TierPrice));
    }

    #[tokio::test]
    async fn test_missing_content_dir_yields_no_files() {
        let root = tempdir().unwrap();
        let profile = ImportProfile::new(1, "nothing-here", ImportEntityType::Customer);
        let provider = DirectoryImportFileProvider::new(root.path());

        assert!(provider.list_import_files(&profile, true).await.unwrap().is_empty());
    }
}
