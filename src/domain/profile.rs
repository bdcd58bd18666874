// ==========================================
// 批量数据导入引擎 - 导入方案领域模型
// ==========================================
// 职责: 导入方案 / 导入请求 / 导入文件
// 红线: 引擎只写 ImportProfile.result_info，且每次运行只写一次
// ==========================================

use crate::domain::types::{ImportEntityType, RelatedEntityType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

// ==========================================
// ImportProfile - 导入方案
// ==========================================
// 对齐: import_profile 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportProfile {
    // ===== 主键与标识 =====
    pub id: i64,                    // 方案 ID
    pub name: String,               // 方案名称
    pub folder_name: String,        // 导入目录名（相对导入根目录）

    // ===== 行为配置 =====
    pub entity_type: ImportEntityType, // 实体类型
    pub enabled: bool,                 // 是否启用
    pub import_related_data: bool,     // 是否导入关联数据文件

    // ===== 原始配置（JSON 文本）=====
    pub file_type_configuration: Option<String>, // CSV 解析配置
    pub column_mapping: Option<String>,          // 列映射
    pub extra_data: Option<String>,              // 扩展数据

    // ===== 行范围 =====
    pub skip: usize, // 跳过的数据行数
    pub take: i64,   // 最多读取的数据行数（<= 0 表示不限制）

    // ===== 更新策略 =====
    pub update_only: bool,            // 仅更新已存在记录
    pub key_field_names: Vec<String>, // 用于识别已存在记录的键字段

    // ===== 运行结果快照 =====
    pub result_info: Option<String>, // 主分组结果快照（JSON）
}

impl ImportProfile {
    /// 创建一个启用状态、其余字段取默认值的方案
    pub fn new(id: i64, name: impl Into<String>, entity_type: ImportEntityType) -> Self {
        let name = name.into();
        Self {
            id,
            folder_name: name.clone(),
            name,
            entity_type,
            enabled: true,
            import_related_data: false,
            file_type_configuration: None,
            column_mapping: None,
            extra_data: None,
            skip: 0,
            take: 0,
            update_only: false,
            key_field_names: Vec::new(),
            result_info: None,
        }
    }

    /// 有效的读取上限（None 表示不限制）
    pub fn take_limit(&self) -> Option<usize> {
        if self.take > 0 {
            Some(self.take as usize)
        } else {
            None
        }
    }
}

// ==========================================
// ImportRequest - 导入请求
// ==========================================
// 调用方持有，运行期间只读借用
#[derive(Debug, Clone, Default)]
pub struct ImportRequest {
    pub profile_id: i64,
    /// 调用方已完成授权判定（后台任务等）
    pub has_permission: bool,
    /// 调用方自定义数据，原样传给实体导入器
    pub custom_data: HashMap<String, serde_json::Value>,
}

impl ImportRequest {
    pub fn new(profile_id: i64) -> Self {
        Self {
            profile_id,
            ..Default::default()
        }
    }

    pub fn with_permission(mut self) -> Self {
        self.has_permission = true;
        self
    }

    pub fn with_custom_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.custom_data.insert(key.into(), value);
        self
    }
}

// ==========================================
// ImportFile - 导入文件
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportFile {
    pub path: PathBuf,
    /// None: 主数据文件; Some: 关联数据文件
    pub related_type: Option<RelatedEntityType>,
}

impl ImportFile {
    /// 根据文件名识别关联类型
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let related_type = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(RelatedEntityType::from_file_stem);
        Self { path, related_type }
    }

    /// 显式指定关联类型
    pub fn with_related_type(path: impl Into<PathBuf>, related_type: Option<RelatedEntityType>) -> Self {
        Self {
            path: path.into(),
            related_type,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    pub fn extension(&self) -> String {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase()
    }

    /// 纯文本表格（按 CSV 配置解析）
    pub fn is_csv(&self) -> bool {
        matches!(self.extension().as_str(), "csv" | "txt" | "tab")
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// 分组键: 主数据组为 ""
    pub fn group_key(&self) -> String {
        self.related_type
            .map(|t| t.as_str().to_string())
            .unwrap_or_default()
    }
}

/// 按关联类型分组
///
/// 分组顺序 = 首次出现顺序，组内保持原列表顺序
pub fn group_import_files(files: Vec<ImportFile>) -> Vec<(String, Vec<ImportFile>)> {
    let mut groups: Vec<(String, Vec<ImportFile>)> = Vec::new();
    for file in files {
        let key = file.group_key();
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(file),
            None => groups.push((key, vec![file])),
        }
    }
    groups
}
