// ==========================================
// 批量数据导入引擎 - 导入结果模型
// ==========================================
// 职责: 分组结果累加器 + 可持久化快照
// 生命周期: 每个文件分组开始时创建，运行结束后只持久化主分组快照
// ==========================================

use crate::domain::types::ImportMessageType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// ImportRowInfo - 消息关联的行信息
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRowInfo {
    pub position: usize,             // 源文件中的数据行号（1 起）
    pub entity_name: Option<String>, // 行对应的实体名称（如可解析）
}

// ==========================================
// ImportMessage - 导入消息
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportMessage {
    pub message: String,
    pub message_type: ImportMessageType,
    pub row_info: Option<ImportRowInfo>,
    pub field_name: Option<String>,
    pub error_details: Option<String>,
}

impl ImportMessage {
    pub fn new(message: impl Into<String>, message_type: ImportMessageType) -> Self {
        Self {
            message: message.into(),
            message_type,
            row_info: None,
            field_name: None,
            error_details: None,
        }
    }
}

// ==========================================
// ImportResult - 分组结果累加器
// ==========================================
// 写入方: 编排器（错误/警告/时间戳）+ 实体导入器（计数/行级消息）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportResult {
    pub start_date_utc: DateTime<Utc>,
    pub end_date_utc: Option<DateTime<Utc>>,

    // ===== 计数 =====
    pub total_records: usize,
    pub skipped_records: usize,
    pub new_records: usize,
    pub modified_records: usize,

    // ===== 消息 =====
    pub messages: Vec<ImportMessage>,
    pub last_error: Option<String>,
    pub cancelled: bool,
}

impl Default for ImportResult {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportResult {
    /// 创建新结果，开始时间为当前时间
    pub fn new() -> Self {
        Self {
            start_date_utc: Utc::now(),
            end_date_utc: None,
            total_records: 0,
            skipped_records: 0,
            new_records: 0,
            modified_records: 0,
            messages: Vec::new(),
            last_error: None,
            cancelled: false,
        }
    }

    /// 受影响记录数 = 新增 + 修改
    pub fn affected_records(&self) -> usize {
        self.new_records + self.modified_records
    }

    pub fn warnings(&self) -> usize {
        self.count_of(ImportMessageType::Warning)
    }

    pub fn errors(&self) -> usize {
        self.count_of(ImportMessageType::Error)
    }

    pub fn has_warnings(&self) -> bool {
        self.warnings() > 0
    }

    pub fn has_errors(&self) -> bool {
        self.errors() > 0
    }

    fn count_of(&self, message_type: ImportMessageType) -> usize {
        self.messages
            .iter()
            .filter(|m| m.message_type == message_type)
            .count()
    }

    // ==========================================
    // 消息写入
    // ==========================================

    pub fn add_info(&mut self, message: impl Into<String>) -> &mut ImportMessage {
        self.add_message(ImportMessage::new(message, ImportMessageType::Info))
    }

    pub fn add_warning(&mut self, message: impl Into<String>) -> &mut ImportMessage {
        self.add_message(ImportMessage::new(message, ImportMessageType::Warning))
    }

    /// 添加错误消息，同时更新 last_error
    pub fn add_error(&mut self, message: impl Into<String>) -> &mut ImportMessage {
        let message = message.into();
        self.last_error = Some(message.clone());
        self.add_message(ImportMessage::new(message, ImportMessageType::Error))
    }

    /// 添加带错误详情的错误消息
    pub fn add_error_with_details(
        &mut self,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> &mut ImportMessage {
        let entry = self.add_error(message);
        entry.error_details = Some(details.into());
        entry
    }

    /// 行级错误: 必填字段缺失
    pub fn add_missing_field_error(
        &mut self,
        row: ImportRowInfo,
        entity_name: &str,
        field_name: &str,
    ) -> &mut ImportMessage {
        let message = format!(
            "行 {}: {} 缺少必填字段 {}",
            row.position, entity_name, field_name
        );
        let entry = self.add_error(message);
        entry.row_info = Some(row);
        entry.field_name = Some(field_name.to_string());
        entry
    }

    pub fn add_message(&mut self, message: ImportMessage) -> &mut ImportMessage {
        self.messages.push(message);
        let last = self.messages.len() - 1;
        &mut self.messages[last]
    }

    /// 生成可持久化快照
    pub fn to_info(&self) -> ImportResultInfo {
        ImportResultInfo::from(self)
    }
}

// ==========================================
// ImportResultInfo - 持久化快照
// ==========================================
// 写入 import_profile.result_info，不含逐条消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResultInfo {
    pub start_date_utc: DateTime<Utc>,
    pub end_date_utc: Option<DateTime<Utc>>,
    pub total_records: usize,
    pub skipped_records: usize,
    pub new_records: usize,
    pub modified_records: usize,
    pub affected_records: usize,
    pub warnings: usize,
    pub errors: usize,
    pub last_error: Option<String>,
    pub cancelled: bool,
}

impl From<&ImportResult> for ImportResultInfo {
    fn from(result: &ImportResult) -> Self {
        Self {
            start_date_utc: result.start_date_utc,
            end_date_utc: result.end_date_utc,
            total_records: result.total_records,
            skipped_records: result.skipped_records,
            new_records: result.new_records,
            modified_records: result.modified_records,
            affected_records: result.affected_records(),
            warnings: result.warnings(),
            errors: result.errors(),
            last_error: result.last_error.clone(),
            cancelled: result.cancelled,
        }
    }
}

impl ImportResultInfo {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}
