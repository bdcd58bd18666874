// ==========================================
// 批量数据导入引擎 - CSV 解析配置
// ==========================================
// 来源: import_profile.file_type_configuration (JSON)
// 回退: Excel 兼容配置（分号分隔）
// ==========================================

use serde::{Deserialize, Serialize};

/// CSV 解析配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvConfiguration {
    pub delimiter: char,
    pub quote: char,
    pub escape: Option<char>,
    pub has_header: bool,
    pub trim_values: bool,
}

impl Default for CsvConfiguration {
    fn default() -> Self {
        Self::excel_friendly()
    }
}

impl CsvConfiguration {
    /// Excel 兼容配置（Excel 在多数区域设置下导出分号分隔的 CSV）
    pub fn excel_friendly() -> Self {
        Self {
            delimiter: ';',
            quote: '"',
            escape: None,
            has_header: true,
            trim_values: true,
        }
    }

    /// 从方案保存的 JSON 解析
    ///
    /// # 返回
    /// - None: 未配置 / 空白 / 无法解析 / 分隔符不是单字节字符
    pub fn from_profile_json(raw: Option<&str>) -> Option<Self> {
        let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
        match serde_json::from_str::<CsvConfiguration>(raw) {
            Ok(config) if config.is_valid() => Some(config),
            Ok(_) => {
                tracing::warn!("CSV 配置包含非单字节分隔符/引号，忽略");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "CSV 配置解析失败，忽略");
                None
            }
        }
    }

    /// csv crate 只接受单字节分隔符/引号
    pub fn is_valid(&self) -> bool {
        self.delimiter.is_ascii()
            && self.quote.is_ascii()
            && self.escape.map(|c| c.is_ascii()).unwrap_or(true)
    }

    /// 转换为 csv::ReaderBuilder
    pub fn reader_builder(&self) -> csv::ReaderBuilder {
        let mut builder = csv::ReaderBuilder::new();
        builder
            .delimiter(self.delimiter as u8)
            .quote(self.quote as u8)
            .has_headers(self.has_header)
            .flexible(true); // 允许行长度不一致
        if let Some(escape) = self.escape {
            builder.escape(Some(escape as u8)).double_quote(false);
        }
        if self.trim_values {
            builder.trim(csv::Trim::All);
        }
        builder
    }
}
