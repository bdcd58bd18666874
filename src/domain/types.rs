// ==========================================
// 批量数据导入引擎 - 领域类型定义
// ==========================================
// 职责: 实体类型 / 关联数据类型 / 中止级别 / 消息类型
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 导入实体类型 (Import Entity Type)
// ==========================================
// 每个导入方案声明一种实体类型,据此选择实体导入器
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportEntityType {
    Product,                // 商品
    Category,               // 分类
    Customer,               // 客户
    NewsletterSubscription, // 订阅
}

impl ImportEntityType {
    pub const ALL: [ImportEntityType; 4] = [
        ImportEntityType::Product,
        ImportEntityType::Category,
        ImportEntityType::Customer,
        ImportEntityType::NewsletterSubscription,
    ];

    /// 转换为字符串标识（与数据库一致）
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportEntityType::Product => "PRODUCT",
            ImportEntityType::Category => "CATEGORY",
            ImportEntityType::Customer => "CUSTOMER",
            ImportEntityType::NewsletterSubscription => "NEWSLETTER_SUBSCRIPTION",
        }
    }
}

impl fmt::Display for ImportEntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ImportEntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PRODUCT" => Ok(ImportEntityType::Product),
            "CATEGORY" => Ok(ImportEntityType::Category),
            "CUSTOMER" => Ok(ImportEntityType::Customer),
            "NEWSLETTER_SUBSCRIPTION" => Ok(ImportEntityType::NewsletterSubscription),
            other => Err(format!("未知的实体类型: {}", other)),
        }
    }
}

// ==========================================
// 关联数据类型 (Related Entity Type)
// ==========================================
// 文件分组标签: None = 主数据组, Some = 关联数据组
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RelatedEntityType {
    TierPrice,
    ProductVariantAttributeValue,
    ProductVariantAttributeCombination,
}

impl RelatedEntityType {
    /// 全部关联类型
    pub const ALL: [RelatedEntityType; 3] = [
        RelatedEntityType::TierPrice,
        RelatedEntityType::ProductVariantAttributeValue,
        RelatedEntityType::ProductVariantAttributeCombination,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RelatedEntityType::TierPrice => "TierPrice",
            RelatedEntityType::ProductVariantAttributeValue => "ProductVariantAttributeValue",
            RelatedEntityType::ProductVariantAttributeCombination => {
                "ProductVariantAttributeCombination"
            }
        }
    }

    /// 根据文件名（不含扩展名）后缀识别关联类型，大小写不敏感
    pub fn from_file_stem(stem: &str) -> Option<Self> {
        let stem = stem.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| stem.ends_with(&t.as_str().to_lowercase()))
    }
}

impl fmt::Display for RelatedEntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 中止级别 (Abort Level)
// ==========================================
// None: 继续
// Soft: 结束当前文件,同组下一个文件继续（仅由实体导入器设置）
// Hard: 立即结束整个运行,不再处理任何文件或分组
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AbortLevel {
    #[default]
    None,
    Soft,
    Hard,
}

impl fmt::Display for AbortLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortLevel::None => write!(f, "NONE"),
            AbortLevel::Soft => write!(f, "SOFT"),
            AbortLevel::Hard => write!(f, "HARD"),
        }
    }
}

// ==========================================
// 导入消息类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportMessageType {
    Info,
    Warning,
    Error,
}

impl fmt::Display for ImportMessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportMessageType::Info => write!(f, "INFO"),
            ImportMessageType::Warning => write!(f, "WARNING"),
            ImportMessageType::Error => write!(f, "ERROR"),
        }
    }
}
