// ==========================================
// 批量数据导入引擎 - 列映射
// ==========================================
// 职责: 源列名 → 目标属性名 + 默认值 + 忽略标记
// 来源: import_profile.column_mapping (JSON)
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// 单列映射
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    /// 目标属性名（None 表示与源列同名）
    pub property: Option<String>,
    /// 源值为空或源列缺失时使用的默认值
    pub default_value: Option<String>,
    /// 忽略该源列
    pub ignored: bool,
}

impl ColumnMapping {
    pub fn to_property(property: impl Into<String>) -> Self {
        Self {
            property: Some(property.into()),
            ..Default::default()
        }
    }
}

/// 列映射表（键 = 源列名）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnMap {
    mappings: BTreeMap<String, ColumnMapping>,
}

impl ColumnMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从方案保存的 JSON 解析
    ///
    /// 解析失败时返回空映射（按列名直接对应属性）并记录警告
    pub fn from_profile_json(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Self::new();
        };

        match serde_json::from_str::<ColumnMap>(raw) {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!(error = %e, "列映射解析失败，使用空映射");
                Self::new()
            }
        }
    }

    pub fn add_mapping(&mut self, source: impl Into<String>, mapping: ColumnMapping) -> &mut Self {
        self.mappings.insert(source.into(), mapping);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// 按源列名查找（大小写不敏感）
    pub fn get(&self, source: &str) -> Option<&ColumnMapping> {
        self.mappings.get(source).or_else(|| {
            self.mappings
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(source))
                .map(|(_, v)| v)
        })
    }

    /// 针对某张表的列解析映射
    pub fn resolve(&self, columns: &[String]) -> ResolvedColumns {
        let mut indices = HashMap::new();
        let mut defaults = HashMap::new();

        for (index, column) in columns.iter().enumerate() {
            let mapping = self.get(column);
            if mapping.is_some_and(|m| m.ignored) {
                continue;
            }

            let property = mapping
                .and_then(|m| m.property.clone())
                .unwrap_or_else(|| column.clone());
            let key = property.to_lowercase();

            if let Some(default) = mapping.and_then(|m| m.default_value.clone()) {
                defaults.insert(key.clone(), default);
            }
            indices.entry(key).or_insert(index);
        }

        // 源列缺失但配置了默认值的属性
        for (source, mapping) in &self.mappings {
            if mapping.ignored {
                continue;
            }
            if let Some(default) = &mapping.default_value {
                let key = mapping
                    .property
                    .clone()
                    .unwrap_or_else(|| source.clone())
                    .to_lowercase();
                defaults.entry(key).or_insert_with(|| default.clone());
            }
        }

        ResolvedColumns { indices, defaults }
    }
}

/// 解析后的列查找表（属性名小写）
#[derive(Debug, Clone, Default)]
pub struct ResolvedColumns {
    indices: HashMap<String, usize>,
    defaults: HashMap<String, String>,
}

impl ResolvedColumns {
    pub fn index_of(&self, property: &str) -> Option<usize> {
        self.indices.get(&property.to_lowercase()).copied()
    }

    pub fn default_of(&self, property: &str) -> Option<&str> {
        self.defaults.get(&property.to_lowercase()).map(String::as_str)
    }

    /// 属性是否可用（有源列或有默认值）
    pub fn has_property(&self, property: &str) -> bool {
        let key = property.to_lowercase();
        self.indices.contains_key(&key) || self.defaults.contains_key(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_resolve_identity_when_unmapped() {
        let resolved = ColumnMap::new().resolve(&columns(&["Sku", "Name"]));
        assert_eq!(resolved.index_of("sku"), Some(0));
        assert_eq!(resolved.index_of("NAME"), Some(1));
        assert_eq!(resolved.index_of("Price"), None);
    }

    #[test]
    fn test_resolve_mapped_ignored_and_defaults() {
        let mut map = ColumnMap::new();
        map.add_mapping("商品编码", ColumnMapping::to_property("Sku"))
            .add_mapping(
                "备注",
                ColumnMapping {
                    ignored: true,
                    ..Default::default()
                },
            )
            .add_mapping(
                "Published",
                ColumnMapping {
                    default_value: Some("true".to_string()),
                    ..Default::default()
                },
            );

        let resolved = map.resolve(&columns(&["商品编码", "备注", "Name"]));

        assert_eq!(resolved.index_of("Sku"), Some(0));
        assert_eq!(resolved.index_of("备注"), None);
        assert_eq!(resolved.index_of("Name"), Some(2));
        assert_eq!(resolved.index_of("Published"), None);
        assert_eq!(resolved.default_of("published"), Some("true"));
        assert!(resolved.has_property("Published"));
    }

    #[test]
    fn test_from_profile_json() {
        let map = ColumnMap::from_profile_json(Some(
            r#"{"商品名称":{"property":"Name"},"内部":{"ignored":true}}"#,
        ));
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("商品名称").unwrap().property.as_deref(), Some("Name"));

        assert!(ColumnMap::from_profile_json(Some("[1,2")).is_empty());
        assert!(ColumnMap::from_profile_json(None).is_empty());
    }
}
