// ==========================================
// 批量数据导入引擎 - 实体导入器接口
// ==========================================
// 选择: ImporterRegistry 按实体类型选择工厂
// 生命周期: 每个批次由工厂创建新的导入器（连同其依赖），
//           批次结束时无论成败都调用 dispose()
// ==========================================

use crate::domain::types::ImportEntityType;
use crate::i18n;
use crate::importer::context::ImportExecuteContext;
use crate::importer::error::{ImportError, ImporterResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

// ==========================================
// EntityImporter Trait
// ==========================================
#[async_trait]
pub trait EntityImporter: Send + Sync {
    /// 处理执行上下文中的当前批次
    ///
    /// # 约定
    /// - 计数与行级消息写入 context.result
    /// - 行级失败调用 context.record_row_failure()，成功调用 record_row_success()
    /// - 可设置 context.abort（Soft 结束当前文件，Hard 结束整个运行）
    /// - 返回 Err 视为文件级致命错误
    async fn execute(
        &self,
        context: &mut ImportExecuteContext,
        cancel: &CancellationToken,
    ) -> ImporterResult<()>;

    /// 释放批次资源
    async fn dispose(&self) {}
}

// ==========================================
// EntityImporterFactory Trait - 批次作用域
// ==========================================
#[async_trait]
pub trait EntityImporterFactory: Send + Sync {
    async fn create(&self, context: &ImportExecuteContext) -> ImporterResult<Box<dyn EntityImporter>>;
}

#[async_trait]
impl<F> EntityImporterFactory for F
where
    F: Fn(&ImportExecuteContext) -> ImporterResult<Box<dyn EntityImporter>> + Send + Sync,
{
    async fn create(&self, context: &ImportExecuteContext) -> ImporterResult<Box<dyn EntityImporter>> {
        self(context)
    }
}

// ==========================================
// ImporterRegistry - 实体类型 → 工厂
// ==========================================
#[derive(Clone, Default)]
pub struct ImporterRegistry {
    factories: HashMap<ImportEntityType, Arc<dyn EntityImporterFactory>>,
}

impl ImporterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        entity_type: ImportEntityType,
        factory: Arc<dyn EntityImporterFactory>,
    ) -> &mut Self {
        self.factories.insert(entity_type, factory);
        self
    }

    pub fn with(mut self, entity_type: ImportEntityType, factory: Arc<dyn EntityImporterFactory>) -> Self {
        self.register(entity_type, factory);
        self
    }

    /// 所有实体类型都使用同一工厂
    pub fn with_all(mut self, factory: Arc<dyn EntityImporterFactory>) -> Self {
        for entity_type in ImportEntityType::ALL {
            self.register(entity_type, Arc::clone(&factory));
        }
        self
    }

    pub fn get(&self, entity_type: ImportEntityType) -> ImporterResult<Arc<dyn EntityImporterFactory>> {
        self.factories
            .get(&entity_type)
            .cloned()
            .ok_or_else(|| ImportError::ImporterNotRegistered(entity_type.to_string()))
    }

    pub fn contains(&self, entity_type: ImportEntityType) -> bool {
        self.factories.contains_key(&entity_type)
    }
}

// ==========================================
// KeyFieldValidationImporter - 键字段校验
// ==========================================
// 不写实体数据，只校验每行的键字段是否齐全
// 缺失: 行级错误 + 跳过 + 连续失败计数
pub struct KeyFieldValidationImporter {
    locale: String,
}

impl KeyFieldValidationImporter {
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
        }
    }

    /// 每批次新建一个校验器的工厂
    pub fn factory(locale: impl Into<String>) -> Arc<dyn EntityImporterFactory> {
        let locale = locale.into();
        Arc::new(move |_: &ImportExecuteContext| -> ImporterResult<Box<dyn EntityImporter>> {
            Ok(Box::new(KeyFieldValidationImporter::new(locale.clone())))
        })
    }
}

#[async_trait]
impl EntityImporter for KeyFieldValidationImporter {
    async fn execute(
        &self,
        context: &mut ImportExecuteContext,
        cancel: &CancellationToken,
    ) -> ImporterResult<()> {
        let Some(segment) = context.current_segment() else {
            return Ok(());
        };

        let entity_name = context.entity_type.to_string();
        let rows = context.current_batch().to_vec();
        let mut valid = 0usize;

        for row in &rows {
            if cancel.is_cancelled() {
                break;
            }

            let missing: Vec<&String> = context
                .key_field_names
                .iter()
                .filter(|field| row.get(field).is_none())
                .collect();

            if missing.is_empty() {
                valid += 1;
                context.record_row_success();
                continue;
            }

            for field in missing {
                context
                    .result
                    .add_missing_field_error(row.row_info(), &entity_name, field);
            }
            context.result.skipped_records += 1;
            context.record_row_failure();
            if context.is_max_failures_reached() {
                break;
            }
        }

        let index = segment.batch_index.to_string();
        let valid = valid.to_string();
        context.result.add_info(i18n::t_for(
            &self.locale,
            "import.validation.batch_checked",
            &[("index", index.as_str()), ("valid", valid.as_str())],
        ));
        Ok(())
    }
}
