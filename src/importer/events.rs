// ==========================================
// 批量数据导入引擎 - 导入事件发布
// ==========================================
// 职责: 定义导入事件发布 trait，实现依赖倒置
// 事件: 运行开始前 ImportExecuting / 运行结束后 ImportExecuted
// 说明: 事件携带执行上下文引用，订阅方只能在 publish 期间读取
// ==========================================

use crate::importer::context::ImportExecuteContext;
use crate::importer::error::ImporterResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ==========================================
// 导入事件类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportEventType {
    /// 运行开始（已通过权限检查并完成文件枚举）
    ImportExecuting,
    /// 运行结束（收尾阶段第一步）
    ImportExecuted,
}

impl ImportEventType {
    pub fn as_str(&self) -> &str {
        match self {
            ImportEventType::ImportExecuting => "ImportExecuting",
            ImportEventType::ImportExecuted => "ImportExecuted",
        }
    }
}

/// 导入事件
pub struct ImportEvent<'a> {
    pub event_type: ImportEventType,
    pub context: &'a ImportExecuteContext,
}

impl<'a> ImportEvent<'a> {
    pub fn executing(context: &'a ImportExecuteContext) -> Self {
        Self {
            event_type: ImportEventType::ImportExecuting,
            context,
        }
    }

    pub fn executed(context: &'a ImportExecuteContext) -> Self {
        Self {
            event_type: ImportEventType::ImportExecuted,
            context,
        }
    }
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 导入事件发布者
///
/// # 实现说明
/// - 订阅方（缓存失效、下游刷新等）由宿主实现
/// - 发布失败只记录日志，不影响导入运行
#[async_trait]
pub trait ImportEventPublisher: Send + Sync {
    async fn publish(&self, event: ImportEvent<'_>) -> ImporterResult<()>;
}

/// 空操作事件发布者
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

#[async_trait]
impl ImportEventPublisher for NoOpEventPublisher {
    async fn publish(&self, event: ImportEvent<'_>) -> ImporterResult<()> {
        tracing::debug!(
            "NoOpEventPublisher: 跳过事件发布 - profile_id={}, event_type={}",
            event.context.profile_id,
            event.event_type.as_str()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::profile::ImportProfile;
    use crate::domain::types::ImportEntityType;
    use crate::logging::ImportLogger;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn context() -> ImportExecuteContext {
        ImportExecuteContext::new(
            &ImportProfile::new(9, "customers", ImportEntityType::Customer),
            PathBuf::from("/tmp/customers"),
            HashMap::new(),
            Arc::new(ImportLogger::tracing_only()),
            11,
        )
    }

    #[tokio::test]
    async fn test_noop_publisher_accepts_both_events() {
        let ctx = context();
        assert!(NoOpEventPublisher.publish(ImportEvent::executing(&ctx)).await.is_ok());
        assert!(NoOpEventPublisher.publish(ImportEvent::executed(&ctx)).await.is_ok());
    }
}
