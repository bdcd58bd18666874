// ==========================================
// 批量数据导入引擎 - 运行上下文
// ==========================================
// ImportExecuteContext: 编排器与实体导入器共享的唯一可变状态
//   - 编排器拥有，每次调用实体导入器时以 &mut 借出
//   - 实体导入器不得在调用结束后保留引用
// RunContext: 单次运行的全部状态，运行结束时释放
// ==========================================

use crate::domain::profile::{ImportFile, ImportProfile, ImportRequest};
use crate::domain::result::ImportResult;
use crate::domain::types::{AbortLevel, ImportEntityType};
use crate::importer::column_map::ColumnMap;
use crate::importer::segmenter::{BatchSegment, DataSegmenter, ImportRow};
use crate::logging::ImportLogger;
use crate::services::permission::ImportPrincipal;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// 主数据分组键
pub const PRIMARY_GROUP: &str = "";

// ==========================================
// ImportExecuteContext - 执行上下文
// ==========================================
pub struct ImportExecuteContext {
    // ===== 运行信息（只读） =====
    pub profile_id: i64,
    pub profile_name: String,
    pub entity_type: ImportEntityType,
    pub update_only: bool,
    pub key_field_names: Vec<String>,
    pub import_directory: PathBuf,
    pub extra_data: Option<Value>,
    pub custom_data: HashMap<String, Value>,
    pub logger: Arc<ImportLogger>,

    // ===== 当前文件 =====
    pub file: Option<ImportFile>,
    pub column_map: ColumnMap,
    pub segmenter: Option<DataSegmenter>,

    // ===== 当前分组结果与控制信号 =====
    pub result: ImportResult,
    pub abort: AbortLevel,
    consecutive_failures: usize,
    max_consecutive_failures: usize,
}

impl ImportExecuteContext {
    pub fn new(
        profile: &ImportProfile,
        import_directory: PathBuf,
        custom_data: HashMap<String, Value>,
        logger: Arc<ImportLogger>,
        max_consecutive_failures: usize,
    ) -> Self {
        Self {
            profile_id: profile.id,
            profile_name: profile.name.clone(),
            entity_type: profile.entity_type,
            update_only: profile.update_only,
            key_field_names: profile.key_field_names.clone(),
            import_directory,
            extra_data: parse_extra_data(profile.extra_data.as_deref()),
            custom_data,
            logger,
            file: None,
            column_map: ColumnMap::new(),
            segmenter: None,
            result: ImportResult::new(),
            abort: AbortLevel::None,
            consecutive_failures: 0,
            max_consecutive_failures: max_consecutive_failures.max(1),
        }
    }

    /// 当前批次的行（无分批读取器时为空）
    pub fn current_batch(&self) -> &[ImportRow] {
        self.segmenter
            .as_ref()
            .map(DataSegmenter::current_batch)
            .unwrap_or(&[])
    }

    pub fn current_segment(&self) -> Option<BatchSegment> {
        self.segmenter.as_ref().and_then(DataSegmenter::current_segment)
    }

    pub fn is_aborted(&self) -> bool {
        self.abort != AbortLevel::None
    }

    // ==========================================
    // 连续失败计数
    // ==========================================

    /// 记录一行失败，返回当前连续失败次数
    pub fn record_row_failure(&mut self) -> usize {
        self.consecutive_failures += 1;
        self.consecutive_failures
    }

    /// 一行成功即清零
    pub fn record_row_success(&mut self) {
        self.consecutive_failures = 0;
    }

    pub fn consecutive_failures(&self) -> usize {
        self.consecutive_failures
    }

    pub fn max_consecutive_failures(&self) -> usize {
        self.max_consecutive_failures
    }

    pub fn is_max_failures_reached(&self) -> bool {
        self.consecutive_failures >= self.max_consecutive_failures
    }

    /// 开始新文件: Soft 只作用于上一个文件，失败计数重新开始
    pub(crate) fn begin_file(&mut self, file: ImportFile) {
        if self.abort == AbortLevel::Soft {
            self.abort = AbortLevel::None;
        }
        self.consecutive_failures = 0;
        self.file = Some(file);
        self.segmenter = None;
    }

    /// 文件结束后释放表格数据
    pub(crate) fn end_file(&mut self) {
        self.segmenter = None;
    }
}

fn parse_extra_data(raw: Option<&str>) -> Option<Value> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(error = %e, "扩展数据解析失败，忽略");
            None
        }
    }
}

// ==========================================
// RunContext - 单次运行上下文
// ==========================================
pub struct RunContext<'r> {
    /// 运行标识（并发运行时区分 tracing 日志）
    pub run_id: Uuid,
    pub request: &'r ImportRequest,
    pub profile: ImportProfile,
    pub principal: ImportPrincipal,
    pub cancel: CancellationToken,
    pub logger: Option<Arc<ImportLogger>>,
    /// 方案列映射（主数据文件使用）
    pub column_map: ColumnMap,
    /// 分组结果（键 = 分组键，"" 为主数据）
    pub results: BTreeMap<String, ImportResult>,
    pub execute_context: ImportExecuteContext,
    /// 未进入任何分组的运行级错误（权限/无文件等）
    pub run_error: Option<String>,
    current_group: Option<String>,
}

impl<'r> RunContext<'r> {
    pub fn new(
        request: &'r ImportRequest,
        profile: ImportProfile,
        principal: ImportPrincipal,
        cancel: CancellationToken,
        logger: Arc<ImportLogger>,
        import_directory: PathBuf,
        max_consecutive_failures: usize,
    ) -> Self {
        let column_map = ColumnMap::from_profile_json(profile.column_mapping.as_deref());
        let execute_context = ImportExecuteContext::new(
            &profile,
            import_directory,
            request.custom_data.clone(),
            Arc::clone(&logger),
            max_consecutive_failures,
        );

        Self {
            run_id: Uuid::new_v4(),
            request,
            profile,
            principal,
            cancel,
            logger: Some(logger),
            column_map,
            results: BTreeMap::new(),
            execute_context,
            run_error: None,
            current_group: None,
        }
    }

    /// 运行日志（释放后退化为 tracing）
    pub fn log(&self) -> &ImportLogger {
        &self.execute_context.logger
    }

    /// Hard 中止或已请求取消
    pub fn should_stop(&self) -> bool {
        self.execute_context.abort == AbortLevel::Hard || self.cancel.is_cancelled()
    }

    /// 开始分组: 新建结果作为当前结果
    pub fn begin_group(&mut self, key: &str) {
        self.commit_current_group();
        self.execute_context.result = ImportResult::new();
        self.current_group = Some(key.to_string());
    }

    /// 将当前结果写入分组结果表（未开始分组时不做任何事）
    ///
    /// 当前结果保留在执行上下文中，ImportExecuted 事件携带最后一个分组的结果
    pub fn commit_current_group(&mut self) {
        if let Some(key) = self.current_group.take() {
            self.results.insert(key, self.execute_context.result.clone());
        }
    }

    pub fn current_group(&self) -> Option<&str> {
        self.current_group.as_deref()
    }

    pub fn primary_result(&self) -> Option<&ImportResult> {
        self.results.get(PRIMARY_GROUP)
    }

    /// 释放运行占用的内存与日志文件
    pub fn release(&mut self) {
        self.execute_context.custom_data.clear();
        self.execute_context.end_file();
        self.results.clear();
        if let Some(logger) = self.logger.take() {
            logger.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_context(request: &ImportRequest) -> RunContext<'_> {
        let mut profile = ImportProfile::new(1, "products", ImportEntityType::Product);
        profile.extra_data = Some(r#"{"priceMultiplier":1.2}"#.to_string());
        RunContext::new(
            request,
            profile,
            ImportPrincipal::system(),
            CancellationToken::new(),
            Arc::new(ImportLogger::tracing_only()),
            PathBuf::from("/tmp/products"),
            3,
        )
    }

    #[test]
    fn test_group_results_committed_under_key() {
        let request = ImportRequest::new(1);
        let mut run = run_context(&request);

        run.begin_group(PRIMARY_GROUP);
        run.execute_context.result.new_records = 3;
        run.begin_group("TierPrice");
        run.execute_context.result.modified_records = 2;
        run.commit_current_group();
        run.commit_current_group();

        assert_eq!(run.results.len(), 2);
        assert_eq!(run.primary_result().map(|r| r.new_records), Some(3));
        assert_eq!(run.results["TierPrice"].modified_records, 2);
        assert!(run.current_group().is_none());
        assert_eq!(run.execute_context.result.modified_records, 2);
        assert_eq!(run.execute_context.result.new_records, 0);
    }

    #[test]
    fn test_consecutive_failures_reach_threshold() {
        let request = ImportRequest::new(1);
        let mut run = run_context(&request);
        let ctx = &mut run.execute_context;

        ctx.record_row_failure();
        ctx.record_row_failure();
        ctx.record_row_success();
        assert_eq!(ctx.consecutive_failures(), 0);

        for _ in 0..3 {
            ctx.record_row_failure();
        }
        assert!(ctx.is_max_failures_reached());
    }

    #[test]
    fn test_begin_file_clears_soft_abort_only() {
        let request = ImportRequest::new(1);
        let mut run = run_context(&request);
        let ctx = &mut run.execute_context;

        ctx.abort = AbortLevel::Soft;
        ctx.begin_file(ImportFile::new("/tmp/a.csv"));
        assert_eq!(ctx.abort, AbortLevel::None);

        ctx.abort = AbortLevel::Hard;
        ctx.begin_file(ImportFile::new("/tmp/b.csv"));
        assert_eq!(ctx.abort, AbortLevel::Hard);
    }

    #[test]
    fn test_release_clears_run_state() {
        let request = ImportRequest::new(1).with_custom_data("k", serde_json::json!(1));
        let mut run = run_context(&request);
        assert_eq!(run.execute_context.custom_data.len(), 1);
        assert!(run.execute_context.extra_data.is_some());

        run.begin_group(PRIMARY_GROUP);
        run.commit_current_group();
        run.release();

        assert!(run.execute_context.custom_data.is_empty());
        assert!(run.results.is_empty());
        assert!(run.logger.is_none());
    }

    #[test]
    fn test_each_run_gets_own_id() {
        let request = ImportRequest::new(1);
        let a = run_context(&request);
        let b = run_context(&request);
        assert_ne!(a.run_id, b.run_id);
    }
}
