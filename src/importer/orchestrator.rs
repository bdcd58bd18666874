// ==========================================
// 批量数据导入引擎 - 导入编排器
// ==========================================
// 流程:
//   方案查询 → 运行上下文 → 权限检查 → 文件枚举与分组 → 日志头 + ImportExecuting
//   → 分组循环 → 文件循环 → 批次循环 → 收尾（无论成败恰好一次）
// 中止:
//   Hard: 不再开始任何批次/文件/分组
//   Soft: 只结束当前文件
//   取消: 保留已有计数，收尾完成后返回 ImportError::Cancelled
// ==========================================

use crate::config::ImportSettings;
use crate::domain::profile::{group_import_files, ImportFile, ImportProfile, ImportRequest};
use crate::domain::types::{AbortLevel, ImportEntityType};
use crate::i18n;
use crate::importer::column_map::ColumnMap;
use crate::importer::context::{ImportExecuteContext, RunContext};
use crate::importer::csv_config::CsvConfiguration;
use crate::importer::data_table::DataTable;
use crate::importer::entity_importer::{EntityImporterFactory, ImporterRegistry};
use crate::importer::error::{panic_message, ImportError, ImporterResult};
use crate::importer::events::{ImportEvent, ImportEventPublisher, NoOpEventPublisher};
use crate::importer::finalizer::ImportFinalizer;
use crate::importer::segmenter::DataSegmenter;
use crate::logging::ImportLogger;
use crate::repository::ImportProfileRepository;
use crate::services::file_provider::ImportFileProvider;
use crate::services::mail::{LoggingMailService, MailService};
use crate::services::permission::{
    PermissionService, StaticPermissionService, IMPORT_EXECUTE_PERMISSION,
};
use chrono::Utc;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

// ==========================================
// DataImporter - 导入编排器
// ==========================================
// 无运行期状态，可被多个运行并发共享
pub struct DataImporter {
    profile_repo: Arc<dyn ImportProfileRepository>,
    file_provider: Arc<dyn ImportFileProvider>,
    registry: ImporterRegistry,
    permission: Arc<dyn PermissionService>,
    events: Arc<dyn ImportEventPublisher>,
    mail: Arc<dyn MailService>,
    settings: ImportSettings,
}

impl DataImporter {
    /// 创建编排器（默认: 系统执行人 / 不发布事件 / 报告只写日志）
    pub fn new(
        profile_repo: Arc<dyn ImportProfileRepository>,
        file_provider: Arc<dyn ImportFileProvider>,
        registry: ImporterRegistry,
        settings: ImportSettings,
    ) -> Self {
        Self {
            profile_repo,
            file_provider,
            registry,
            permission: Arc::new(StaticPermissionService::system()),
            events: Arc::new(NoOpEventPublisher),
            mail: Arc::new(LoggingMailService::default()),
            settings,
        }
    }

    pub fn with_permission_service(mut self, permission: Arc<dyn PermissionService>) -> Self {
        self.permission = permission;
        self
    }

    pub fn with_event_publisher(mut self, events: Arc<dyn ImportEventPublisher>) -> Self {
        self.events = events;
        self
    }

    pub fn with_mail_service(mut self, mail: Arc<dyn MailService>) -> Self {
        self.mail = mail;
        self
    }

    pub fn settings(&self) -> &ImportSettings {
        &self.settings
    }

    // ==========================================
    // 运行入口
    // ==========================================

    /// 执行一次导入
    ///
    /// # 返回
    /// - Ok(()): 运行结束（包括方案不存在/未启用的空运行，以及记录在结果中的各类失败）
    /// - Err(ImportError::Cancelled): 调用方请求了取消，收尾已完成
    #[instrument(
        skip(self, request, cancel),
        fields(profile_id = request.profile_id, run_id = tracing::field::Empty)
    )]
    pub async fn import(
        &self,
        request: &ImportRequest,
        cancel: CancellationToken,
    ) -> ImporterResult<()> {
        let profile = match self.profile_repo.find_by_id(request.profile_id).await {
            Ok(Some(profile)) if profile.enabled => profile,
            Ok(Some(_)) => {
                tracing::debug!("导入方案未启用，跳过");
                return Ok(());
            }
            Ok(None) => {
                tracing::debug!("导入方案不存在，跳过");
                return Ok(());
            }
            Err(e) => {
                tracing::error!(error = %e, "导入方案查询失败，跳过");
                return Ok(());
            }
        };

        let mut run = self.create_run_context(request, profile, cancel.clone());
        tracing::Span::current().record("run_id", tracing::field::display(run.run_id));
        tracing::info!(profile_name = %run.profile.name, "导入运行开始");

        let outcome = AssertUnwindSafe(self.execute_run(&mut run))
            .catch_unwind()
            .await;
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let message = e.to_all_messages();
                run.log().error(&i18n::t_for(
                    &self.settings.locale,
                    "import.log.run_failed",
                    &[("error", message.as_str())],
                ));
                run.run_error = Some(message);
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                run.log().error(&i18n::t_for(
                    &self.settings.locale,
                    "import.log.run_failed",
                    &[("error", message.as_str())],
                ));
                run.run_error = Some(message);
            }
        }
        run.commit_current_group();

        self.finalizer().finalize(&mut run).await;

        if cancel.is_cancelled() {
            return Err(ImportError::Cancelled);
        }
        Ok(())
    }

    fn finalizer(&self) -> ImportFinalizer<'_> {
        ImportFinalizer {
            profile_repo: self.profile_repo.as_ref(),
            events: self.events.as_ref(),
            mail: self.mail.as_ref(),
            settings: &self.settings,
        }
    }

    fn create_run_context<'r>(
        &self,
        request: &'r ImportRequest,
        profile: ImportProfile,
        cancel: CancellationToken,
    ) -> RunContext<'r> {
        let import_directory = self.file_provider.import_directory(&profile);
        let logger = match ImportLogger::create(&import_directory) {
            Ok(logger) => logger,
            Err(e) => {
                tracing::warn!(
                    dir = %import_directory.display(),
                    error = %e,
                    "运行日志文件创建失败，只输出到 tracing"
                );
                ImportLogger::tracing_only()
            }
        };

        RunContext::new(
            request,
            profile,
            self.permission.current_principal(),
            cancel,
            Arc::new(logger),
            import_directory,
            self.settings.max_consecutive_failures,
        )
    }

    // ==========================================
    // 主流程
    // ==========================================

    async fn execute_run(&self, run: &mut RunContext<'_>) -> ImporterResult<()> {
        if !run.request.has_permission
            && !self.permission.is_authorized(IMPORT_EXECUTE_PERMISSION).await
        {
            return Err(ImportError::PermissionDenied(run.principal.to_string()));
        }

        let include_related =
            run.profile.import_related_data && run.profile.entity_type == ImportEntityType::Product;
        let files = self
            .file_provider
            .list_import_files(&run.profile, include_related)
            .await?;
        if files.is_empty() {
            return Err(ImportError::NoImportFiles(run.profile.id));
        }
        let groups = group_import_files(files);

        self.log_header(run, &groups);
        if let Err(e) = self
            .events
            .publish(ImportEvent::executing(&run.execute_context))
            .await
        {
            run.log()
                .warn(&format!("ImportExecuting 事件发布失败: {}", e.to_all_messages()));
        }

        'groups: for (group_key, group_files) in groups {
            if run.should_stop() {
                break;
            }
            run.begin_group(&group_key);

            for file in group_files {
                if run.should_stop() {
                    break 'groups;
                }
                self.import_file(run, file).await;
            }

            run.commit_current_group();
        }

        Ok(())
    }

    fn log_header(&self, run: &RunContext<'_>, groups: &[(String, Vec<ImportFile>)]) {
        let locale = self.settings.locale.as_str();
        let logger = run.log();
        let profile_id = run.profile.id.to_string();
        let entity = run.profile.entity_type.to_string();

        logger.info(&i18n::t_for(
            locale,
            "import.log.engine",
            &[("identity", self.settings.engine_identity.as_str())],
        ));
        logger.info(&i18n::t_for(
            locale,
            "import.log.profile",
            &[
                ("name", run.profile.name.as_str()),
                ("id", profile_id.as_str()),
                ("entity", entity.as_str()),
            ],
        ));
        for (key, files) in groups {
            let group = if key.is_empty() {
                i18n::t_for(locale, "import.log.primary_group", &[])
            } else {
                key.clone()
            };
            let names = files.iter().map(ImportFile::name).collect::<Vec<_>>().join(", ");
            logger.info(&i18n::t_for(
                locale,
                "import.log.group",
                &[("group", group.as_str()), ("files", names.as_str())],
            ));
        }
        let principal = run.principal.to_string();
        logger.info(&i18n::t_for(
            locale,
            "import.log.principal",
            &[("principal", principal.as_str())],
        ));
    }

    // ==========================================
    // 文件级边界
    // ==========================================

    /// 处理一个文件；任何错误或 panic 都升级为 Hard 并记录到分组结果
    async fn import_file(&self, run: &mut RunContext<'_>, file: ImportFile) {
        let locale = self.settings.locale.as_str();
        let cancel = run.cancel.clone();
        let file_column_map = if file.related_type.is_some() {
            ColumnMap::new()
        } else {
            run.column_map.clone()
        };
        let profile = &run.profile;
        let ctx = &mut run.execute_context;

        ctx.begin_file(file.clone());
        let outcome = AssertUnwindSafe(self.process_file(ctx, profile, &file, file_column_map, &cancel))
            .catch_unwind()
            .await;

        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) if e.is_cancelled() => None,
            Ok(Err(e)) => Some(e.to_all_messages()),
            Err(payload) => Some(panic_message(payload.as_ref())),
        };
        if let Some(message) = failure {
            ctx.abort = AbortLevel::Hard;
            ctx.logger.error(&format!("{}: {}", file.name(), message));
            ctx.result.add_error(message);
        }

        ctx.result.end_date_utc = Some(Utc::now());
        if ctx.is_max_failures_reached() {
            let max = ctx.max_consecutive_failures().to_string();
            let warning = i18n::t_for(locale, "import.max_failures_reached", &[("max", max.as_str())]);
            ctx.logger.warn(&warning);
            ctx.result.add_warning(warning);
        }
        if cancel.is_cancelled() {
            let warning = i18n::t_for(locale, "import.cancellation_requested", &[]);
            ctx.logger.warn(&warning);
            ctx.result.add_warning(warning);
            ctx.result.cancelled = true;
        }

        let new = ctx.result.new_records.to_string();
        let modified = ctx.result.modified_records.to_string();
        let skipped = ctx.result.skipped_records.to_string();
        let name = file.name();
        ctx.logger.info(&i18n::t_for(
            locale,
            "import.log.file_done",
            &[
                ("file", name.as_str()),
                ("new", new.as_str()),
                ("modified", modified.as_str()),
                ("skipped", skipped.as_str()),
            ],
        ));
        ctx.end_file();
    }

    async fn process_file(
        &self,
        ctx: &mut ImportExecuteContext,
        profile: &ImportProfile,
        file: &ImportFile,
        column_map: ColumnMap,
        cancel: &CancellationToken,
    ) -> ImporterResult<()> {
        let locale = self.settings.locale.as_str();
        if !file.exists() {
            let path = file.path().display().to_string();
            ctx.logger.error(&i18n::t_for(
                locale,
                "import.file_not_found",
                &[("path", path.as_str())],
            ));
            return Err(ImportError::FileNotFound(path));
        }

        let csv_config = if file.is_csv() {
            CsvConfiguration::from_profile_json(profile.file_type_configuration.as_deref())
                .unwrap_or_default()
        } else {
            CsvConfiguration::default()
        };

        let table = {
            let file = file.clone();
            let skip = profile.skip;
            let take = profile.take_limit();
            tokio::task::spawn_blocking(move || DataTable::from_file(&file, &csv_config, skip, take))
                .await
                .map_err(|e| ImportError::InternalError(format!("表格读取任务失败: {}", e)))??
        };

        ctx.column_map = column_map.clone();
        let segmenter = DataSegmenter::with_batch_size(table, column_map, self.settings.batch_size);
        ctx.result.total_records += segmenter.total_rows();

        let rows = segmenter.total_rows().to_string();
        let name = file.name();
        ctx.logger.info(&i18n::t_for(
            locale,
            "import.log.file_start",
            &[("file", name.as_str()), ("rows", rows.as_str())],
        ));
        ctx.segmenter = Some(segmenter);

        let factory = self.registry.get(ctx.entity_type)?;
        self.run_batches(ctx, factory.as_ref(), cancel).await
    }

    // ==========================================
    // 批次循环
    // ==========================================

    async fn run_batches(
        &self,
        ctx: &mut ImportExecuteContext,
        factory: &dyn EntityImporterFactory,
        cancel: &CancellationToken,
    ) -> ImporterResult<()> {
        loop {
            if ctx.is_aborted() || cancel.is_cancelled() {
                break;
            }
            let has_batch = ctx
                .segmenter
                .as_mut()
                .map(DataSegmenter::read_next_batch)
                .unwrap_or(false);
            if !has_batch {
                break;
            }

            if let Some(segment) = ctx.current_segment() {
                tracing::debug!(
                    profile_id = ctx.profile_id,
                    batch = segment.batch_index,
                    first_row = segment.first_row,
                    last_row = segment.last_row,
                    "执行批次"
                );
                let (index, count) = (segment.batch_index.to_string(), segment.batch_count.to_string());
                let (first, last) = (segment.first_row.to_string(), segment.last_row.to_string());
                ctx.logger.info(&i18n::t_for(
                    &self.settings.locale,
                    "import.log.batch",
                    &[
                        ("index", index.as_str()),
                        ("count", count.as_str()),
                        ("first", first.as_str()),
                        ("last", last.as_str()),
                    ],
                ));
            }

            execute_batch(factory, ctx, cancel).await?;

            if ctx.is_max_failures_reached() {
                ctx.abort = AbortLevel::Hard;
            }
        }
        Ok(())
    }
}

/// 批次作用域: 创建导入器 → 执行 → 无论成败都释放
async fn execute_batch(
    factory: &dyn EntityImporterFactory,
    ctx: &mut ImportExecuteContext,
    cancel: &CancellationToken,
) -> ImporterResult<()> {
    let importer = factory.create(ctx).await?;
    let outcome = AssertUnwindSafe(importer.execute(ctx, cancel))
        .catch_unwind()
        .await;
    importer.dispose().await;

    match outcome {
        Ok(result) => result,
        Err(payload) => Err(ImportError::EntityImportError(panic_message(payload.as_ref()))),
    }
}
