// ==========================================
// 批量数据导入引擎 - 运行收尾
// ==========================================
// 每次运行恰好执行一次，四个步骤相互隔离（某步失败只记录日志）:
//   1. 发布 ImportExecuted 事件
//   2. 重新加载方案，发送完成报告
//   3. 主数据分组结果快照写回 import_profile.result_info
//   4. 清理自定义数据与分组结果，释放运行日志
// ==========================================

use crate::config::ImportSettings;
use crate::domain::profile::ImportProfile;
use crate::domain::result::ImportResult;
use crate::i18n;
use crate::importer::context::RunContext;
use crate::importer::error::{panic_message, ImporterResult};
use crate::importer::events::{ImportEvent, ImportEventPublisher};
use crate::logging::ImportLogger;
use crate::repository::ImportProfileRepository;
use crate::services::mail::{EmailAccount, MailMessage, MailService};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

// ==========================================
// ImportReport - 完成报告
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub subject: String,
    pub body: String,
}

impl ImportReport {
    /// 按设置中的语言生成报告
    pub fn compose(settings: &ImportSettings, profile: &ImportProfile, result: &ImportResult) -> Self {
        let locale = settings.locale.as_str();
        let tr = |key: &str, args: &[(&str, &str)]| i18n::t_for(locale, key, args);

        let subject = tr(
            "import.report.subject",
            &[
                ("store", settings.store_name.as_str()),
                ("profile", profile.name.as_str()),
            ],
        );

        let total = result.total_records.to_string();
        let affected = result.affected_records().to_string();
        let new = result.new_records.to_string();
        let modified = result.modified_records.to_string();
        let skipped = result.skipped_records.to_string();
        let warnings = result.warnings().to_string();
        let errors = result.errors().to_string();
        let started = format_time(Some(result.start_date_utc));
        let finished = format_time(result.end_date_utc);

        let mut lines = vec![
            tr("import.report.profile", &[("profile", profile.name.as_str())]),
            tr("import.report.started", &[("time", started.as_str())]),
            tr("import.report.finished", &[("time", finished.as_str())]),
            tr("import.report.total", &[("count", total.as_str())]),
            tr(
                "import.report.affected",
                &[
                    ("count", affected.as_str()),
                    ("new", new.as_str()),
                    ("modified", modified.as_str()),
                ],
            ),
            tr("import.report.skipped", &[("count", skipped.as_str())]),
            tr("import.report.warnings", &[("count", warnings.as_str())]),
            tr("import.report.errors", &[("count", errors.as_str())]),
        ];
        if let Some(last_error) = &result.last_error {
            lines.push(tr("import.report.last_error", &[("error", last_error.as_str())]));
        }
        if result.cancelled {
            lines.push(tr("import.report.cancelled", &[]));
        }

        Self {
            subject,
            body: lines.join("\n"),
        }
    }
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// 报告收件人: 站长邮箱 → 公司邮箱 → 发件账户本身
pub fn resolve_recipient(settings: &ImportSettings, account: &EmailAccount) -> String {
    [&settings.webmaster_email, &settings.company_email]
        .into_iter()
        .flatten()
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| account.email.clone())
}

// ==========================================
// ImportFinalizer
// ==========================================
pub struct ImportFinalizer<'a> {
    pub profile_repo: &'a dyn ImportProfileRepository,
    pub events: &'a dyn ImportEventPublisher,
    pub mail: &'a dyn MailService,
    pub settings: &'a ImportSettings,
}

impl ImportFinalizer<'_> {
    pub async fn finalize(&self, run: &mut RunContext<'_>) {
        let logger = Arc::clone(&run.execute_context.logger);

        isolated("publish_executed", &logger, self.publish_executed(run)).await;
        isolated("send_report", &logger, self.send_report(run)).await;
        isolated("save_result_info", &logger, self.save_result_info(run)).await;

        run.release();
        tracing::debug!(profile_id = run.profile.id, "导入运行已释放");
    }

    async fn publish_executed(&self, run: &RunContext<'_>) -> ImporterResult<()> {
        self.events
            .publish(ImportEvent::executed(&run.execute_context))
            .await
    }

    async fn send_report(&self, run: &RunContext<'_>) -> ImporterResult<()> {
        let Some(profile) = self.profile_repo.find_by_id(run.profile.id).await? else {
            run.log().warn("导入方案已不存在，跳过完成报告");
            return Ok(());
        };

        let Some(account) = self.mail.default_account().await? else {
            run.log().warn("未配置默认发件账户，跳过完成报告");
            return Ok(());
        };

        let result = report_result(run);
        let report = ImportReport::compose(self.settings, &profile, &result);
        let message = MailMessage {
            to: resolve_recipient(self.settings, &account),
            from: account,
            subject: report.subject,
            body: report.body,
        };

        self.mail.send(&message).await?;
        tracing::info!(profile_id = profile.id, to = %message.to, "完成报告已发送");
        Ok(())
    }

    async fn save_result_info(&self, run: &RunContext<'_>) -> ImporterResult<()> {
        let Some(primary) = run.primary_result() else {
            tracing::debug!(profile_id = run.profile.id, "无主数据分组结果，跳过快照");
            return Ok(());
        };

        let json = primary.to_info().to_json()?;
        self.profile_repo
            .save_result_info(run.profile.id, Some(json))
            .await?;
        Ok(())
    }
}

/// 报告使用的结果: 主数据分组 → 第一个分组 → 空结果（附运行级错误）
fn report_result(run: &RunContext<'_>) -> ImportResult {
    let mut result = run
        .primary_result()
        .or_else(|| run.results.values().next())
        .cloned()
        .unwrap_or_default();

    if result.last_error.is_none() {
        result.last_error = run.run_error.clone();
    }
    result
}

async fn isolated<F>(step: &str, logger: &ImportLogger, step_future: F)
where
    F: Future<Output = ImporterResult<()>>,
{
    match AssertUnwindSafe(step_future).catch_unwind().await {
        Ok(Ok(())) => tracing::debug!(step, "收尾步骤完成"),
        Ok(Err(e)) => logger.error(&format!("收尾步骤 {} 失败: {}", step, e.to_all_messages())),
        Err(payload) => logger.error(&format!(
            "收尾步骤 {} 异常: {}",
            step,
            panic_message(payload.as_ref())
        )),
    }
}
