// ==========================================
// 批量数据导入引擎 - 命令行入口
// ==========================================
// 用法:
//   data-import <profile_id> [db_path]
//
// 使用内置的键字段校验导入器运行一次导入方案，Ctrl-C 请求取消
// ==========================================

use data_import::config::{ConfigManager, ImportSettings};
use data_import::db::default_db_path;
use data_import::importer::{DataImporter, ImportError, ImporterRegistry, KeyFieldValidationImporter};
use data_import::repository::SqliteImportProfileRepository;
use data_import::services::DirectoryImportFileProvider;
use data_import::{i18n, logging, ImportRequest};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let mut args = std::env::args().skip(1);
    let profile_id: i64 = args
        .next()
        .ok_or_else(|| anyhow::anyhow!("用法: data-import <profile_id> [db_path]"))?
        .trim()
        .parse()?;
    let db_path = args.next().unwrap_or_else(default_db_path);

    tracing::info!("==================================================");
    tracing::info!("{} {}", data_import::APP_NAME, data_import::VERSION);
    tracing::info!("使用数据库: {}", db_path);
    tracing::info!("==================================================");

    let config = ConfigManager::new(&db_path)?;
    let settings = ImportSettings::load(&config).await?;
    i18n::set_locale(&settings.locale);

    let profile_repo = Arc::new(SqliteImportProfileRepository::new(&db_path)?);
    let file_provider = Arc::new(DirectoryImportFileProvider::new(settings.import_root.clone()));
    let registry =
        ImporterRegistry::new().with_all(KeyFieldValidationImporter::factory(settings.locale.clone()));

    let importer = DataImporter::new(profile_repo, file_provider, registry, settings);

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("收到 Ctrl-C，正在取消导入");
            ctrl_c_token.cancel();
        }
    });

    let request = ImportRequest::new(profile_id).with_permission();
    match importer.import(&request, cancel).await {
        Ok(()) => {
            tracing::info!(profile_id, "导入运行结束");
            Ok(())
        }
        Err(ImportError::Cancelled) => {
            tracing::warn!(profile_id, "导入已取消");
            std::process::exit(130);
        }
        Err(e) => Err(e.into()),
    }
}
