// ==========================================
// 批量数据导入引擎 - 导入层
// ==========================================
// 职责: 表格读取 → 分批 → 实体导入器 → 结果汇总 → 收尾
// 支持: CSV (.csv/.txt/.tab), Excel (.xlsx/.xls/.ods)
// ==========================================

pub mod column_map;
pub mod context;
pub mod csv_config;
pub mod data_table;
pub mod entity_importer;
pub mod error;
pub mod events;
pub mod finalizer;
pub mod orchestrator;
pub mod segmenter;

// 重导出核心类型
pub use column_map::{ColumnMap, ColumnMapping};
pub use context::{ImportExecuteContext, RunContext, PRIMARY_GROUP};
pub use csv_config::CsvConfiguration;
pub use data_table::DataTable;
pub use error::{ImportError, ImporterResult};
pub use events::{ImportEvent, ImportEventPublisher, ImportEventType, NoOpEventPublisher};
pub use finalizer::{ImportFinalizer, ImportReport};
pub use orchestrator::DataImporter;
pub use segmenter::{BatchSegment, DataSegmenter, ImportRow};

// 重导出 Trait 接口
pub use entity_importer::{
    EntityImporter, EntityImporterFactory, ImporterRegistry, KeyFieldValidationImporter,
};
