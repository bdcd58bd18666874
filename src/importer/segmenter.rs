// ==========================================
// 批量数据导入引擎 - 分批读取器
// ==========================================
// 职责: 在表格上按固定窗口顺序读取批次，并按列映射取值
// 约束: 单线程顺序消费，不支持并发调用
// ==========================================

use crate::domain::result::ImportRowInfo;
use crate::importer::column_map::{ColumnMap, ResolvedColumns};
use crate::importer::data_table::DataTable;
use chrono::NaiveDate;
use std::sync::Arc;

/// 默认批次大小
pub const DEFAULT_BATCH_SIZE: usize = 100;

// ==========================================
// BatchSegment - 当前批次元信息
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSegment {
    /// 批次序号（1 起）
    pub batch_index: usize,
    /// 总批次数
    pub batch_count: usize,
    /// 批次首行在源文件中的数据行号（1 起，含 skip 偏移）
    pub first_row: usize,
    /// 批次末行在源文件中的数据行号
    pub last_row: usize,
}

// ==========================================
// ImportRow - 映射后的数据行
// ==========================================
#[derive(Debug, Clone)]
pub struct ImportRow {
    position: usize,
    values: Vec<String>,
    columns: Arc<ResolvedColumns>,
}

impl ImportRow {
    /// 源文件中的数据行号（1 起）
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn row_info(&self) -> ImportRowInfo {
        ImportRowInfo {
            position: self.position,
            entity_name: None,
        }
    }

    /// 原始值
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// 是否存在该属性（源列或默认值）
    pub fn has_property(&self, property: &str) -> bool {
        self.columns.has_property(property)
    }

    /// 按目标属性名取值；空值回退到映射默认值
    pub fn get(&self, property: &str) -> Option<&str> {
        let value = self
            .columns
            .index_of(property)
            .and_then(|i| self.values.get(i))
            .map(|v| v.trim())
            .filter(|v| !v.is_empty());

        value.or_else(|| self.columns.default_of(property))
    }

    pub fn get_string(&self, property: &str) -> Option<String> {
        self.get(property).map(str::to_string)
    }

    pub fn parse_i64(&self, property: &str) -> Result<Option<i64>, String> {
        self.get(property)
            .map(|v| {
                v.parse::<i64>()
                    .map_err(|e| format!("{} 不是整数 ({}): {}", property, v, e))
            })
            .transpose()
    }

    pub fn parse_f64(&self, property: &str) -> Result<Option<f64>, String> {
        self.get(property)
            .map(|v| {
                v.replace(',', ".")
                    .parse::<f64>()
                    .map_err(|e| format!("{} 不是数值 ({}): {}", property, v, e))
            })
            .transpose()
    }

    /// 支持 1/0、true/false、yes/no、y/n、是/否
    pub fn parse_bool(&self, property: &str) -> Result<Option<bool>, String> {
        self.get(property)
            .map(|v| match v.to_lowercase().as_str() {
                "1" | "true" | "yes" | "y" | "是" => Ok(true),
                "0" | "false" | "no" | "n" | "否" => Ok(false),
                _ => Err(format!("{} 不是布尔值: {}", property, v)),
            })
            .transpose()
    }

    /// 支持 YYYY-MM-DD / YYYYMMDD / YYYY/MM/DD
    pub fn parse_date(&self, property: &str) -> Result<Option<NaiveDate>, String> {
        self.get(property)
            .map(|v| {
                ["%Y-%m-%d", "%Y%m%d", "%Y/%m/%d"]
                    .iter()
                    .find_map(|fmt| NaiveDate::parse_from_str(v, fmt).ok())
                    .ok_or_else(|| format!("{} 日期格式错误: {}", property, v))
            })
            .transpose()
    }
}

// ==========================================
// DataSegmenter - 顺序批次游标
// ==========================================
pub struct DataSegmenter {
    table: DataTable,
    column_map: ColumnMap,
    columns: Arc<ResolvedColumns>,
    batch_size: usize,
    current_offset: usize,
    batch_index: usize,
    current_batch: Vec<ImportRow>,
    exhausted: bool,
}

impl DataSegmenter {
    pub fn new(table: DataTable, column_map: ColumnMap) -> Self {
        Self::with_batch_size(table, column_map, DEFAULT_BATCH_SIZE)
    }

    pub fn with_batch_size(table: DataTable, column_map: ColumnMap, batch_size: usize) -> Self {
        let columns = Arc::new(column_map.resolve(table.columns()));
        Self {
            table,
            column_map,
            columns,
            batch_size: batch_size.max(1),
            current_offset: 0,
            batch_index: 0,
            current_batch: Vec::new(),
            exhausted: false,
        }
    }

    /// 读取下一批
    ///
    /// # 返回
    /// - true: 已读取新批次，可通过 current_batch() 访问
    /// - false: 表格已读完（之后的调用持续返回 false）
    pub fn read_next_batch(&mut self) -> bool {
        if self.exhausted {
            return false;
        }

        let start = self.batch_index * self.batch_size;
        let total = self.table.total_rows();
        if start >= total {
            self.exhausted = true;
            self.current_batch.clear();
            self.current_offset = total;
            return false;
        }

        let end = (start + self.batch_size).min(total);
        self.current_batch = (start..end)
            .filter_map(|index| {
                self.table.row(index).map(|values| ImportRow {
                    position: self.table.row_position(index).unwrap_or(index + 1),
                    values: values.to_vec(),
                    columns: Arc::clone(&self.columns),
                })
            })
            .collect();

        self.batch_index += 1;
        self.current_offset = end;
        true
    }

    /// 当前批次的行
    pub fn current_batch(&self) -> &[ImportRow] {
        &self.current_batch
    }

    /// 当前批次元信息（尚未读取或已读完时为 None）
    pub fn current_segment(&self) -> Option<BatchSegment> {
        if self.current_batch.is_empty() {
            return None;
        }
        let first = self.current_batch.first().map(|r| r.position)?;
        let last = self.current_batch.last().map(|r| r.position)?;
        Some(BatchSegment {
            batch_index: self.batch_index,
            batch_count: self.batch_count(),
            first_row: first,
            last_row: last,
        })
    }

    pub fn total_rows(&self) -> usize {
        self.table.total_rows()
    }

    /// 已读取到的位置（表格内行索引）
    pub fn current_offset(&self) -> usize {
        self.current_offset
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn batch_count(&self) -> usize {
        self.total_rows().div_ceil(self.batch_size)
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn table(&self) -> &DataTable {
        &self.table
    }

    pub fn column_map(&self) -> &ColumnMap {
        &self.column_map
    }

    /// 表格中是否存在某个目标属性
    pub fn has_property(&self, property: &str) -> bool {
        self.columns.has_property(property)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::column_map::ColumnMapping;
    use crate::importer::csv_config::CsvConfiguration;

    fn table_with_rows(count: usize, skip: usize) -> DataTable {
        let mut data = String::from("Sku,Name,Price\n");
        for i in 1..=count {
            data.push_str(&format!("SKU{},商品{},{}.5\n", i, i, i));
        }
        let config = CsvConfiguration {
            delimiter: ',',
            ..CsvConfiguration::default()
        };
        DataTable::from_csv_reader("t.csv", data.as_bytes(), &config, skip, None).unwrap()
    }

    #[test]
    fn test_skip_five_of_twenty_batch_ten() {
        let mut segmenter =
            DataSegmenter::with_batch_size(table_with_rows(20, 5), ColumnMap::new(), 10);
        assert_eq!(segmenter.total_rows(), 15);
        assert_eq!(segmenter.batch_count(), 2);

        assert!(segmenter.read_next_batch());
        let first = segmenter.current_segment().unwrap();
        assert_eq!((first.batch_index, first.first_row, first.last_row), (1, 6, 15));
        assert_eq!(segmenter.current_batch().len(), 10);
        assert_eq!(segmenter.current_batch()[0].get("Sku"), Some("SKU6"));

        assert!(segmenter.read_next_batch());
        let second = segmenter.current_segment().unwrap();
        assert_eq!((second.batch_index, second.first_row, second.last_row), (2, 16, 20));
        assert_eq!(segmenter.current_batch().len(), 5);

        assert!(!segmenter.read_next_batch());
        assert_eq!(segmenter.current_offset(), 15);
    }

    #[test]
    fn test_read_next_batch_is_idempotently_exhaustible() {
        let mut segmenter = DataSegmenter::with_batch_size(table_with_rows(3, 0), ColumnMap::new(), 10);
        assert!(segmenter.read_next_batch());
        for _ in 0..5 {
            assert!(!segmenter.read_next_batch());
        }
        assert!(segmenter.is_exhausted());
        assert!(segmenter.current_batch().is_empty());
        assert!(segmenter.current_segment().is_none());
    }

    #[test]
    fn test_empty_table_yields_no_batch() {
        let mut segmenter = DataSegmenter::new(table_with_rows(0, 0), ColumnMap::new());
        assert_eq!(segmenter.total_rows(), 0);
        assert!(!segmenter.read_next_batch());
    }

    #[test]
    fn test_rows_are_mapped_through_column_map() {
        let mut map = ColumnMap::new();
        map.add_mapping("Sku", ColumnMapping::to_property("ProductCode"))
            .add_mapping(
                "Stock",
                ColumnMapping {
                    default_value: Some("0".to_string()),
                    ..Default::default()
                },
            );

        let mut segmenter = DataSegmenter::new(table_with_rows(2, 0), map);
        assert!(segmenter.read_next_batch());

        let row = &segmenter.current_batch()[1];
        assert_eq!(row.position(), 2);
        assert_eq!(row.get("ProductCode"), Some("SKU2"));
        assert_eq!(row.get("Sku"), None);
        assert_eq!(row.parse_i64("Stock"), Ok(Some(0)));
        assert_eq!(row.parse_f64("Price"), Ok(Some(2.5)));
        assert!(row.parse_i64("Name").is_err());
        assert!(segmenter.has_property("Stock"));
    }

    #[test]
    fn test_positions_follow_source_rows_across_blank_lines() {
        let config = CsvConfiguration {
            delimiter: ',',
            ..CsvConfiguration::default()
        };
        let data = "Sku,Name\nA,1\n,\n,\nB,2\n";
        let table = DataTable::from_csv_reader("t.csv", data.as_bytes(), &config, 0, None).unwrap();
        let mut segmenter = DataSegmenter::with_batch_size(table, ColumnMap::new(), 10);

        assert!(segmenter.read_next_batch());
        let positions: Vec<usize> = segmenter.current_batch().iter().map(ImportRow::position).collect();
        assert_eq!(positions, vec![1, 4]);
        let segment = segmenter.current_segment().unwrap();
        assert_eq!((segment.first_row, segment.last_row), (1, 4));
    }

    #[test]
    fn test_parse_bool_and_date() {
        let table = DataTable::new(
            "m",
            vec!["Published".to_string(), "Available".to_string()],
            vec![vec!["是".to_string(), "20250120".to_string()]],
        );
        let mut segmenter = DataSegmenter::new(table, ColumnMap::new());
        assert!(segmenter.read_next_batch());
        let row = &segmenter.current_batch()[0];

        assert_eq!(row.parse_bool("Published"), Ok(Some(true)));
        assert_eq!(
            row.parse_date("Available"),
            Ok(NaiveDate::from_ymd_opt(2025, 1, 20))
        );
        assert_eq!(row.parse_date("Missing"), Ok(None));
    }
}
