// ==========================================
// 批量数据导入引擎 - 表格读取
// ==========================================
// 支持: CSV (.csv/.txt/.tab) / Excel (.xlsx/.xls/.ods)
// 契约: 文件 + 解析配置 + 跳过行数 + 读取上限 → 行列表格
// ==========================================

use crate::domain::profile::ImportFile;
use crate::importer::csv_config::CsvConfiguration;
use crate::importer::error::{ImportError, ImporterResult};
use calamine::{open_workbook_auto, Reader};
use std::io::{BufReader, Read};
use std::path::Path;

// ==========================================
// DataTable - 轻量表格
// ==========================================
// 行号约定: 数据行索引从 0 开始；positions[i] 为该行在源文件中的数据行号（1 起，
// 表头之后计数，空白行也占行号）
#[derive(Debug, Clone)]
pub struct DataTable {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
    positions: Vec<usize>,
}

impl DataTable {
    /// 直接由列与行构造（测试与内存数据源）
    pub fn new(name: impl Into<String>, columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            positions: (1..=rows.len()).collect(),
            columns,
            rows,
        }
    }

    /// 按文件类型读取表格
    ///
    /// # 参数
    /// - file: 导入文件
    /// - config: CSV 解析配置（非 CSV 文件忽略）
    /// - skip: 跳过的源数据行数（空白行计入）
    /// - take: 最多读取的数据行数（None 表示不限制）
    pub fn from_file(
        file: &ImportFile,
        config: &CsvConfiguration,
        skip: usize,
        take: Option<usize>,
    ) -> ImporterResult<Self> {
        if !file.exists() {
            return Err(ImportError::FileNotFound(file.path().display().to_string()));
        }

        let ext = file.extension();
        match ext.as_str() {
            "csv" | "txt" | "tab" => {
                let stream = std::fs::File::open(file.path())?;
                Self::from_csv_reader(file.name(), BufReader::new(stream), config, skip, take)
            }
            "xlsx" | "xls" | "xlsb" | "ods" => Self::from_excel(file.path(), skip, take),
            _ => Err(ImportError::UnsupportedFormat(ext)),
        }
    }

    /// 从 CSV 流读取（逐行读取，跳过/截断在读取过程中完成）
    pub fn from_csv_reader<R: Read>(
        name: impl Into<String>,
        reader: R,
        config: &CsvConfiguration,
        skip: usize,
        take: Option<usize>,
    ) -> ImporterResult<Self> {
        let mut reader = config.reader_builder().from_reader(reader);

        let mut columns: Vec<String> = if config.has_header {
            reader
                .headers()?
                .iter()
                .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
                .collect()
        } else {
            Vec::new()
        };

        // csv 会直接吞掉空行，数据行号按源文件行号还原
        let header_lines = u64::from(config.has_header);
        let mut rows = Vec::new();
        let mut positions = Vec::new();
        let mut fallback = 0usize;
        for result in reader.records() {
            if take.is_some_and(|limit| rows.len() >= limit) {
                break;
            }

            let record = result?;
            fallback += 1;
            let position = record
                .position()
                .map(|p| p.line().saturating_sub(header_lines) as usize)
                .filter(|&line| line > 0)
                .unwrap_or(fallback);
            fallback = position;

            if position <= skip {
                continue;
            }
            let values: Vec<String> = record.iter().map(|v| v.to_string()).collect();
            // 完全空白的行不进入表格
            if values.iter().all(|v| v.trim().is_empty()) {
                continue;
            }
            rows.push(values);
            positions.push(position);
        }

        if !config.has_header {
            let width = rows.iter().map(Vec::len).max().unwrap_or(0);
            columns = (1..=width).map(|i| format!("Column{}", i)).collect();
        }

        Ok(Self {
            name: name.into(),
            columns,
            rows,
            positions,
        })
    }

    /// 从 Excel 文件读取第一个工作表（第一行为表头）
    pub fn from_excel(path: &Path, skip: usize, take: Option<usize>) -> ImporterResult<Self> {
        let mut workbook = open_workbook_auto(path)?;

        let sheet_names = workbook.sheet_names();
        let sheet_name = sheet_names
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;

        let range = workbook.worksheet_range(&sheet_name)?;

        // 提取表头（第一行）
        let mut source_rows = range.rows();
        let header_row = source_rows
            .next()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无数据行".to_string()))?;

        let columns: Vec<String> = header_row
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect();

        let (positions, rows): (Vec<usize>, Vec<Vec<String>>) = source_rows
            .enumerate()
            .map(|(index, row)| (index + 1, row))
            .filter(|(position, _)| *position > skip)
            .map(|(position, row)| {
                let values = row.iter().map(|cell| cell.to_string()).collect::<Vec<_>>();
                (position, values)
            })
            .filter(|(_, values)| values.iter().any(|v| !v.trim().is_empty()))
            .take(take.unwrap_or(usize::MAX))
            .unzip();

        Ok(Self {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            columns,
            rows,
            positions,
        })
    }

    // ==========================================
    // 访问接口
    // ==========================================

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn total_rows(&self) -> usize {
        self.rows.len()
    }

    /// 随机访问一行（索引从 0 开始）
    pub fn row(&self, index: usize) -> Option<&[String]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// 列名 → 列索引（大小写不敏感）
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
    }

    /// 第 index 行在源文件中的数据行号
    pub fn row_position(&self, index: usize) -> Option<usize> {
        self.positions.get(index).copied()
    }
}
