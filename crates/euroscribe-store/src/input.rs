//! Startup inputs: the report table and the two prompt files.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, AsArray};
use arrow::compute::cast;
use arrow::csv::ReaderBuilder;
use arrow::csv::reader::Format;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use calamine::{Data, Reader, open_workbook_auto};
use euroscribe_core::{PromptTemplate, ReportItem};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tracing::{info, warn};

use crate::error::StoreError;

/// Column holding the report body when none is given.
pub const DEFAULT_TEXT_COLUMN: &str = "full_text";

/// Load report bodies from `column` of a spreadsheet, CSV or Parquet file.
///
/// Items are numbered from 1 in file order. Empty cells are kept as empty
/// reports so indices line up with the source rows.
pub fn load_reports(path: &Path, column: &str) -> Result<Vec<ReportItem>, StoreError> {
    if !path.exists() {
        return Err(StoreError::NotFound(path.to_path_buf()));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let texts = match extension.as_str() {
        "xlsx" | "xlsm" | "xls" | "ods" => spreadsheet_texts(path, column)?,
        "csv" => csv_texts(path, column)?,
        "parquet" => parquet_texts(path, column)?,
        _ => return Err(StoreError::UnsupportedFormat(path.to_path_buf())),
    };

    let items = ReportItem::numbered(texts);
    for item in items.iter().filter(|i| i.text.trim().is_empty()) {
        warn!(report = item.index, "empty report text");
    }
    info!(path = %path.display(), reports = items.len(), "loaded reports");
    Ok(items)
}

/// Read the user-prompt template and system instruction, both trimmed.
pub fn load_prompt(prompt_path: &Path, system_path: &Path) -> Result<PromptTemplate, StoreError> {
    let template = read_text(prompt_path)?;
    let system = read_text(system_path)?;
    PromptTemplate::new(system, template)
        .map_err(|_| StoreError::MissingPlaceholder(prompt_path.to_path_buf()))
}

fn read_text(path: &Path) -> Result<String, StoreError> {
    if !path.exists() {
        return Err(StoreError::NotFound(path.to_path_buf()));
    }
    Ok(std::fs::read_to_string(path)?.trim().to_string())
}

fn missing_column(column: &str, path: &Path) -> StoreError {
    StoreError::MissingColumn {
        column: column.to_string(),
        path: path.to_path_buf(),
    }
}

/// First worksheet, first row is the header.
fn spreadsheet_texts(path: &Path, column: &str) -> Result<Vec<String>, StoreError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| StoreError::NoWorksheet(path.to_path_buf()))??;

    let mut rows = range.rows();
    let header = rows.next().ok_or_else(|| missing_column(column, path))?;
    let position = header
        .iter()
        .position(|cell| cell.to_string().trim() == column)
        .ok_or_else(|| missing_column(column, path))?;

    Ok(rows
        .map(|row| match row.get(position) {
            Some(Data::Empty) | None => String::new(),
            Some(cell) => cell.to_string(),
        })
        .collect())
}

/// Every column is read as text; only the header comes from inference.
fn csv_texts(path: &Path, column: &str) -> Result<Vec<String>, StoreError> {
    let format = Format::default().with_header(true);
    let (inferred, _) = format.infer_schema(File::open(path)?, Some(100))?;
    if inferred.field_with_name(column).is_err() {
        return Err(missing_column(column, path));
    }

    let schema = Schema::new(
        inferred
            .fields()
            .iter()
            .map(|f| Field::new(f.name(), DataType::Utf8, true))
            .collect::<Vec<_>>(),
    );
    let reader = ReaderBuilder::new(Arc::new(schema))
        .with_format(format)
        .build(File::open(path)?)?;
    let batches = reader.collect::<Result<Vec<_>, _>>()?;
    column_texts(&batches, column)
}

fn parquet_texts(path: &Path, column: &str) -> Result<Vec<String>, StoreError> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?;
    if builder.schema().field_with_name(column).is_err() {
        return Err(missing_column(column, path));
    }
    let batches = builder.build()?.collect::<Result<Vec<_>, _>>()?;
    column_texts(&batches, column)
}

/// Concatenate one column across batches as text. Nulls become empty strings.
fn column_texts(batches: &[RecordBatch], column: &str) -> Result<Vec<String>, StoreError> {
    let mut texts = Vec::with_capacity(batches.iter().map(RecordBatch::num_rows).sum());
    for batch in batches {
        let Some(array) = batch.column_by_name(column) else {
            continue;
        };
        let utf8 = cast(array, &DataType::Utf8)?;
        let strings = utf8.as_string::<i32>();
        texts.extend((0..strings.len()).map(|i| {
            if strings.is_null(i) {
                String::new()
            } else {
                strings.value(i).to_string()
            }
        }));
    }
    Ok(texts)
}
