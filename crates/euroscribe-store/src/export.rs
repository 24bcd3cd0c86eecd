//! Row-set export: sparse JSON rows to Arrow batches to timestamped CSV files.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, StringArray};
use arrow::csv::WriterBuilder;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use euroscribe_core::{Aggregator, Row};
use serde_json::Value;
use tracing::info;

use crate::error::StoreError;

/// Paths of the three files written for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFiles {
    pub raw: PathBuf,
    pub json: PathBuf,
    pub valid: PathBuf,
}

/// Column union in first-seen order.
pub fn columns(rows: &[Row]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !seen.iter().any(|c| c == key) {
                seen.push(key.clone());
            }
        }
    }
    seen
}

/// Render one cell. Strings are verbatim, nested values compact JSON.
fn cell_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Build a batch of nullable Utf8 columns over the union of row keys.
pub fn rows_to_batch(rows: &[Row]) -> Result<RecordBatch, ArrowError> {
    let names = columns(rows);
    if names.is_empty() {
        return Ok(RecordBatch::new_empty(Arc::new(Schema::empty())));
    }

    let fields: Vec<Field> = names
        .iter()
        .map(|n| Field::new(n.as_str(), DataType::Utf8, true))
        .collect();
    let arrays: Vec<ArrayRef> = names
        .iter()
        .map(|n| {
            let values: StringArray = rows.iter().map(|r| cell_text(r.get(n))).collect();
            Arc::new(values) as ArrayRef
        })
        .collect();

    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
}

/// Write rows as CSV with a header line. No rows gives an empty file.
pub fn write_csv(path: &Path, rows: &[Row]) -> Result<(), StoreError> {
    let file = File::create(path)?;
    if rows.is_empty() {
        return Ok(());
    }
    let batch = rows_to_batch(rows)?;
    let mut writer = WriterBuilder::new().with_header(true).build(file);
    writer.write(&batch)?;
    Ok(())
}

/// Model identifiers like `medllm:8b` made safe for file names.
pub fn file_safe(model: &str) -> String {
    model
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Write `raw_`, `json_` and `pyd_` files for one run into `dir`.
///
/// `stamp` is the run timestamp, formatted by the caller.
pub fn write_run(
    dir: &Path,
    stamp: &str,
    model: &str,
    aggregator: &Aggregator,
) -> Result<RunFiles, StoreError> {
    std::fs::create_dir_all(dir)?;
    let model = file_safe(model);
    let files = RunFiles {
        raw: dir.join(format!("raw_{stamp}_{model}.csv")),
        json: dir.join(format!("json_{stamp}_{model}.csv")),
        valid: dir.join(format!("pyd_{stamp}_{model}.csv")),
    };

    write_csv(&files.raw, aggregator.raw_rows())?;
    write_csv(&files.json, aggregator.json_rows())?;
    write_csv(&files.valid, aggregator.valid_rows())?;

    info!(
        raw = aggregator.raw_rows().len(),
        json = aggregator.json_rows().len(),
        valid = aggregator.valid_rows().len(),
        dir = %dir.display(),
        "wrote run files"
    );
    Ok(files)
}
