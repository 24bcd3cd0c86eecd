use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    #[error("unsupported report file format: {0} (expected .xlsx, .xlsm, .xls, .ods, .csv or .parquet)")]
    UnsupportedFormat(PathBuf),

    #[error("column {column:?} not found in {path}")]
    MissingColumn { column: String, path: PathBuf },

    #[error("workbook has no worksheets: {0}")]
    NoWorksheet(PathBuf),

    #[error("prompt template {0} contains no {{REPORT}} placeholder")]
    MissingPlaceholder(PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),
}
