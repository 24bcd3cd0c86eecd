//! Filesystem collaborators: report and prompt loading, and CSV export of
//! the three row sets.

pub mod error;
pub mod export;
pub mod input;

pub use error::StoreError;
pub use export::{RunFiles, rows_to_batch, write_csv, write_run};
pub use input::{DEFAULT_TEXT_COLUMN, load_prompt, load_reports};
