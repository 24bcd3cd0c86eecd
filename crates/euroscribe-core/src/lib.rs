//! Core types for EuroSCORE II extraction: schema contract, validation chain,
//! response sanitizer, and the output row sets.

pub mod attempt;
pub mod prompt;
pub mod record;
pub mod report;
pub mod rows;
pub mod sanitize;
pub mod schema;
pub mod validate;

pub use attempt::{AttemptOutcome, AttemptRecord, ItemOutcome, ReplyMeta, Strategy};
pub use prompt::{MissingPlaceholder, PromptTemplate, REPORT_PLACEHOLDER};
pub use record::EuroScore2;
pub use report::ReportItem;
pub use rows::{Aggregator, Row};
pub use sanitize::strip_reasoning;
pub use schema::{EUROSCORE2, FieldViolation, Schema, SchemaError};
pub use validate::{ParseError, Validation, ValidationError, validate};
