//! Output row sets: diagnostic, parsed-JSON, and schema-valid rows.
//!
//! Rows are ordered key/value maps. Column sets differ per row (sparse); the
//! export layer takes the union of keys in first-seen order.

use serde_json::{Map, Value};

use crate::attempt::{AttemptOutcome, AttemptRecord, ItemOutcome};

pub type Row = Map<String, Value>;

/// Columns shared by every row kind.
pub const BASE_COLUMNS: &[&str] = &[
    "report_idx",
    "retry_no",
    "strategy",
    "raw_output",
    "clean_output",
    "prompt_tokens",
    "completion_tokens",
    "latency_s",
];

pub const JSON_VALID: &str = "JSON_valid";
pub const SCHEMA_VALID: &str = "pydantic_valid";
pub const SCHEMA_ERRORS: &str = "pydantic_errors";
pub const TRANSPORT_ERROR: &str = "transport_error";
pub const NUMBER_RETRIES: &str = "number_retries";
/// Holds non-object JSON output in the JSON row set.
pub const JSON_VALUE: &str = "json_value";

/// Append-only collector of the three row sets for a run.
///
/// Owned by a single task; workers hand over finished [`ItemOutcome`]s.
#[derive(Debug, Default)]
pub struct Aggregator {
    raw: Vec<Row>,
    json: Vec<Row>,
    valid: Vec<Row>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold every attempt of one item into the row sets.
    pub fn absorb(&mut self, outcome: &ItemOutcome) {
        for attempt in &outcome.attempts {
            if let Some(row) = json_row(outcome.index, attempt) {
                self.json.push(row);
            }
            self.raw.push(raw_row(outcome.index, attempt));
            if let Some(row) = valid_row(outcome.index, attempt) {
                self.valid.push(row);
            }
        }
    }

    pub fn raw_rows(&self) -> &[Row] {
        &self.raw
    }

    pub fn json_rows(&self) -> &[Row] {
        &self.json
    }

    pub fn valid_rows(&self) -> &[Row] {
        &self.valid
    }

    /// Number of accepted items.
    pub fn accepted(&self) -> usize {
        self.valid.len()
    }
}

fn base_row(index: usize, attempt: &AttemptRecord) -> Row {
    let mut row = Row::new();
    row.insert("report_idx".into(), Value::from(index));
    row.insert("retry_no".into(), Value::from(attempt.attempt));
    row.insert("strategy".into(), Value::from(attempt.strategy.as_str()));
    row.insert("raw_output".into(), Value::from(attempt.raw_output.as_str()));
    row.insert("clean_output".into(), Value::from(attempt.clean_output.as_str()));
    row.insert("prompt_tokens".into(), opt(attempt.meta.prompt_tokens));
    row.insert("completion_tokens".into(), opt(attempt.meta.completion_tokens));
    row.insert("latency_s".into(), opt(attempt.meta.latency_s));
    row
}

fn opt<T: Into<Value>>(v: Option<T>) -> Value {
    v.map(Into::into).unwrap_or(Value::Null)
}

/// One diagnostic row per attempt, whatever the outcome.
pub fn raw_row(index: usize, attempt: &AttemptRecord) -> Row {
    let mut row = base_row(index, attempt);
    row.insert(JSON_VALID.into(), Value::Bool(attempt.outcome.is_json()));
    row.insert(SCHEMA_VALID.into(), Value::Bool(attempt.outcome.is_valid()));
    match &attempt.outcome {
        AttemptOutcome::Schema { error, .. } => {
            row.insert(SCHEMA_ERRORS.into(), error.to_json());
        }
        AttemptOutcome::Transport { error } => {
            row.insert(TRANSPORT_ERROR.into(), Value::from(error.as_str()));
        }
        AttemptOutcome::Parse { .. } | AttemptOutcome::Valid { .. } => {}
    }
    row
}

/// Flattened parsed output for every syntactically valid attempt.
///
/// Keys outside the schema are preserved. A model key that collides with a
/// base column is stored as `json_<key>` so diagnostics are never overwritten.
pub fn json_row(index: usize, attempt: &AttemptRecord) -> Option<Row> {
    let parsed = attempt.outcome.parsed()?;
    let mut row = base_row(index, attempt);
    match parsed {
        Value::Object(obj) => {
            for (key, value) in obj {
                if row.contains_key(key) {
                    row.insert(format!("json_{key}"), value.clone());
                } else {
                    row.insert(key.clone(), value.clone());
                }
            }
        }
        other => {
            row.insert(JSON_VALUE.into(), other.clone());
        }
    }
    Some(row)
}

/// The accepted record plus its retry count, for the accepting attempt only.
pub fn valid_row(index: usize, attempt: &AttemptRecord) -> Option<Row> {
    let AttemptOutcome::Valid { record, .. } = &attempt.outcome else {
        return None;
    };
    let mut row = base_row(index, attempt);
    row.extend(record.to_fields());
    row.insert(NUMBER_RETRIES.into(), Value::from(attempt.attempt));
    Some(row)
}
