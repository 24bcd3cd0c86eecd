//! Per-attempt and per-item extraction records.

use serde::Serialize;
use serde_json::Value;

use crate::record::EuroScore2;
use crate::schema::SchemaError;
use crate::validate::Validation;

/// Prompting strategy of one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Natural-language instruction only.
    Unconstrained,
    /// Instruction plus the compiled schema as a structured-output constraint.
    Constrained,
}

impl Strategy {
    /// Attempt 0 queries the model unconstrained; every later attempt is constrained.
    pub fn for_attempt(attempt: u32) -> Self {
        if attempt == 0 {
            Self::Unconstrained
        } else {
            Self::Constrained
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unconstrained => "unconstrained",
            Self::Constrained => "constrained",
        }
    }
}

/// Timing and token metadata reported alongside a model reply.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReplyMeta {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    /// Seconds.
    pub latency_s: Option<f64>,
}

/// How one attempt ended.
#[derive(Debug, Clone)]
pub enum AttemptOutcome {
    /// The endpoint could not be reached after transport backoff.
    Transport { error: String },
    Parse { error: String },
    Schema { value: Value, error: SchemaError },
    Valid { value: Value, record: EuroScore2 },
}

impl AttemptOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    pub fn is_json(&self) -> bool {
        matches!(self, Self::Schema { .. } | Self::Valid { .. })
    }

    /// The parsed output, for syntactically valid attempts.
    pub fn parsed(&self) -> Option<&Value> {
        match self {
            Self::Schema { value, .. } | Self::Valid { value, .. } => Some(value),
            Self::Transport { .. } | Self::Parse { .. } => None,
        }
    }
}

impl From<Validation> for AttemptOutcome {
    fn from(validation: Validation) -> Self {
        match validation {
            Validation::ParseFailed(e) => Self::Parse {
                error: e.to_string(),
            },
            Validation::SchemaFailed { value, error } => Self::Schema { value, error },
            Validation::Valid { value, record } => Self::Valid { value, record },
        }
    }
}

/// One request/sanitize/validate cycle for a single report.
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    /// 0-based retry number.
    pub attempt: u32,
    pub strategy: Strategy,
    pub raw_output: String,
    pub clean_output: String,
    pub meta: ReplyMeta,
    pub outcome: AttemptOutcome,
}

/// Every attempt made for one report, in order.
#[derive(Debug, Clone)]
pub struct ItemOutcome {
    pub index: usize,
    pub attempts: Vec<AttemptRecord>,
}

impl ItemOutcome {
    /// The accepting attempt. Only ever the last one.
    pub fn accepted(&self) -> Option<&AttemptRecord> {
        self.attempts.last().filter(|a| a.outcome.is_valid())
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.len()
    }
}
