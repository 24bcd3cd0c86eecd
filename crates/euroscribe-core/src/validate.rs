//! Validation chain: structured-data parsing, then schema conformance.

use serde_json::Value;
use thiserror::Error;

use crate::record::EuroScore2;
use crate::schema::{EUROSCORE2, FieldViolation, SchemaError, ViolationKind};

/// Model output that is not well-formed JSON.
#[derive(Debug, Error)]
#[error("not well-formed JSON: {0}")]
pub struct ParseError(#[from] pub serde_json::Error);

/// Tri-state outcome of [`validate`].
#[derive(Debug)]
pub enum Validation {
    ParseFailed(ParseError),
    /// Parsed, but not conformant. `value` is kept for the JSON row set.
    SchemaFailed { value: Value, error: SchemaError },
    Valid { value: Value, record: EuroScore2 },
}

/// A conformant extraction together with the JSON it was parsed from.
#[derive(Debug, Clone)]
pub struct Accepted {
    pub value: Value,
    pub record: EuroScore2,
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("{error}")]
    Schema { value: Value, error: SchemaError },
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    /// The parsed JSON, if parsing succeeded.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::ParseFailed(_) => None,
            Self::SchemaFailed { value, .. } | Self::Valid { value, .. } => Some(value),
        }
    }

    pub fn into_result(self) -> Result<Accepted, ValidationError> {
        match self {
            Self::ParseFailed(e) => Err(ValidationError::Parse(e)),
            Self::SchemaFailed { value, error } => Err(ValidationError::Schema { value, error }),
            Self::Valid { value, record } => Ok(Accepted { value, record }),
        }
    }
}

/// Run `text` through the EuroSCORE II validation chain.
///
/// Conformance is all-or-nothing: there is no partial acceptance.
pub fn validate(text: &str) -> Validation {
    let value: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => return Validation::ParseFailed(ParseError(e)),
    };

    let normalized = match EUROSCORE2.conform(&value) {
        Ok(obj) => obj,
        Err(error) => return Validation::SchemaFailed { value, error },
    };

    match EuroScore2::from_conformant(normalized) {
        Ok(record) => Validation::Valid { value, record },
        Err(e) => Validation::SchemaFailed {
            value,
            error: SchemaError::from(vec![FieldViolation {
                kind: ViolationKind::ValueError,
                loc: String::new(),
                msg: format!("Value error, {e}"),
                input: None,
            }]),
        },
    }
}
