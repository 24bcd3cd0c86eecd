//! EuroSCORE II field table and the contract compiled from it.
//!
//! One declarative table drives both the JSON Schema sent to the model as a
//! structured-output constraint and the conformance check applied to whatever
//! comes back, so "what we ask for" and "what we accept" cannot drift apart.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Number, Value, json};
use thiserror::Error;

/// dd.mm.yyyy
pub const DATE_PATTERN: &str = r"^[0-9]{2}\.[0-9]{2}\.[0-9]{4}$";

static DATE_RX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DATE_PATTERN).expect("date pattern compiles"));

pub const SEX: &[&str] = &["male", "female"];
pub const LV_FUNCTION: &[&str] = &["good", "moderate", "poor", "very poor"];
pub const PULMONARY_HYPERTENSION: &[&str] = &["No", "moderate", "severe"];
pub const NYHA_CLASS: &[&str] = &["1", "2", "3", "4"];
pub const URGENCY: &[&str] = &["elective", "urgent", "emergency", "salvage"];
pub const MAJOR_PROCEDURE_WEIGHT: &[&str] = &[
    "isolated CABG",
    "single non-CABG",
    "2 procedures",
    "3 procedures",
];

/// Semantic type of a schema member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Decimal,
    Boolean,
    /// String matching [`DATE_PATTERN`].
    Date,
    /// One of a closed set of string literals.
    Enum(&'static [&'static str]),
}

/// One declared member of a [`Schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub nullable: bool,
    pub description: Option<&'static str>,
}

const fn required(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        nullable: false,
        description: None,
    }
}

const fn nullable(name: &'static str, kind: FieldKind, description: Option<&'static str>) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        nullable: true,
        description,
    }
}

// ── EuroSCORE II ──

pub const EUROSCORE2_FIELDS: &[FieldSpec] = &[
    // identifiers & demographics
    nullable("case_number", FieldKind::Integer, Some("Report ID")),
    nullable("date_of_birth", FieldKind::Date, Some("dd.mm.yyyy | null")),
    nullable("date_of_surgery", FieldKind::Date, Some("dd.mm.yyyy | null")),
    nullable("sex", FieldKind::Enum(SEX), None),
    // binary flags
    required("chronic_lung_disease", FieldKind::Boolean),
    required("extracardiac_arteriopathy", FieldKind::Boolean),
    required("poor_mobility", FieldKind::Boolean),
    required("previous_cardiac_surgery", FieldKind::Boolean),
    required("active_endocarditis", FieldKind::Boolean),
    required("critical_preoperative_state", FieldKind::Boolean),
    required("dialysis", FieldKind::Boolean),
    required("diabetes_on_insulin", FieldKind::Boolean),
    required("ccs_angina_class_4", FieldKind::Boolean),
    required("recent_mi", FieldKind::Boolean),
    required("thoracic_aorta_surgery", FieldKind::Boolean),
    // numeric
    nullable("creatinine", FieldKind::Decimal, Some("micromol/L | null")),
    nullable("weight", FieldKind::Decimal, Some("kg | null")),
    // categorical
    required("lv_function", FieldKind::Enum(LV_FUNCTION)),
    required("pulmonary_hypertension", FieldKind::Enum(PULMONARY_HYPERTENSION)),
    required("nyha_class", FieldKind::Enum(NYHA_CLASS)),
    required("urgency", FieldKind::Enum(URGENCY)),
    required("major_procedure_weight", FieldKind::Enum(MAJOR_PROCEDURE_WEIGHT)),
];

/// The EuroSCORE II extraction contract. Extra fields are forbidden.
pub static EUROSCORE2: Schema = Schema {
    title: "EuroScore2Strict",
    fields: EUROSCORE2_FIELDS,
};

/// A closed record contract: every declared field must be present, nothing else may be.
#[derive(Debug)]
pub struct Schema {
    title: &'static str,
    fields: &'static [FieldSpec],
}

impl Schema {
    pub fn title(&self) -> &'static str {
        self.title
    }

    /// Declared fields, in declaration order.
    pub fn fields(&self) -> &'static [FieldSpec] {
        self.fields
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name)
    }

    /// Compile the table into a JSON Schema object usable as a structured-output constraint.
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.name.to_string(), f.json_schema()))
            .collect();
        let required: Vec<&str> = self.field_names().collect();

        json!({
            "title": self.title,
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    /// Check `value` against the contract.
    ///
    /// All-or-nothing: on success returns the coerced object with fields in
    /// declaration order; on failure returns every violation found.
    pub fn conform(&self, value: &Value) -> Result<Map<String, Value>, SchemaError> {
        let Some(object) = value.as_object() else {
            return Err(SchemaError::from(vec![FieldViolation {
                kind: ViolationKind::ModelType,
                loc: String::new(),
                msg: format!("Input should be an object matching {}", self.title),
                input: Some(value.clone()),
            }]));
        };

        let mut normalized = Map::new();
        let mut violations = Vec::new();

        for spec in self.fields {
            match object.get(spec.name) {
                None => violations.push(FieldViolation {
                    kind: ViolationKind::Missing,
                    loc: spec.name.to_string(),
                    msg: "Field required".to_string(),
                    input: None,
                }),
                Some(raw) => match spec.check(raw) {
                    Ok(v) => {
                        normalized.insert(spec.name.to_string(), v);
                    }
                    Err(violation) => violations.push(violation),
                },
            }
        }

        for (key, raw) in object {
            if self.field(key).is_none() {
                violations.push(FieldViolation {
                    kind: ViolationKind::ExtraForbidden,
                    loc: key.clone(),
                    msg: "Extra inputs are not permitted".to_string(),
                    input: Some(raw.clone()),
                });
            }
        }

        if violations.is_empty() {
            Ok(normalized)
        } else {
            Err(SchemaError::from(violations))
        }
    }
}

impl FieldSpec {
    /// `case_number` → `Case Number`.
    pub fn title(&self) -> String {
        self.name
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            })
            .collect::<Vec<String>>()
            .join(" ")
    }

    fn json_schema(&self) -> Value {
        let base = match self.kind {
            FieldKind::Integer => json!({ "type": "integer" }),
            FieldKind::Decimal => json!({ "type": "number" }),
            FieldKind::Boolean => json!({ "type": "boolean" }),
            FieldKind::Date => json!({ "type": "string", "pattern": DATE_PATTERN }),
            FieldKind::Enum(values) => json!({ "type": "string", "enum": values }),
        };

        let mut schema = if self.nullable {
            json!({ "anyOf": [base, { "type": "null" }] })
        } else {
            base
        };
        if let Some(obj) = schema.as_object_mut() {
            obj.insert("title".into(), Value::String(self.title()));
            if let Some(description) = self.description {
                obj.insert("description".into(), Value::String(description.into()));
            }
        }
        schema
    }

    /// Validate and coerce one member value.
    fn check(&self, value: &Value) -> Result<Value, FieldViolation> {
        if value.is_null() {
            return if self.nullable {
                Ok(Value::Null)
            } else {
                Err(self.type_violation(value))
            };
        }

        match self.kind {
            FieldKind::Integer => coerce_integer(value).map_err(|kind| match kind {
                ViolationKind::IntFromFloat => self.violation(
                    kind,
                    "Input should be a valid integer, got a number with a fractional part",
                    value,
                ),
                _ => self.type_violation(value),
            }),
            FieldKind::Decimal => coerce_decimal(value).ok_or_else(|| self.type_violation(value)),
            FieldKind::Boolean => coerce_bool(value)
                .map(Value::Bool)
                .ok_or_else(|| self.type_violation(value)),
            FieldKind::Date => match value.as_str() {
                Some(s) if DATE_RX.is_match(s) => Ok(value.clone()),
                Some(_) => Err(self.violation(
                    ViolationKind::ValueError,
                    "Value error, must be dd.mm.yyyy or null",
                    value,
                )),
                None => Err(self.type_violation(value)),
            },
            FieldKind::Enum(allowed) => match value.as_str() {
                Some(s) if allowed.contains(&s) => Ok(value.clone()),
                _ => Err(self.type_violation(value)),
            },
        }
    }

    fn type_violation(&self, value: &Value) -> FieldViolation {
        match self.kind {
            FieldKind::Integer => {
                self.violation(ViolationKind::IntType, "Input should be a valid integer", value)
            }
            FieldKind::Decimal => {
                self.violation(ViolationKind::FloatType, "Input should be a valid number", value)
            }
            FieldKind::Boolean => {
                self.violation(ViolationKind::BoolType, "Input should be a valid boolean", value)
            }
            FieldKind::Date => {
                self.violation(ViolationKind::StringType, "Input should be a valid string", value)
            }
            FieldKind::Enum(allowed) => self.violation(
                ViolationKind::LiteralError,
                &format!("Input should be {}", literal_list(allowed)),
                value,
            ),
        }
    }

    fn violation(&self, kind: ViolationKind, msg: &str, value: &Value) -> FieldViolation {
        FieldViolation {
            kind,
            loc: self.name.to_string(),
            msg: msg.to_string(),
            input: Some(value.clone()),
        }
    }
}

fn coerce_integer(value: &Value) -> Result<Value, ViolationKind> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.is_finite() && f.fract() != 0.0 => Err(ViolationKind::IntFromFloat),
            // Integral floats outside i64 fall through to int_type.
            Some(f) if f.is_finite() && f.abs() < i64::MAX as f64 => {
                Ok(Value::Number(Number::from(f as i64)))
            }
            _ => Err(ViolationKind::IntType),
        },
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(|i| Value::Number(Number::from(i)))
            .map_err(|_| ViolationKind::IntType),
        _ => Err(ViolationKind::IntType),
    }
}

fn coerce_decimal(value: &Value) -> Option<Value> {
    let f = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    Number::from_f64(f).map(Value::Number)
}

fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f == 0.0 => Some(false),
            Some(f) if f == 1.0 => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "t" | "y" | "1" => Some(true),
            "false" | "no" | "off" | "f" | "n" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// `'a', 'b' or 'c'`
fn literal_list(allowed: &[&str]) -> String {
    let quoted: Vec<String> = allowed.iter().map(|v| format!("'{v}'")).collect();
    match quoted.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!("{} or {last}", rest.join(", ")),
        Some((last, _)) => last.clone(),
        None => String::new(),
    }
}

// ── Violations ──

/// Category of a field-level contract violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    Missing,
    ExtraForbidden,
    ModelType,
    IntType,
    IntFromFloat,
    FloatType,
    BoolType,
    StringType,
    LiteralError,
    ValueError,
}

/// A single field-level violation, serialised into the diagnostic row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldViolation {
    #[serde(rename = "type")]
    pub kind: ViolationKind,
    /// Offending field name; empty for whole-object violations.
    pub loc: String,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.loc.is_empty() {
            write!(f, "{}", self.msg)
        } else {
            write!(f, "{}: {}", self.loc, self.msg)
        }
    }
}

/// Well-formed output that does not satisfy the contract.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{} schema violation(s): {}", .violations.len(), summarize(.violations))]
pub struct SchemaError {
    pub violations: Vec<FieldViolation>,
}

impl From<Vec<FieldViolation>> for SchemaError {
    fn from(violations: Vec<FieldViolation>) -> Self {
        Self { violations }
    }
}

impl SchemaError {
    /// Violations as a JSON array for the diagnostic row.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(&self.violations).unwrap_or(Value::Null)
    }
}

fn summarize(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_object() -> Value {
        json!({
            "case_number": 17,
            "date_of_birth": "04.11.1951",
            "date_of_surgery": "12.03.2021",
            "sex": "male",
            "chronic_lung_disease": false,
            "extracardiac_arteriopathy": true,
            "poor_mobility": false,
            "previous_cardiac_surgery": false,
            "active_endocarditis": false,
            "critical_preoperative_state": false,
            "dialysis": false,
            "diabetes_on_insulin": true,
            "ccs_angina_class_4": false,
            "recent_mi": false,
            "thoracic_aorta_surgery": false,
            "creatinine": 96.5,
            "weight": 82,
            "lv_function": "moderate",
            "pulmonary_hypertension": "No",
            "nyha_class": "2",
            "urgency": "elective",
            "major_procedure_weight": "isolated CABG"
        })
    }

    fn kinds(err: &SchemaError) -> Vec<(ViolationKind, &str)> {
        err.violations
            .iter()
            .map(|v| (v.kind, v.loc.as_str()))
            .collect()
    }

    #[test]
    fn euroscore2_has_expected_fields() {
        assert_eq!(EUROSCORE2.fields().len(), 22);
        assert!(EUROSCORE2.field("nyha_class").is_some());
        assert!(EUROSCORE2.field("ejection_fraction").is_none());
    }

    #[test]
    fn json_schema_requires_every_field_and_forbids_extras() {
        let schema = EUROSCORE2.to_json_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["additionalProperties"], false);
        assert_eq!(schema["required"].as_array().unwrap().len(), 22);
        assert_eq!(schema["properties"].as_object().unwrap().len(), 22);
    }

    #[test]
    fn json_schema_encodes_nullability_enums_and_pattern() {
        let schema = EUROSCORE2.to_json_schema();
        let props = &schema["properties"];

        assert_eq!(props["case_number"]["anyOf"][0]["type"], "integer");
        assert_eq!(props["case_number"]["anyOf"][1]["type"], "null");
        assert_eq!(props["case_number"]["title"], "Case Number");
        assert_eq!(props["case_number"]["description"], "Report ID");

        assert_eq!(props["date_of_birth"]["anyOf"][0]["pattern"], DATE_PATTERN);
        assert_eq!(props["dialysis"]["type"], "boolean");
        assert_eq!(props["lv_function"]["enum"], json!(LV_FUNCTION));
        assert_eq!(props["sex"]["anyOf"][0]["enum"], json!(["male", "female"]));
    }

    #[test]
    fn conform_accepts_valid_object_in_declared_order() {
        let normalized = EUROSCORE2.conform(&valid_object()).unwrap();
        let keys: Vec<&str> = normalized.keys().map(String::as_str).collect();
        let declared: Vec<&str> = EUROSCORE2.field_names().collect();
        assert_eq!(keys, declared);
    }

    #[test]
    fn conform_accepts_nulls_for_nullable_fields() {
        let mut obj = valid_object();
        for key in ["case_number", "date_of_birth", "date_of_surgery", "sex", "creatinine", "weight"] {
            obj[key] = Value::Null;
        }
        assert!(EUROSCORE2.conform(&obj).is_ok());
    }

    #[test]
    fn conform_rejects_null_for_required_flag() {
        let mut obj = valid_object();
        obj["dialysis"] = Value::Null;
        let err = EUROSCORE2.conform(&obj).unwrap_err();
        assert_eq!(kinds(&err), vec![(ViolationKind::BoolType, "dialysis")]);
    }

    #[test]
    fn conform_reports_missing_fields() {
        let mut obj = valid_object();
        obj.as_object_mut().unwrap().remove("urgency");
        let err = EUROSCORE2.conform(&obj).unwrap_err();
        assert_eq!(kinds(&err), vec![(ViolationKind::Missing, "urgency")]);
    }

    #[test]
    fn conform_rejects_extra_fields() {
        let mut obj = valid_object();
        obj["ejection_fraction"] = json!(45);
        let err = EUROSCORE2.conform(&obj).unwrap_err();
        assert_eq!(
            kinds(&err),
            vec![(ViolationKind::ExtraForbidden, "ejection_fraction")]
        );
    }

    #[test]
    fn conform_rejects_out_of_enum_value() {
        let mut obj = valid_object();
        obj["sex"] = json!("unknown");
        let err = EUROSCORE2.conform(&obj).unwrap_err();
        assert_eq!(kinds(&err), vec![(ViolationKind::LiteralError, "sex")]);
        assert_eq!(err.violations[0].msg, "Input should be 'male' or 'female'");
    }

    #[test]
    fn conform_rejects_integer_nyha_class() {
        let mut obj = valid_object();
        obj["nyha_class"] = json!(3);
        let err = EUROSCORE2.conform(&obj).unwrap_err();
        assert_eq!(kinds(&err), vec![(ViolationKind::LiteralError, "nyha_class")]);
    }

    #[test]
    fn conform_rejects_bad_date_pattern() {
        let mut obj = valid_object();
        obj["date_of_surgery"] = json!("2021-03-12");
        obj["date_of_birth"] = json!(19511104);
        let err = EUROSCORE2.conform(&obj).unwrap_err();
        assert_eq!(
            kinds(&err),
            vec![
                (ViolationKind::StringType, "date_of_birth"),
                (ViolationKind::ValueError, "date_of_surgery"),
            ]
        );
    }

    #[test]
    fn conform_collects_all_violations() {
        let mut obj = valid_object();
        obj["sex"] = json!("unknown");
        obj["recent_mi"] = json!("maybe");
        obj["extra"] = json!(1);
        let err = EUROSCORE2.conform(&obj).unwrap_err();
        assert_eq!(err.violations.len(), 3);
        assert!(err.to_string().starts_with("3 schema violation(s)"));
    }

    #[test]
    fn conform_rejects_non_object() {
        let err = EUROSCORE2.conform(&json!([1, 2, 3])).unwrap_err();
        assert_eq!(kinds(&err), vec![(ViolationKind::ModelType, "")]);
    }

    #[test]
    fn lax_coercion_of_numbers_and_flags() {
        let mut obj = valid_object();
        obj["case_number"] = json!("42");
        obj["creatinine"] = json!("101.3");
        obj["weight"] = json!(70);
        obj["dialysis"] = json!(1);
        obj["recent_mi"] = json!("No");
        let normalized = EUROSCORE2.conform(&obj).unwrap();
        assert_eq!(normalized["case_number"], json!(42));
        assert_eq!(normalized["creatinine"], json!(101.3));
        assert_eq!(normalized["weight"], json!(70.0));
        assert_eq!(normalized["dialysis"], json!(true));
        assert_eq!(normalized["recent_mi"], json!(false));
    }

    #[test]
    fn integer_rejects_fractional_float() {
        let mut obj = valid_object();
        obj["case_number"] = json!(4.5);
        let err = EUROSCORE2.conform(&obj).unwrap_err();
        assert_eq!(kinds(&err), vec![(ViolationKind::IntFromFloat, "case_number")]);

        obj["case_number"] = json!(4.0);
        let normalized = EUROSCORE2.conform(&obj).unwrap();
        assert_eq!(normalized["case_number"], json!(4));
    }

    #[test]
    fn integer_out_of_range_is_a_type_error() {
        let mut obj = valid_object();
        obj["case_number"] = json!(1e19);
        let err = EUROSCORE2.conform(&obj).unwrap_err();
        assert_eq!(kinds(&err), vec![(ViolationKind::IntType, "case_number")]);
        assert_eq!(err.violations[0].msg, "Input should be a valid integer");
    }

    #[test]
    fn violations_serialise_with_type_key() {
        let mut obj = valid_object();
        obj["sex"] = json!("unknown");
        let err = EUROSCORE2.conform(&obj).unwrap_err();
        let json = err.to_json();
        assert_eq!(json[0]["type"], "literal_error");
        assert_eq!(json[0]["loc"], "sex");
        assert_eq!(json[0]["input"], "unknown");
    }

    #[test]
    fn literal_list_formatting() {
        assert_eq!(literal_list(&["a"]), "'a'");
        assert_eq!(literal_list(&["a", "b", "c"]), "'a', 'b' or 'c'");
    }
}
