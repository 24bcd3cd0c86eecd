//! Typed EuroSCORE II record produced by an accepted extraction.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A schema-conformant EuroSCORE II extraction.
///
/// Built only from objects that already passed
/// [`EUROSCORE2.conform`](crate::schema::Schema::conform), so its members
/// mirror [`EUROSCORE2_FIELDS`](crate::schema::EUROSCORE2_FIELDS) one to one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EuroScore2 {
    pub case_number: Option<i64>,
    /// dd.mm.yyyy
    pub date_of_birth: Option<String>,
    /// dd.mm.yyyy
    pub date_of_surgery: Option<String>,
    pub sex: Option<Sex>,

    pub chronic_lung_disease: bool,
    pub extracardiac_arteriopathy: bool,
    pub poor_mobility: bool,
    pub previous_cardiac_surgery: bool,
    pub active_endocarditis: bool,
    pub critical_preoperative_state: bool,
    pub dialysis: bool,
    pub diabetes_on_insulin: bool,
    pub ccs_angina_class_4: bool,
    pub recent_mi: bool,
    pub thoracic_aorta_surgery: bool,

    /// micromol/L
    pub creatinine: Option<f64>,
    /// kg
    pub weight: Option<f64>,

    pub lv_function: LvFunction,
    pub pulmonary_hypertension: PulmonaryHypertension,
    pub nyha_class: NyhaClass,
    pub urgency: Urgency,
    pub major_procedure_weight: MajorProcedureWeight,
}

impl EuroScore2 {
    /// Build the typed record from a conformed object.
    pub fn from_conformant(object: Map<String, Value>) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(object))
    }

    /// Flatten into an ordered key/value map for row export.
    pub fn to_fields(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }
}

/// Left ventricular function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LvFunction {
    #[serde(rename = "good")]
    Good,
    #[serde(rename = "moderate")]
    Moderate,
    #[serde(rename = "poor")]
    Poor,
    #[serde(rename = "very poor")]
    VeryPoor,
}

impl LvFunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Moderate => "moderate",
            Self::Poor => "poor",
            Self::VeryPoor => "very poor",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PulmonaryHypertension {
    No,
    #[serde(rename = "moderate")]
    Moderate,
    #[serde(rename = "severe")]
    Severe,
}

impl PulmonaryHypertension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::No => "No",
            Self::Moderate => "moderate",
            Self::Severe => "severe",
        }
    }
}

/// NYHA functional class, carried as the strings `"1"`..`"4"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NyhaClass {
    #[serde(rename = "1")]
    I,
    #[serde(rename = "2")]
    II,
    #[serde(rename = "3")]
    III,
    #[serde(rename = "4")]
    IV,
}

impl NyhaClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::I => "1",
            Self::II => "2",
            Self::III => "3",
            Self::IV => "4",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Elective,
    Urgent,
    Emergency,
    Salvage,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Elective => "elective",
            Self::Urgent => "urgent",
            Self::Emergency => "emergency",
            Self::Salvage => "salvage",
        }
    }
}

/// Weight of the intervention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MajorProcedureWeight {
    #[serde(rename = "isolated CABG")]
    IsolatedCabg,
    #[serde(rename = "single non-CABG")]
    SingleNonCabg,
    #[serde(rename = "2 procedures")]
    TwoProcedures,
    #[serde(rename = "3 procedures")]
    ThreeProcedures,
}

impl MajorProcedureWeight {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IsolatedCabg => "isolated CABG",
            Self::SingleNonCabg => "single non-CABG",
            Self::TwoProcedures => "2 procedures",
            Self::ThreeProcedures => "3 procedures",
        }
    }
}
