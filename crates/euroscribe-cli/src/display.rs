//! Vertical card display for the extraction schema.

use std::fmt::Write;

use euroscribe_core::Schema;
use euroscribe_core::schema::{FieldKind, FieldSpec};

// ── Schema section groupings ──

const PATIENT: &[&str] = &["case_number", "date_of_birth", "date_of_surgery", "sex"];

const RISK_FACTORS: &[&str] = &[
    "chronic_lung_disease",
    "extracardiac_arteriopathy",
    "poor_mobility",
    "previous_cardiac_surgery",
    "active_endocarditis",
    "critical_preoperative_state",
    "dialysis",
    "diabetes_on_insulin",
    "ccs_angina_class_4",
    "recent_mi",
    "thoracic_aorta_surgery",
];

const MEASUREMENTS: &[&str] = &["creatinine", "weight"];

const CARDIAC_STATUS: &[&str] = &["lv_function", "pulmonary_hypertension", "nyha_class"];

const PROCEDURE: &[&str] = &["urgency", "major_procedure_weight"];

const SECTIONS: &[(&str, &[&str])] = &[
    ("Patient", PATIENT),
    ("Risk Factors", RISK_FACTORS),
    ("Measurements", MEASUREMENTS),
    ("Cardiac Status", CARDIAC_STATUS),
    ("Procedure", PROCEDURE),
];

// ── Public API ──

/// Print the schema as a card grouped by section.
pub fn print_schema_card(schema: &Schema) {
    print!("{}", render_schema_card(schema));
}

pub fn render_schema_card(schema: &Schema) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {} ===", schema.title());
    let _ = writeln!(out, "{} fields, extra fields rejected", schema.fields().len());

    for (header, names) in SECTIONS {
        let specs: Vec<&FieldSpec> = names.iter().filter_map(|n| schema.field(n)).collect();
        if specs.is_empty() {
            continue;
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "{header}");
        for spec in specs {
            let _ = write!(out, "  {:<28} {}", spec.name, kind_label(spec));
            if let Some(desc) = spec.description {
                let _ = write!(out, "  ({desc})");
            }
            let _ = writeln!(out);
        }
    }
    out
}

// ── Field rendering ──

fn kind_label(spec: &FieldSpec) -> String {
    let base = match spec.kind {
        FieldKind::Integer => "integer".to_string(),
        FieldKind::Decimal => "number".to_string(),
        FieldKind::Boolean => "boolean".to_string(),
        FieldKind::Date => "date dd.mm.yyyy".to_string(),
        FieldKind::Enum(values) => {
            let quoted: Vec<String> = values.iter().map(|v| format!("{v:?}")).collect();
            format!("one of {}", quoted.join(" | "))
        }
    };
    if spec.nullable {
        format!("{base} | null")
    } else {
        base
    }
}
