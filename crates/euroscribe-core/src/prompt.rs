//! Prompt template with a single report placeholder.

use thiserror::Error;

/// Substitution marker for the report body.
pub const REPORT_PLACEHOLDER: &str = "{REPORT}";

#[derive(Debug, Error)]
#[error("prompt template contains no {{REPORT}} placeholder")]
pub struct MissingPlaceholder;

/// System instruction plus a user-prompt template.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    system: String,
    template: String,
}

impl PromptTemplate {
    pub fn new(
        system: impl Into<String>,
        template: impl Into<String>,
    ) -> Result<Self, MissingPlaceholder> {
        let template = template.into();
        if !template.contains(REPORT_PLACEHOLDER) {
            return Err(MissingPlaceholder);
        }
        Ok(Self {
            system: system.into(),
            template,
        })
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    /// Interpolate the report body into the template.
    pub fn render(&self, report: &str) -> String {
        self.template.replace(REPORT_PLACEHOLDER, report)
    }
}
