//! Report items handed to the extraction pipeline.

/// One report body with its stable 1-based position in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportItem {
    pub index: usize,
    pub text: String,
}

impl ReportItem {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }

    /// Number texts from 1 in iteration order.
    pub fn numbered<I, S>(texts: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| Self::new(i + 1, text))
            .collect()
    }
}
