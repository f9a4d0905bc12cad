//! Detected labels and the summaries derived from them.

use serde::{Deserialize, Serialize};

/// Number of labels echoed back to the caller.
pub const RESPONSE_LABEL_COUNT: usize = 5;

/// A visual concept detected in an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    /// Detection confidence in the 0-100 range.
    pub confidence: f64,
    #[serde(default)]
    pub categories: Vec<String>,
}

impl Label {
    pub fn new(name: impl Into<String>, confidence: f64) -> Self {
        Self {
            name: name.into(),
            confidence,
            categories: Vec::new(),
        }
    }

    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = categories;
        self
    }
}

/// The `{name, confidence}` projection of a label returned in responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelSummary {
    pub name: String,
    pub confidence: f64,
}

impl From<&Label> for LabelSummary {
    fn from(label: &Label) -> Self {
        Self {
            name: label.name.clone(),
            confidence: label.confidence,
        }
    }
}

/// First `count` labels in detection order.
pub fn top_labels(labels: &[Label], count: usize) -> &[Label] {
    &labels[..labels.len().min(count)]
}

/// Summaries of the labels echoed back to the caller.
pub fn response_labels(labels: &[Label]) -> Vec<LabelSummary> {
    top_labels(labels, RESPONSE_LABEL_COUNT)
        .iter()
        .map(LabelSummary::from)
        .collect()
}

/// Mean confidence over all labels, `None` when there are none.
pub fn mean_confidence(labels: &[Label]) -> Option<f64> {
    if labels.is_empty() {
        return None;
    }
    Some(labels.iter().map(|l| l.confidence).sum::<f64>() / labels.len() as f64)
}
