//! Label detection over uploaded images.

mod http;

pub use http::HttpLabelSource;

use crate::analysis::labels::Label;
use async_trait::async_trait;
use thiserror::Error;

pub const DEFAULT_MAX_LABELS: usize = 20;
pub const DEFAULT_MIN_CONFIDENCE: f64 = 45.0;

#[derive(Debug, Error)]
pub enum LabelSourceError {
    #[error("Label detection is not configured")]
    Disabled,

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Label service error (status {status}): {message}")]
    Service { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request timeout")]
    Timeout,
}

/// Returns labels in detection order, which need not be sorted by confidence.
#[async_trait]
pub trait LabelSource: Send + Sync {
    async fn detect(&self, image: &[u8]) -> Result<Vec<Label>, LabelSourceError>;
}

/// Used when no detection endpoint is configured.
pub struct DisabledLabelSource;

#[async_trait]
impl LabelSource for DisabledLabelSource {
    async fn detect(&self, _image: &[u8]) -> Result<Vec<Label>, LabelSourceError> {
        Err(LabelSourceError::Disabled)
    }
}

/// Apply the confidence floor and count cap, normalising confidences.
pub fn filter_labels(labels: Vec<Label>, max_labels: usize, min_confidence: f64) -> Vec<Label> {
    labels
        .into_iter()
        .filter(|l| l.confidence.is_finite() && l.confidence >= min_confidence)
        .map(|mut l| {
            l.confidence = ((l.confidence * 100.0).round() / 100.0).clamp(0.0, 100.0);
            l
        })
        .take(max_labels)
        .collect()
}
