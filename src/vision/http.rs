//! Label source backed by an HTTP detection endpoint.

use super::{filter_labels, LabelSource, LabelSourceError, DEFAULT_MAX_LABELS, DEFAULT_MIN_CONFIDENCE};
use crate::analysis::labels::Label;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// POSTs the image as base64 and reads back `{ "labels": [...] }`.
pub struct HttpLabelSource {
    client: Client,
    url: String,
    max_labels: usize,
    min_confidence: f64,
    timeout: Duration,
}

impl HttpLabelSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            max_labels: DEFAULT_MAX_LABELS,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_limits(mut self, max_labels: usize, min_confidence: f64) -> Self {
        self.max_labels = max_labels;
        self.min_confidence = min_confidence;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl LabelSource for HttpLabelSource {
    async fn detect(&self, image: &[u8]) -> Result<Vec<Label>, LabelSourceError> {
        let request = DetectLabelsRequest {
            image: STANDARD.encode(image),
            max_labels: self.max_labels,
            min_confidence: self.min_confidence,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LabelSourceError::Timeout
                } else {
                    LabelSourceError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LabelSourceError::Service {
                status: status.as_u16(),
                message: body,
            });
        }

        let body: DetectLabelsResponse = response
            .json()
            .await
            .map_err(|e| LabelSourceError::InvalidResponse(e.to_string()))?;

        let labels = filter_labels(body.labels, self.max_labels, self.min_confidence);
        debug!(count = labels.len(), "Detected labels");
        Ok(labels)
    }
}

#[derive(Debug, Serialize)]
struct DetectLabelsRequest {
    image: String,
    max_labels: usize,
    min_confidence: f64,
}

#[derive(Debug, Deserialize)]
struct DetectLabelsResponse {
    labels: Vec<Label>,
}
