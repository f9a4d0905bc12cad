//! The per-request flow: decode, store, detect, score, orchestrate, assemble.

use super::labels::Label;
use super::orchestrator::AgentOrchestrator;
use super::prompts::PromptBuilder;
use super::response::{AnalysisResponse, ErrorResponse};
use super::scorer::HeuristicScorer;
use crate::server::metrics;
use crate::storage::{new_object_key, ImageFormat, ImageStore, StorageError};
use crate::vision::LabelSource;
use axum::response::{IntoResponse, Response};
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

pub const DEFAULT_LABEL_TIMEOUT: Duration = Duration::from_secs(30);

/// Failures that abort a request. Generative-backend failures never do.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Failed to read request body: {0}")]
    Body(String),

    #[error("Invalid request body: {0}")]
    InvalidRequest(#[from] serde_json::Error),

    #[error("No image data in request")]
    MissingImage,

    #[error("Invalid base64 image data: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("Failed to store image: {0}")]
    Storage(#[from] StorageError),
}

impl IntoResponse for AnalysisError {
    fn into_response(self) -> Response {
        ErrorResponse::new(self.to_string()).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

impl AnalyzeRequest {
    pub fn from_body(body: &[u8]) -> Result<Self, AnalysisError> {
        Ok(serde_json::from_slice(body)?)
    }
}

/// Decode a base64 payload, with or without a `data:` URL prefix.
pub fn decode_image(payload: &str) -> Result<Vec<u8>, AnalysisError> {
    let data = if payload.starts_with("data:") {
        payload.split_once(',').map(|(_, d)| d).unwrap_or("")
    } else {
        payload
    };
    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(AnalysisError::MissingImage);
    }
    Ok(STANDARD.decode(compact)?)
}

pub struct AnalysisPipeline {
    store: Arc<dyn ImageStore>,
    label_source: Arc<dyn LabelSource>,
    scorer: Arc<HeuristicScorer>,
    orchestrator: Arc<AgentOrchestrator>,
    label_timeout: Duration,
}

impl AnalysisPipeline {
    pub fn new(
        store: Arc<dyn ImageStore>,
        label_source: Arc<dyn LabelSource>,
        scorer: Arc<HeuristicScorer>,
        orchestrator: Arc<AgentOrchestrator>,
    ) -> Self {
        Self {
            store,
            label_source,
            scorer,
            orchestrator,
            label_timeout: DEFAULT_LABEL_TIMEOUT,
        }
    }

    pub fn with_label_timeout(mut self, timeout: Duration) -> Self {
        self.label_timeout = timeout;
        self
    }

    pub fn orchestrator(&self) -> &AgentOrchestrator {
        &self.orchestrator
    }

    /// Handle a raw request body.
    pub async fn analyze(&self, body: &[u8]) -> Result<AnalysisResponse, AnalysisError> {
        let result = self.analyze_body(body).await;
        match &result {
            Ok(response) => {
                metrics::record_analysis("success");
                info!(score = response.score, "Analysis complete");
            }
            Err(e) => {
                metrics::record_analysis("error");
                error!(error = %e, "Analysis failed");
            }
        }
        result
    }

    async fn analyze_body(&self, body: &[u8]) -> Result<AnalysisResponse, AnalysisError> {
        let request = AnalyzeRequest::from_body(body)?;
        let payload = request.image.as_deref().ok_or(AnalysisError::MissingImage)?;
        let image = decode_image(payload)?;
        debug!(
            filename = request.filename.as_deref().unwrap_or("-"),
            size = image.len(),
            "Decoded upload"
        );
        self.analyze_image(&image).await
    }

    /// Analyse already-decoded image bytes.
    pub async fn analyze_image(&self, image: &[u8]) -> Result<AnalysisResponse, AnalysisError> {
        let format = ImageFormat::sniff(image);
        let key = new_object_key(format.extension);
        let stored = self.store.put(&key, image, format.content_type).await?;
        info!(location = %stored.location, "Stored upload");

        let labels = self.detect_labels(image).await;
        metrics::record_label_count(labels.len());

        let heuristic = self.scorer.score(&labels);
        debug!(
            score = heuristic.total_score,
            range = %heuristic.score_range_label,
            "Heuristic score"
        );

        let prompts = PromptBuilder::new(
            &labels,
            &heuristic.features,
            &heuristic.details.categories,
            self.scorer.model(),
        );
        let outcome = self.orchestrator.run(&prompts, &heuristic).await;

        Ok(AnalysisResponse::assemble(
            outcome,
            &labels,
            heuristic.features,
            stored.location,
            Utc::now(),
        ))
    }

    /// Labels for the image; any failure or timeout yields none.
    async fn detect_labels(&self, image: &[u8]) -> Vec<Label> {
        match tokio::time::timeout(self.label_timeout, self.label_source.detect(image)).await {
            Ok(Ok(labels)) => labels,
            Ok(Err(e)) => {
                warn!(error = %e, "Label detection failed, continuing without labels");
                Vec::new()
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.label_timeout.as_millis() as u64,
                    "Label detection timed out, continuing without labels"
                );
                Vec::new()
            }
        }
    }
}
