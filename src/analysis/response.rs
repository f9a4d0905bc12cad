//! Success and error contracts returned to the caller.

use super::features::FeatureFlags;
use super::labels::{response_labels, Label, LabelSummary};
use super::orchestrator::AgentOutcome;
use axum::{
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

pub const SUCCESS_MESSAGE: &str = "AI analysis complete!";
pub const ERROR_SUMMARY: &str = "An error occurred during processing";

/// Headers attached to every analysis response, including preflight.
pub const CORS_HEADERS: [(HeaderName, &str); 3] = [
    (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
    (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
    (header::ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub message: String,
    pub s3_location: String,
    pub score: u32,
    pub ai_evaluation: String,
    pub rekognition_labels: Vec<LabelSummary>,
    pub ai_advice: String,
    pub improvement_tips: Vec<String>,
    pub features: FeatureFlags,
    pub timestamp: String,
}

impl AnalysisResponse {
    /// Merge the agent outcome with the request's labels and storage location.
    pub fn assemble(
        outcome: AgentOutcome,
        labels: &[Label],
        features: FeatureFlags,
        location: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let AgentOutcome { evaluation, advice } = outcome;
        Self {
            message: SUCCESS_MESSAGE.to_string(),
            s3_location: location.into(),
            score: evaluation.score,
            ai_evaluation: evaluation.evaluation_text,
            rekognition_labels: response_labels(labels),
            ai_advice: advice.main_advice,
            improvement_tips: advice.improvement_tips,
            features,
            timestamp: now.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: ERROR_SUMMARY.to_string(),
            message: message.into(),
        }
    }
}

fn with_cors(status: StatusCode, body: impl IntoResponse) -> Response {
    let mut response = (status, body).into_response();
    let headers = response.headers_mut();
    for (name, value) in CORS_HEADERS {
        headers.insert(name, HeaderValue::from_static(value));
    }
    response
}

impl IntoResponse for AnalysisResponse {
    fn into_response(self) -> Response {
        with_cors(StatusCode::OK, Json(self))
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        with_cors(StatusCode::INTERNAL_SERVER_ERROR, Json(self))
    }
}

/// Empty 200 answer to a CORS preflight.
pub fn preflight_response() -> Response {
    with_cors(StatusCode::OK, ())
}
