use anyhow::{Context, Result};
use std::time::Duration;

use tracing::{error, info};

use axum::{
    body::Body,
    extract::State,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use super::{log_requests, metrics, state::*, ServerConfig};
use crate::analysis::response::preflight_response;
use crate::analysis::AnalysisError;

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub version: String,
    pub llm_provider: Option<String>,
    pub llm_model: Option<String>,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let provider = state.pipeline.orchestrator().provider();
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        version: env!("CARGO_PKG_VERSION").to_string(),
        llm_provider: provider.map(|p| p.name().to_string()),
        llm_model: provider.map(|p| p.model().to_string()),
    };
    Json(stats)
}

async fn analyze(State(state): State<ServerState>, body: Body) -> Response {
    let bytes = match axum::body::to_bytes(body, state.config.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            metrics::record_analysis("error");
            error!("Failed to read request body: {}", e);
            return AnalysisError::Body(e.to_string()).into_response();
        }
    };

    match state.pipeline.analyze(&bytes).await {
        Ok(response) => response.into_response(),
        Err(e) => e.into_response(),
    }
}

async fn preflight() -> Response {
    preflight_response()
}

pub fn make_app(config: ServerConfig, pipeline: GuardedPipeline) -> Router {
    let state = ServerState::new(config, pipeline);

    Router::new()
        .route("/", get(home).post(analyze).options(preflight))
        .route("/analyze", post(analyze).options(preflight))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            log_requests,
        ))
        .with_state(state)
}

fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics::metrics_handler))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

pub async fn run_server(config: ServerConfig, pipeline: GuardedPipeline) -> Result<()> {
    if config.metrics_port > 0 {
        let metrics_addr = format!("{}:{}", config.bind_address, config.metrics_port);
        let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
            .await
            .with_context(|| format!("Failed to bind metrics server to {}", metrics_addr))?;
        info!("Metrics available at {}/metrics", metrics_addr);
        tokio::spawn(async move {
            if let Err(e) = axum::serve(metrics_listener, make_metrics_app()).await {
                error!("Metrics server failed: {}", e);
            }
        });
    }

    let addr = format!("{}:{}", config.bind_address, config.port);
    let app = make_app(config, pipeline);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Ready to serve at {}!", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::labels::Label;
    use crate::analysis::orchestrator::FALLBACK_EVALUATION_TEXT;
    use crate::analysis::response::ERROR_SUMMARY;
    use crate::analysis::{AgentOrchestrator, AnalysisPipeline, HeuristicScorer};
    use crate::storage::LocalImageStore;
    use crate::vision::{LabelSource, LabelSourceError};
    use async_trait::async_trait;
    use axum::http::{header, Request, StatusCode};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt; // for `oneshot`

    struct StaticLabels(Vec<Label>);

    #[async_trait]
    impl LabelSource for StaticLabels {
        async fn detect(&self, _image: &[u8]) -> Result<Vec<Label>, LabelSourceError> {
            Ok(self.0.clone())
        }
    }

    fn test_app(dir: &TempDir) -> Router {
        let pipeline = AnalysisPipeline::new(
            Arc::new(LocalImageStore::new(dir.path())),
            Arc::new(StaticLabels(vec![Label::new("Bird", 91.0)])),
            Arc::new(HeuristicScorer::default()),
            Arc::new(AgentOrchestrator::new(None)),
        );
        make_app(ServerConfig::default(), Arc::new(pipeline))
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(Duration::from_secs(90_061)), "1d 01:01:01");
    }

    #[tokio::test]
    async fn home_reports_status() {
        let dir = TempDir::new().unwrap();
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = test_app(&dir).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        assert!(body["llm_provider"].is_null());
    }

    #[tokio::test]
    async fn analyzes_on_both_routes() {
        let dir = TempDir::new().unwrap();
        for uri in ["/analyze", "/"] {
            let request = Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"image": "aGVsbG8="}"#))
                .unwrap();
            let response = test_app(&dir).oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{}", uri);
            assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

            let body = json_body(response).await;
            assert_eq!(body["ai_evaluation"], FALLBACK_EVALUATION_TEXT);
            assert_eq!(body["rekognition_labels"][0]["name"], "Bird");
        }
    }

    #[tokio::test]
    async fn malformed_body_yields_error_contract() {
        let dir = TempDir::new().unwrap();
        let request = Request::builder()
            .method("POST")
            .uri("/analyze")
            .body(Body::from("not json at all"))
            .unwrap();
        let response = test_app(&dir).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

        let body = json_body(response).await;
        assert_eq!(body["error"], ERROR_SUMMARY);
        assert!(body["message"]
            .as_str()
            .unwrap()
            .starts_with("Invalid request body"));
    }

    #[tokio::test]
    async fn oversized_body_yields_error_contract() {
        let dir = TempDir::new().unwrap();
        let pipeline = AnalysisPipeline::new(
            Arc::new(LocalImageStore::new(dir.path())),
            Arc::new(StaticLabels(vec![])),
            Arc::new(HeuristicScorer::default()),
            Arc::new(AgentOrchestrator::new(None)),
        );
        let config = ServerConfig {
            max_body_bytes: 16,
            ..ServerConfig::default()
        };
        let app = make_app(config, Arc::new(pipeline));
        let request = Request::builder()
            .method("POST")
            .uri("/analyze")
            .body(Body::from(r#"{"image": "aGVsbG8gd29ybGQgaGVsbG8gd29ybGQ="}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn answers_preflight() {
        let dir = TempDir::new().unwrap();
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/analyze")
            .body(Body::empty())
            .unwrap();
        let response = test_app(&dir).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS],
            "POST, OPTIONS"
        );
    }
}
