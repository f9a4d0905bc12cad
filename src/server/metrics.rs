use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, Histogram, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all drawing-server metrics
const PREFIX: &str = "oruby";

lazy_static! {
    // Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Analysis Metrics
    pub static ref ANALYSES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_analyses_total"), "Total analysis requests by outcome"),
        &["outcome"]
    ).expect("Failed to create analyses_total metric");

    pub static ref LABEL_COUNT: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            format!("{PREFIX}_label_count"),
            "Number of labels detected per image"
        )
        .buckets(vec![0.0, 1.0, 3.0, 5.0, 8.0, 12.0, 16.0, 20.0])
    ).expect("Failed to create label_count metric");

    // Agent Metrics
    pub static ref AGENT_FALLBACKS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_agent_fallbacks_total"), "Agent stages answered by the fallback"),
        &["stage"]
    ).expect("Failed to create agent_fallbacks_total metric");

    pub static ref LLM_CALL_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_llm_call_duration_seconds"),
            "LLM call duration in seconds"
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]),
        &["stage"]
    ).expect("Failed to create llm_call_duration_seconds metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Register all metrics - ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(ANALYSES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(LABEL_COUNT.clone()));
    let _ = REGISTRY.register(Box::new(AGENT_FALLBACKS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(LLM_CALL_DURATION_SECONDS.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

/// Record the outcome of an analysis request ("success" or "error")
pub fn record_analysis(outcome: &str) {
    ANALYSES_TOTAL.with_label_values(&[outcome]).inc();
}

/// Record how many labels the label source returned
pub fn record_label_count(count: usize) {
    LABEL_COUNT.observe(count as f64);
}

/// Record an agent stage that fell back
pub fn record_agent_fallback(stage: &str) {
    AGENT_FALLBACKS_TOTAL.with_label_values(&[stage]).inc();
}

/// Record an LLM call, successful or not
pub fn record_llm_call(stage: &str, duration: Duration) {
    LLM_CALL_DURATION_SECONDS
        .with_label_values(&[stage])
        .observe(duration.as_secs_f64());
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_else(|_| String::from(""));
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
