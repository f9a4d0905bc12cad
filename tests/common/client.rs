//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for the drawing-analysis endpoints.
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::json;
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

#[allow(dead_code)]
impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    // ========================================================================
    // Status
    // ========================================================================

    /// GET /
    pub async fn home(&self) -> Response {
        self.client
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .expect("Home request failed")
    }

    // ========================================================================
    // Analysis
    // ========================================================================

    /// POST /analyze with a base64 image
    pub async fn analyze(&self, image: &str) -> Response {
        self.analyze_json(json!({ "image": image, "filename": "oruby.png" }))
            .await
    }

    /// POST /analyze with an arbitrary JSON body
    pub async fn analyze_json(&self, body: serde_json::Value) -> Response {
        self.client
            .post(format!("{}/analyze", self.base_url))
            .json(&body)
            .send()
            .await
            .expect("Analyze request failed")
    }

    /// POST /analyze with a raw body
    pub async fn analyze_raw(&self, body: &'static str) -> Response {
        self.client
            .post(format!("{}/analyze", self.base_url))
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .expect("Analyze request failed")
    }

    /// OPTIONS /analyze (CORS preflight)
    pub async fn preflight(&self) -> Response {
        self.client
            .request(reqwest::Method::OPTIONS, format!("{}/analyze", self.base_url))
            .header("Origin", "http://localhost:5173")
            .header("Access-Control-Request-Method", "POST")
            .send()
            .await
            .expect("Preflight request failed")
    }
}
