//! Test server lifecycle management
//!
//! This module manages spawning and shutting down test HTTP servers.
//! Each test gets an isolated server with its own storage directory.

use super::constants::*;
use super::fixtures::StaticLabels;
use oruby_drawing_server::agent::LlmProvider;
use oruby_drawing_server::analysis::{
    AgentOrchestrator, AnalysisPipeline, HeuristicScorer, Label,
};
use oruby_drawing_server::server::{make_app, RequestsLoggingLevel, ServerConfig};
use oruby_drawing_server::storage::LocalImageStore;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance with isolated storage
///
/// When dropped, the server gracefully shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    #[allow(dead_code)]
    pub port: u16,

    // Private fields - keep resources alive until drop
    storage_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a server whose label source finds nothing and with no chat model.
    pub async fn spawn() -> Self {
        Self::spawn_with(Vec::new(), None).await
    }

    /// Spawns a new test server on a random port
    ///
    /// Every uploaded image is given `labels`; `llm` backs both agents
    /// when present.
    ///
    /// # Panics
    ///
    /// Panics if port binding fails or the server doesn't become ready
    /// within timeout.
    pub async fn spawn_with(labels: Vec<Label>, llm: Option<Arc<dyn LlmProvider>>) -> Self {
        let storage_dir = TempDir::new().expect("Failed to create storage dir");

        let store = LocalImageStore::new(storage_dir.path())
            .with_location_prefix(TEST_LOCATION_PREFIX);
        let pipeline = AnalysisPipeline::new(
            Arc::new(store),
            Arc::new(StaticLabels(labels)),
            Arc::new(HeuristicScorer::default()),
            Arc::new(AgentOrchestrator::new(llm)),
        );

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");

        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let base_url = format!("http://127.0.0.1:{}", port);

        // Create shutdown channel
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
            metrics_port: 0,
            ..ServerConfig::default()
        };
        let app = make_app(config, Arc::new(pipeline));

        // Spawn server in background task with graceful shutdown
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            storage_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Directory the server writes uploads into.
    #[allow(dead_code)]
    pub fn storage_path(&self) -> &Path {
        self.storage_dir.path()
    }

    /// Waits for the server to become ready by polling the status endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => {
                    return;
                }
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        // Send shutdown signal
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
        // TempDir will be cleaned up automatically
    }
}
