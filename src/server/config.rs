use super::RequestsLoggingLevel;

/// Largest accepted request body; base64 inflates images by about a third.
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    pub bind_address: String,
    /// Port of the Prometheus endpoint. 0 disables it.
    pub metrics_port: u16,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: 3001,
            bind_address: "127.0.0.1".to_string(),
            metrics_port: 9091,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}
