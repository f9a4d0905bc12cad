use crate::analysis::FeatureKeywords;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub storage_dir: Option<String>,
    pub location_prefix: Option<String>,
    pub port: Option<u16>,
    pub bind_address: Option<String>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,

    // Label detection
    pub vision_url: Option<String>,
    pub vision_timeout_sec: Option<u64>,
    pub max_labels: Option<usize>,
    pub min_confidence: Option<f64>,

    // Scoring
    pub scoring_model_path: Option<String>,

    // Feature configs
    pub llm: Option<LlmConfig>,
    pub features: Option<FeatureKeywords>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct LlmConfig {
    /// Backend to use: "openai" or "ollama". Absent disables the agents.
    pub provider: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub api_key_command: Option<String>,
    pub timeout_sec: Option<u64>,
    pub max_tokens: Option<u32>,
    pub evaluation_temperature: Option<f32>,
    pub advice_temperature: Option<f32>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
