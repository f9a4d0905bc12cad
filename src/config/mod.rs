mod file_config;

pub use file_config::{FileConfig, LlmConfig};

use crate::agent::CompletionOptions;
use crate::analysis::FeatureKeywords;
use crate::server::{RequestsLoggingLevel, ServerConfig};
use crate::vision::{DEFAULT_MAX_LABELS, DEFAULT_MIN_CONFIDENCE};
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub storage_dir: Option<PathBuf>,
    pub location_prefix: Option<String>,
    pub port: u16,
    pub bind_address: String,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub vision_url: Option<String>,
    pub vision_timeout_sec: u64,
    pub max_labels: usize,
    pub min_confidence: f64,
    pub scoring_model_path: Option<PathBuf>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            storage_dir: None,
            location_prefix: None,
            port: 3001,
            bind_address: "127.0.0.1".to_string(),
            metrics_port: 9091,
            logging_level: RequestsLoggingLevel::Path,
            vision_url: None,
            vision_timeout_sec: 30,
            max_labels: DEFAULT_MAX_LABELS,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            scoring_model_path: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub storage_dir: PathBuf,
    pub location_prefix: Option<String>,
    pub port: u16,
    pub bind_address: String,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,

    // Label detection
    pub vision_url: Option<String>,
    pub vision_timeout_sec: u64,
    pub max_labels: usize,
    pub min_confidence: f64,

    // Scoring
    pub scoring_model_path: Option<PathBuf>,
    pub features: FeatureKeywords,

    /// `None` when no generative backend is configured.
    pub llm: Option<LlmSettings>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProviderKind {
    OpenAI,
    Ollama,
}

impl LlmProviderKind {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Some(Self::OpenAI),
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }
}

/// Settings for the LLM provider.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub provider: LlmProviderKind,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub api_key_command: Option<String>,
    pub timeout_sec: u64,
    pub max_tokens: u32,
    pub evaluation_temperature: f32,
    pub advice_temperature: f32,
}

impl LlmSettings {
    fn options(&self, temperature: f32) -> CompletionOptions {
        CompletionOptions {
            temperature,
            max_tokens: Some(self.max_tokens),
            timeout: Duration::from_secs(self.timeout_sec),
        }
    }

    pub fn evaluation_options(&self) -> CompletionOptions {
        self.options(self.evaluation_temperature)
    }

    pub fn advice_options(&self) -> CompletionOptions {
        self.options(self.advice_temperature)
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        // TOML overrides CLI for each field
        let storage_dir = file
            .storage_dir
            .map(PathBuf::from)
            .or_else(|| cli.storage_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "storage_dir must be specified via --storage-dir or in config file"
                )
            })?;

        // A missing directory is created at startup, a file in its place is an error
        if storage_dir.exists() && !storage_dir.is_dir() {
            bail!("storage_dir is not a directory: {:?}", storage_dir);
        }

        let location_prefix = file
            .location_prefix
            .or_else(|| cli.location_prefix.clone());

        let port = file.port.unwrap_or(cli.port);
        let bind_address = file
            .bind_address
            .unwrap_or_else(|| cli.bind_address.clone());
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let vision_url = file.vision_url.or_else(|| cli.vision_url.clone());
        let vision_timeout_sec = file.vision_timeout_sec.unwrap_or(cli.vision_timeout_sec);
        let max_labels = file.max_labels.unwrap_or(cli.max_labels);
        let min_confidence = file.min_confidence.unwrap_or(cli.min_confidence);

        if max_labels == 0 {
            bail!("max_labels must be greater than zero");
        }
        if !(0.0..=100.0).contains(&min_confidence) {
            bail!("min_confidence must be within 0-100, got {}", min_confidence);
        }

        let scoring_model_path = file
            .scoring_model_path
            .map(PathBuf::from)
            .or_else(|| cli.scoring_model_path.clone());

        let features = file.features.unwrap_or_default();

        let llm = match file.llm {
            Some(llm_file) => resolve_llm(llm_file)?,
            None => None,
        };

        Ok(Self {
            storage_dir,
            location_prefix,
            port,
            bind_address,
            metrics_port,
            logging_level,
            vision_url,
            vision_timeout_sec,
            max_labels,
            min_confidence,
            scoring_model_path,
            features,
            llm,
        })
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            requests_logging_level: self.logging_level.clone(),
            port: self.port,
            bind_address: self.bind_address.clone(),
            metrics_port: self.metrics_port,
            ..ServerConfig::default()
        }
    }

    pub fn vision_timeout(&self) -> Duration {
        Duration::from_secs(self.vision_timeout_sec)
    }
}

fn resolve_llm(file: LlmConfig) -> Result<Option<LlmSettings>> {
    let provider = match file.provider {
        Some(name) => match LlmProviderKind::parse(&name) {
            Some(kind) => kind,
            None => bail!("Unknown llm provider '{}', expected openai or ollama", name),
        },
        None => return Ok(None),
    };

    let base_url = match file.base_url {
        Some(url) if !url.trim().is_empty() => url,
        _ => bail!("llm.base_url must be set when llm.provider is set"),
    };
    let model = match file.model {
        Some(model) if !model.trim().is_empty() => model,
        _ => bail!("llm.model must be set when llm.provider is set"),
    };

    if file.api_key.is_some() && file.api_key_command.is_some() {
        bail!("llm.api_key and llm.api_key_command are mutually exclusive");
    }

    let defaults = CompletionOptions::default();
    Ok(Some(LlmSettings {
        provider,
        base_url,
        model,
        api_key: file.api_key,
        api_key_command: file.api_key_command,
        timeout_sec: file.timeout_sec.unwrap_or(defaults.timeout.as_secs()),
        max_tokens: file.max_tokens.unwrap_or(1500),
        evaluation_temperature: file
            .evaluation_temperature
            .unwrap_or(defaults.temperature),
        advice_temperature: file.advice_temperature.unwrap_or(0.7),
    }))
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
