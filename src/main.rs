use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::{fmt::Debug, path::PathBuf};
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use oruby_drawing_server::agent::{ApiKeySource, LlmProvider, OllamaProvider, OpenAIProvider};
use oruby_drawing_server::analysis::{FeatureDetector, ScoringModel};
use oruby_drawing_server::config::{AppConfig, CliConfig, FileConfig, LlmProviderKind, LlmSettings};
use oruby_drawing_server::{
    run_server, AgentOrchestrator, AnalysisPipeline, DisabledLabelSource, HeuristicScorer,
    HttpLabelSource, LabelSource, LocalImageStore, RequestsLoggingLevel,
};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML config file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory where uploaded drawings are stored.
    #[clap(long, value_parser = parse_path)]
    pub storage_dir: Option<PathBuf>,

    /// Prefix used to build the reported location of stored drawings
    /// (e.g. "s3://my-bucket"). Defaults to a file:// URL of the storage dir.
    #[clap(long)]
    pub location_prefix: Option<String>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The address to bind to.
    #[clap(long, default_value = "127.0.0.1")]
    pub bind_address: String,

    /// The port for the metrics server (Prometheus scraping). Set to 0 to disable.
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// URL of the label detection service. Without it every drawing gets no labels.
    #[clap(long)]
    pub vision_url: Option<String>,

    /// Timeout in seconds for label detection requests.
    #[clap(long, default_value_t = 30)]
    pub vision_timeout_sec: u64,

    /// Maximum number of labels kept per drawing.
    #[clap(long, default_value_t = 20)]
    pub max_labels: usize,

    /// Minimum label confidence (0-100).
    #[clap(long, default_value_t = 45.0)]
    pub min_confidence: f64,

    /// Path to a JSON file describing the reference scoring model.
    #[clap(long = "scoring-model", value_parser = parse_path)]
    pub scoring_model_path: Option<PathBuf>,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            storage_dir: self.storage_dir.clone(),
            location_prefix: self.location_prefix.clone(),
            port: self.port,
            bind_address: self.bind_address.clone(),
            metrics_port: self.metrics_port,
            logging_level: self.logging_level.clone(),
            vision_url: self.vision_url.clone(),
            vision_timeout_sec: self.vision_timeout_sec,
            max_labels: self.max_labels,
            min_confidence: self.min_confidence,
            scoring_model_path: self.scoring_model_path.clone(),
        }
    }
}

fn build_llm_provider(settings: &LlmSettings) -> Arc<dyn LlmProvider> {
    match settings.provider {
        LlmProviderKind::OpenAI => {
            let api_key_source = match (&settings.api_key, &settings.api_key_command) {
                (Some(key), _) => ApiKeySource::Static(key.clone()),
                (None, Some(command)) => ApiKeySource::Command(command.clone()),
                (None, None) => ApiKeySource::None,
            };
            Arc::new(OpenAIProvider::new(
                &settings.base_url,
                &settings.model,
                api_key_source,
            ))
        }
        LlmProviderKind::Ollama => {
            Arc::new(OllamaProvider::new(&settings.base_url, &settings.model))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let app_config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    oruby_drawing_server::server::metrics::init_metrics();

    // Scoring
    let model = match &app_config.scoring_model_path {
        Some(path) => ScoringModel::load_or_default(path),
        None => ScoringModel::default(),
    };
    let detector =
        FeatureDetector::new(&app_config.features).context("Invalid feature keywords")?;
    let scorer = Arc::new(HeuristicScorer::new(model, detector));

    // Label detection
    let label_source: Arc<dyn LabelSource> = match &app_config.vision_url {
        Some(url) => {
            info!("Label detection service configured at {}", url);
            Arc::new(
                HttpLabelSource::new(url.clone())
                    .with_limits(app_config.max_labels, app_config.min_confidence)
                    .with_timeout(app_config.vision_timeout()),
            )
        }
        None => {
            warn!("No vision_url configured, drawings will be scored without labels");
            Arc::new(DisabledLabelSource)
        }
    };

    // Agents
    let orchestrator = match &app_config.llm {
        Some(settings) => {
            info!(
                "Using {:?} model {} at {}",
                settings.provider, settings.model, settings.base_url
            );
            let provider = build_llm_provider(settings);
            if let Err(e) = provider.health_check().await {
                warn!("LLM health check failed, agents may fall back: {}", e);
            }
            AgentOrchestrator::new(Some(provider))
                .with_evaluation_options(settings.evaluation_options())
                .with_advice_options(settings.advice_options())
        }
        None => {
            info!("No LLM configured, using deterministic evaluation and advice");
            AgentOrchestrator::new(None)
        }
    };

    // Storage
    std::fs::create_dir_all(&app_config.storage_dir).with_context(|| {
        format!(
            "Failed to create storage dir: {:?}",
            app_config.storage_dir
        )
    })?;
    let mut store = LocalImageStore::new(app_config.storage_dir.clone());
    if let Some(prefix) = &app_config.location_prefix {
        store = store.with_location_prefix(prefix.clone());
    }
    info!("Storing drawings in {:?}", store.root());

    let pipeline = AnalysisPipeline::new(
        Arc::new(store),
        label_source,
        scorer,
        Arc::new(orchestrator),
    )
    .with_label_timeout(app_config.vision_timeout());

    run_server(app_config.server_config(), Arc::new(pipeline)).await
}
