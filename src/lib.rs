//! Oruby Drawing Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod agent;
pub mod analysis;
pub mod config;
pub mod server;
pub mod storage;
pub mod vision;

// Re-export commonly used types for convenience
pub use analysis::{AgentOrchestrator, AnalysisPipeline, AnalysisResponse, HeuristicScorer};
pub use server::{make_app, run_server, RequestsLoggingLevel, ServerConfig};
pub use storage::{ImageStore, LocalImageStore};
pub use vision::{DisabledLabelSource, HttpLabelSource, LabelSource};
