//! Drawing analysis: label features, heuristic scoring, agent prompts and
//! the orchestration that turns them into a response.

pub mod features;
pub mod labels;
pub mod orchestrator;
pub mod pipeline;
pub mod prompts;
pub mod reply;
pub mod response;
pub mod scorer;

pub use features::{Feature, FeatureDetector, FeatureFlags, FeatureKeywords};
pub use labels::{Label, LabelSummary};
pub use orchestrator::{AgentOrchestrator, AgentOutcome, OrchestratorState};
pub use pipeline::{decode_image, AnalysisError, AnalysisPipeline, AnalyzeRequest};
pub use reply::{AdviceResult, EvaluationResult};
pub use response::{AnalysisResponse, ErrorResponse};
pub use scorer::{CategoryScores, HeuristicScorer, ScoreResult, ScoringModel};
