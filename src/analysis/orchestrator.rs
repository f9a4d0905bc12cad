//! Two-stage agent orchestrator.
//!
//! Runs the evaluation agent, then the advice agent, as a small state
//! machine. Every stage has exactly one fallback: a failing or absent
//! generative backend never fails the request, it only swaps the stage
//! output for a deterministic one derived from the heuristic score.

use super::features::FeatureFlags;
use super::prompts::PromptBuilder;
use super::reply::{parse_advice, parse_evaluation, AdviceResult, EvaluationResult, ReplyParseError};
use super::scorer::ScoreResult;
use crate::agent::llm::{CompletionOptions, LlmError, LlmProvider, Message};
use crate::server::metrics;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Evaluation text used when the evaluation agent could not answer.
pub const FALLBACK_EVALUATION_TEXT: &str = "AI evaluation unavailable";

/// Main advice used when the advice agent could not answer.
pub const FALLBACK_MAIN_ADVICE: &str = "Emphasize Oruby's features more!";

/// Tips offered when nothing specific is missing.
pub const GENERIC_TIPS: [&str; 3] = [
    "Draw the character larger",
    "Add more detail",
    "Make the expression more lively",
];

const ADVICE_TEMPERATURE: f32 = 0.7;

/// Why a stage fell back.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("No generative backend configured")]
    NoProvider,

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Unusable reply: {0}")]
    Parse(#[from] ReplyParseError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Evaluate,
    Advise,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Evaluate => "evaluate",
            Stage::Advise => "advise",
        }
    }
}

/// State of one orchestration run.
#[derive(Debug, Clone, PartialEq)]
pub enum OrchestratorState {
    Evaluate,
    Advise {
        evaluation: EvaluationResult,
    },
    Done {
        evaluation: EvaluationResult,
        advice: AdviceResult,
    },
}

impl OrchestratorState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrchestratorState::Done { .. })
    }
}

/// Final output of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentOutcome {
    pub evaluation: EvaluationResult,
    pub advice: AdviceResult,
}

/// Runs the evaluation and advice agents against an optional backend.
pub struct AgentOrchestrator {
    llm: Option<Arc<dyn LlmProvider>>,
    evaluation_options: CompletionOptions,
    advice_options: CompletionOptions,
}

impl AgentOrchestrator {
    /// Create an orchestrator. `None` means every stage falls back.
    pub fn new(llm: Option<Arc<dyn LlmProvider>>) -> Self {
        let evaluation_options = CompletionOptions::default();
        let advice_options = CompletionOptions::default().with_temperature(ADVICE_TEMPERATURE);
        Self {
            llm,
            evaluation_options,
            advice_options,
        }
    }

    pub fn with_evaluation_options(mut self, options: CompletionOptions) -> Self {
        self.evaluation_options = options;
        self
    }

    pub fn with_advice_options(mut self, options: CompletionOptions) -> Self {
        self.advice_options = options;
        self
    }

    pub fn provider(&self) -> Option<&Arc<dyn LlmProvider>> {
        self.llm.as_ref()
    }

    /// Step from `Evaluate` until `Done`.
    pub async fn run(&self, prompts: &PromptBuilder<'_>, heuristic: &ScoreResult) -> AgentOutcome {
        let mut state = OrchestratorState::Evaluate;
        loop {
            state = match self.step(state, prompts, heuristic).await {
                OrchestratorState::Done { evaluation, advice } => {
                    return AgentOutcome { evaluation, advice };
                }
                next => next,
            };
        }
    }

    /// Advance the state machine by one transition.
    pub async fn step(
        &self,
        state: OrchestratorState,
        prompts: &PromptBuilder<'_>,
        heuristic: &ScoreResult,
    ) -> OrchestratorState {
        match state {
            OrchestratorState::Evaluate => {
                let evaluation = match self.evaluate(prompts).await {
                    Ok(evaluation) => {
                        info!(score = evaluation.score, "Evaluation agent answered");
                        evaluation
                    }
                    Err(e) => {
                        self.note_fallback(Stage::Evaluate, &e);
                        fallback_evaluation(heuristic)
                    }
                };
                OrchestratorState::Advise { evaluation }
            }

            OrchestratorState::Advise { evaluation } => {
                let advice = match self.advise(prompts, &evaluation).await {
                    Ok(mut advice) => {
                        if advice.improvement_tips.is_empty() {
                            debug!("Advice agent returned no tips, filling from features");
                            advice.improvement_tips = fallback_tips(&heuristic.features);
                        }
                        info!(tips = advice.improvement_tips.len(), "Advice agent answered");
                        advice
                    }
                    Err(e) => {
                        self.note_fallback(Stage::Advise, &e);
                        fallback_advice(&heuristic.features)
                    }
                };
                OrchestratorState::Done { evaluation, advice }
            }

            done @ OrchestratorState::Done { .. } => done,
        }
    }

    async fn evaluate(&self, prompts: &PromptBuilder<'_>) -> Result<EvaluationResult, StageError> {
        let reply = self
            .ask(Stage::Evaluate, prompts.evaluation_prompt(), &self.evaluation_options)
            .await?;
        Ok(parse_evaluation(&reply, prompts.model(), prompts.scores())?)
    }

    async fn advise(
        &self,
        prompts: &PromptBuilder<'_>,
        evaluation: &EvaluationResult,
    ) -> Result<AdviceResult, StageError> {
        let reply = self
            .ask(Stage::Advise, prompts.advice_prompt(evaluation), &self.advice_options)
            .await?;
        Ok(parse_advice(&reply)?)
    }

    async fn ask(
        &self,
        stage: Stage,
        prompt: String,
        options: &CompletionOptions,
    ) -> Result<String, StageError> {
        let llm = self.llm.as_ref().ok_or(StageError::NoProvider)?;
        let messages = [Message::user(prompt)];

        let start = Instant::now();
        let result = tokio::time::timeout(options.timeout, llm.complete(&messages, options)).await;
        metrics::record_llm_call(stage.as_str(), start.elapsed());

        let response = result.map_err(|_| LlmError::Timeout)??;
        debug!(
            stage = stage.as_str(),
            finish_reason = ?response.finish_reason,
            "LLM reply received"
        );
        Ok(response.message.content)
    }

    fn note_fallback(&self, stage: Stage, error: &StageError) {
        match error {
            StageError::NoProvider => {
                debug!(stage = stage.as_str(), "No LLM configured, using fallback")
            }
            e => warn!(stage = stage.as_str(), error = %e, "Agent stage failed, using fallback"),
        }
        metrics::record_agent_fallback(stage.as_str());
    }
}

/// The heuristic score reinterpreted as an evaluation.
pub fn fallback_evaluation(heuristic: &ScoreResult) -> EvaluationResult {
    EvaluationResult {
        score: heuristic.total_score,
        evaluation_text: FALLBACK_EVALUATION_TEXT.to_string(),
        breakdown: heuristic.details.categories,
    }
}

/// Deterministic advice from the detected features.
pub fn fallback_advice(features: &FeatureFlags) -> AdviceResult {
    AdviceResult {
        main_advice: FALLBACK_MAIN_ADVICE.to_string(),
        improvement_tips: fallback_tips(features),
    }
}

/// One remediation tip per missing feature, or the generic list.
pub fn fallback_tips(features: &FeatureFlags) -> Vec<String> {
    let missing = features.missing();
    if missing.is_empty() {
        return GENERIC_TIPS.iter().map(|t| t.to_string()).collect();
    }
    missing
        .iter()
        .map(|f| f.remediation_tip().to_string())
        .collect()
}
