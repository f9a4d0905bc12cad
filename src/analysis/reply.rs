//! Parsing of generative-model replies.
//!
//! Models tend to wrap the requested JSON in prose, so the first balanced
//! `{...}` object is cut out of the reply before deserializing it.

use super::scorer::{CategoryScores, ScoringModel};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of improvement tips kept from a reply.
pub const MAX_TIPS: usize = 3;

#[derive(Debug, Error)]
pub enum ReplyParseError {
    #[error("No JSON object found in reply")]
    NoJson,

    #[error("Unbalanced JSON object in reply")]
    Unbalanced,

    #[error("Malformed JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Invalid reply: {0}")]
    Invalid(String),
}

/// Outcome of the evaluation stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub score: u32,
    pub evaluation_text: String,
    pub breakdown: CategoryScores,
}

/// Outcome of the advice stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdviceResult {
    pub main_advice: String,
    /// Between one and [`MAX_TIPS`] entries.
    pub improvement_tips: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EvaluationReply {
    score: f64,
    evaluation: String,
    #[serde(default)]
    breakdown: BreakdownReply,
}

/// Breakdown as the model sent it; absent keys are taken from the heuristic.
#[derive(Debug, Default, Deserialize)]
struct BreakdownReply {
    composition: Option<f64>,
    #[serde(alias = "essential_features")]
    complexity: Option<f64>,
    completeness: Option<f64>,
}

impl BreakdownReply {
    fn or(self, heuristic: &CategoryScores) -> CategoryScores {
        CategoryScores {
            composition: self.composition.unwrap_or(heuristic.composition),
            complexity: self.complexity.unwrap_or(heuristic.complexity),
            completeness: self.completeness.unwrap_or(heuristic.completeness),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AdviceReply {
    main_advice: String,
    #[serde(default)]
    improvement_tips: Vec<String>,
}

/// Return the first balanced `{...}` substring of `text`.
///
/// Braces inside JSON string literals are ignored.
pub fn extract_json_object(text: &str) -> Result<&str, ReplyParseError> {
    let start = text.find('{').ok_or(ReplyParseError::NoJson)?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    Err(ReplyParseError::Unbalanced)
}

/// Parse an evaluation reply, clamping the score to the model's bounds.
///
/// Breakdown categories the reply leaves out are filled from `heuristic`.
pub fn parse_evaluation(
    text: &str,
    model: &ScoringModel,
    heuristic: &CategoryScores,
) -> Result<EvaluationResult, ReplyParseError> {
    let reply: EvaluationReply = serde_json::from_str(extract_json_object(text)?)?;
    if !reply.score.is_finite() {
        return Err(ReplyParseError::Invalid(format!(
            "score is not a number: {}",
            reply.score
        )));
    }
    Ok(EvaluationResult {
        score: model.clamp_score(reply.score),
        evaluation_text: reply.evaluation,
        breakdown: reply.breakdown.or(heuristic),
    })
}

/// Parse an advice reply. Blank tips are dropped and at most
/// [`MAX_TIPS`] are kept; an empty list is left to the caller to fill.
pub fn parse_advice(text: &str) -> Result<AdviceResult, ReplyParseError> {
    let reply: AdviceReply = serde_json::from_str(extract_json_object(text)?)?;
    if reply.main_advice.trim().is_empty() {
        return Err(ReplyParseError::Invalid("empty main_advice".to_string()));
    }
    let improvement_tips = reply
        .improvement_tips
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .take(MAX_TIPS)
        .collect();
    Ok(AdviceResult {
        main_advice: reply.main_advice,
        improvement_tips,
    })
}
