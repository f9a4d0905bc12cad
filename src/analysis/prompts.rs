//! Prompts for the evaluation and advice agents.

use super::features::{Feature, FeatureFlags};
use super::labels::{top_labels, Label};
use super::reply::EvaluationResult;
use super::scorer::{CategoryScores, ScoringModel};
use std::fmt::Write;

/// Number of labels listed in a prompt.
pub const PROMPT_LABEL_COUNT: usize = 5;

const NO_LABELS_PLACEHOLDER: &str = "(no elements were detected)";
const NO_MISSING_FEATURES: &str = "none";

const CHARACTER_DESCRIPTION: &str = "Oruby is a cute bird character wearing a ruby gem on its tail.";

/// Builds both agent prompts from one request's analysis.
pub struct PromptBuilder<'a> {
    labels: &'a [Label],
    features: &'a FeatureFlags,
    scores: &'a CategoryScores,
    model: &'a ScoringModel,
}

impl<'a> PromptBuilder<'a> {
    pub fn new(
        labels: &'a [Label],
        features: &'a FeatureFlags,
        scores: &'a CategoryScores,
        model: &'a ScoringModel,
    ) -> Self {
        Self {
            labels,
            features,
            scores,
            model,
        }
    }

    pub fn model(&self) -> &ScoringModel {
        self.model
    }

    /// Heuristic category scores the prompts were built from.
    pub fn scores(&self) -> &CategoryScores {
        self.scores
    }

    fn label_list(&self) -> String {
        let top = top_labels(self.labels, PROMPT_LABEL_COUNT);
        if top.is_empty() {
            return NO_LABELS_PLACEHOLDER.to_string();
        }
        top.iter()
            .map(|l| format!("{} ({}%)", l.name, l.confidence.round()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn feature_lines(&self) -> String {
        let mut out = String::new();
        for (feature, present) in [
            (Feature::PrimarySubject, self.features.has_primary_subject),
            (Feature::Accent, self.features.has_accent_feature),
            (Feature::Appeal, self.features.is_appealing),
        ] {
            let penalty = self.model.bonus.missing_term(feature).min(0.0).abs().round();
            let state = if present {
                "present (no penalty)".to_string()
            } else if penalty == 0.0 {
                "MISSING (no penalty)".to_string()
            } else {
                format!("MISSING (deduct {} points)", penalty)
            };
            let _ = writeln!(out, "- {}: {}", feature.describe(), state);
        }
        out
    }

    fn weighting(&self) -> String {
        let pct = |w: f64| (w * 100.0).round();
        let weights = &self.model.weights;
        format!(
            "1. Composition ({}%): centred placement and balance\n\
             2. Essential features ({}%): clear beak, round body and ruby gem\n\
             3. Completeness ({}%): overall cohesion and finish",
            pct(weights.composition),
            pct(weights.complexity),
            pct(weights.completeness),
        )
    }

    fn missing_features(&self) -> String {
        let missing = self.features.missing();
        if missing.is_empty() {
            return NO_MISSING_FEATURES.to_string();
        }
        missing
            .iter()
            .map(|f| f.describe())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Prompt asking for a score, a short evaluation and a breakdown.
    pub fn evaluation_prompt(&self) -> String {
        format!(
            "Please evaluate a drawing of \"Oruby\".\n\
             {character}\n\
             \n\
             [Evaluation policy]\n\
             - This is a black-and-white line drawing.\n\
             - Apply strict criteria.\n\
             - Essential elements: beak, round body, diamond-shaped ornament.\n\
             \n\
             [Detected elements]\n\
             {labels}\n\
             \n\
             [Essential features]\n\
             {features}\
             \n\
             [Weighting]\n\
             {weighting}\n\
             \n\
             [Reference scores from image analysis]\n\
             composition {composition:.0}, essential features {complexity:.0}, completeness {completeness:.0}\n\
             \n\
             [Scoring rules]\n\
             - The score is an integer between {floor} and {ceiling}; the average drawing scores 60.\n\
             - Below 70 unless every essential feature is clearly drawn.\n\
             - Below 80 unless composition and balance are also excellent.\n\
             - Below 90 unless the drawing is nearly perfect.\n\
             - 100 only for a drawing as good as the reference model.\n\
             \n\
             Respond ONLY with JSON in exactly this shape, with no other text:\n\
             {{\"score\": <integer>, \"evaluation\": \"<comment>\", \"breakdown\": {{\"composition\": <number>, \"essential_features\": <number>, \"completeness\": <number>}}}}\n",
            character = CHARACTER_DESCRIPTION,
            labels = self.label_list(),
            features = self.feature_lines(),
            weighting = self.weighting(),
            composition = self.scores.composition,
            complexity = self.scores.complexity,
            completeness = self.scores.completeness,
            floor = self.model.floor,
            ceiling = self.model.ceiling,
        )
    }

    /// Prompt asking for improvement advice, given the evaluation outcome.
    pub fn advice_prompt(&self, evaluation: &EvaluationResult) -> String {
        format!(
            "Please give advice for improving a drawing of \"Oruby\".\n\
             \n\
             [Current evaluation]\n\
             Score: {score} points\n\
             Comment: {comment}\n\
             Missing features: {missing}\n\
             Detected elements: {labels}\n\
             \n\
             [Oruby's features]\n\
             - A bird character (the beak and wings matter most)\n\
             - A ruby gem attached to its tail\n\
             - A cute expression\n\
             \n\
             If an essential feature is missing, make it the top priority of your advice.\n\
             The drawing is black and white, so suggest improvements through shape and design rather than colour.\n\
             \n\
             Respond ONLY with JSON in exactly this shape, with no other text:\n\
             {{\"main_advice\": \"<most important improvement>\", \"improvement_tips\": [\"<tip 1>\", \"<tip 2>\", \"<tip 3>\"]}}\n",
            score = evaluation.score,
            comment = evaluation.evaluation_text,
            missing = self.missing_features(),
            labels = self.label_list(),
        )
    }
}
