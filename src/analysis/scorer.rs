//! Heuristic scoring of a drawing from its detected labels.
//!
//! The score is built from three category sub-scores combined with fixed
//! weights, plus a bonus term derived from the detected features. Every
//! numeric knob lives in [`ScoringModel`] so the calibration can change
//! without touching the pipeline.

use super::features::{Feature, FeatureDetector, FeatureFlags};
use super::labels::{mean_confidence, Label};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

// Composition
const COMPOSITION_CONFIDENCE_THRESHOLD: f64 = 75.0;
const COMPOSITION_TOP_LABELS: usize = 3;
const COMPOSITION_BASELINE: f64 = 50.0;
const COMPOSITION_MULTIPLIER: f64 = 1.2;
const COMPOSITION_SUBJECT_FLOOR: f64 = 70.0;
const COMPOSITION_SUBJECT_BONUS: f64 = 5.0;
const COMPOSITION_CEILING: f64 = 85.0;
const COMPOSITION_NO_SUBJECT: f64 = 30.0;

// Complexity
const COMPLEXITY_ARTWORK_BASE: f64 = 30.0;

// Completeness
const COMPLETENESS_BASE: f64 = 40.0;
const COMPLETENESS_ARTWORK_BONUS: f64 = 10.0;
const COMPLETENESS_HIGH_CONFIDENCE: f64 = 80.0;
const COMPLETENESS_VERY_HIGH_CONFIDENCE: f64 = 90.0;
const COMPLETENESS_PER_LABEL_BONUS: f64 = 2.0;
const COMPLETENESS_MEAN_HIGH: f64 = 85.0;
const COMPLETENESS_MEAN_HIGH_BONUS: f64 = 10.0;
const COMPLETENESS_MEAN_LOW: f64 = 70.0;
const COMPLETENESS_MEAN_LOW_PENALTY: f64 = 5.0;
const COMPLETENESS_MIN: f64 = 20.0;
const COMPLETENESS_MAX: f64 = 90.0;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Per-category sub-scores.
///
/// The same shape is used for heuristic results and for the breakdown
/// returned by the evaluation agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryScores {
    pub composition: f64,
    #[serde(alias = "essential_features")]
    pub complexity: f64,
    pub completeness: f64,
}

/// Category weights. Must sum to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryWeights {
    pub composition: f64,
    pub complexity: f64,
    pub completeness: f64,
}

impl CategoryWeights {
    pub fn sum(&self) -> f64 {
        self.composition + self.complexity + self.completeness
    }

    pub fn combine(&self, scores: &CategoryScores) -> f64 {
        scores.composition * self.composition
            + scores.complexity * self.complexity
            + scores.completeness * self.completeness
    }
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            composition: 0.3,
            complexity: 0.2,
            completeness: 0.5,
        }
    }
}

/// Raw contributions of the feature flags to the bonus term.
///
/// Missing a required feature costs more than having it earns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BonusPolicy {
    pub artwork: f64,
    pub subject_present: f64,
    pub subject_high_confidence: f64,
    pub subject_high_confidence_threshold: f64,
    pub subject_missing: f64,
    pub accent_present: f64,
    pub accent_missing: f64,
    pub appealing_present: f64,
}

impl Default for BonusPolicy {
    fn default() -> Self {
        Self {
            artwork: 5.0,
            subject_present: 8.0,
            subject_high_confidence: 2.0,
            subject_high_confidence_threshold: 90.0,
            subject_missing: -15.0,
            accent_present: 5.0,
            accent_missing: -5.0,
            appealing_present: 3.0,
        }
    }
}

impl BonusPolicy {
    /// Bonus term applied when `feature` is absent. Zero means no penalty.
    pub fn missing_term(&self, feature: Feature) -> f64 {
        match feature {
            Feature::PrimarySubject => self.subject_missing,
            Feature::Accent => self.accent_missing,
            Feature::Appeal => 0.0,
        }
    }
}

/// Pulls scores toward `anchor`, shrinking deviations by `factor`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recentring {
    pub anchor: f64,
    pub factor: f64,
}

impl Recentring {
    pub fn apply(&self, score: f64) -> f64 {
        self.anchor + (score - self.anchor) * self.factor
    }
}

/// A score band: scores at or above `min` (and below the next band) get `label`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBand {
    pub min: u32,
    pub label: String,
}

fn band(min: u32, label: &str) -> ScoreBand {
    ScoreBand {
        min,
        label: label.to_string(),
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ScoringModelError {
    #[error("Category weights must sum to 1.0, got {0}")]
    WeightsDoNotSumToOne(f64),

    #[error("Invalid score bounds: floor {floor} must be below ceiling {ceiling}")]
    InvalidBounds { floor: u32, ceiling: u32 },

    #[error("Recentring factor must be in (0, 1], got {0}")]
    InvalidRecentringFactor(f64),

    #[error("At least one score band is required")]
    NoBands,
}

/// Tunable scoring policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringModel {
    pub weights: CategoryWeights,
    pub bonus: BonusPolicy,
    /// Fraction of the raw bonus added to the weighted base.
    pub bonus_scale: f64,
    pub recentring: Option<Recentring>,
    pub floor: u32,
    pub ceiling: u32,
    pub bands: Vec<ScoreBand>,
}

impl Default for ScoringModel {
    fn default() -> Self {
        Self {
            weights: CategoryWeights::default(),
            bonus: BonusPolicy::default(),
            bonus_scale: 0.7,
            recentring: None,
            floor: 10,
            ceiling: 100,
            bands: vec![
                band(90, "Perfect Oruby! An ideal drawing."),
                band(80, "Excellent Oruby! A professional-level finish."),
                band(70, "Good Oruby! All the essential features are there."),
                band(60, "Decent Oruby. A little more care will go a long way."),
                band(50, "Oruby's features are lacking. Review the basics."),
                band(40, "Needs work. Focus on the essential features."),
                band(0, "Start from the basics and use the reference drawing."),
            ],
        }
    }
}

impl ScoringModel {
    pub fn validate(&self) -> Result<(), ScoringModelError> {
        let sum = self.weights.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ScoringModelError::WeightsDoNotSumToOne(sum));
        }
        if self.floor >= self.ceiling {
            return Err(ScoringModelError::InvalidBounds {
                floor: self.floor,
                ceiling: self.ceiling,
            });
        }
        if let Some(recentring) = &self.recentring {
            if !(recentring.factor > 0.0 && recentring.factor <= 1.0) {
                return Err(ScoringModelError::InvalidRecentringFactor(recentring.factor));
            }
        }
        if self.bands.is_empty() {
            return Err(ScoringModelError::NoBands);
        }
        Ok(())
    }

    /// Validate and put bands in descending order.
    fn normalized(mut self) -> Result<Self, ScoringModelError> {
        self.validate()?;
        self.bands.sort_by(|a, b| b.min.cmp(&a.min));
        Ok(self)
    }

    /// Load a reference model from a JSON file.
    ///
    /// Any problem with the file falls back to the built-in defaults.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(model) => {
                info!("Loaded scoring model from {:?}", path);
                model
            }
            Err(e) => {
                warn!(error = %format!("{:#}", e), "Falling back to the default scoring model");
                Self::default()
            }
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scoring model: {:?}", path))?;
        let model: ScoringModel = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse scoring model: {:?}", path))?;
        Ok(model.normalized()?)
    }

    /// Label of the band the score falls into.
    pub fn range_label(&self, score: u32) -> &str {
        self.bands
            .iter()
            .find(|b| score >= b.min)
            .or_else(|| self.bands.last())
            .map(|b| b.label.as_str())
            .unwrap_or_default()
    }

    /// Clamp to the configured bounds and round.
    pub fn clamp_score(&self, score: f64) -> u32 {
        if score.is_nan() {
            return self.floor;
        }
        score.clamp(self.floor as f64, self.ceiling as f64).round() as u32
    }
}

/// Category scores plus the raw bonus term.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreDetails {
    #[serde(flatten)]
    pub categories: CategoryScores,
    pub bonus: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub total_score: u32,
    pub details: ScoreDetails,
    pub score_range_label: String,
    pub features: FeatureFlags,
}

/// Computes scores from labels. Pure: no I/O, never fails.
#[derive(Debug, Clone, Default)]
pub struct HeuristicScorer {
    model: ScoringModel,
    detector: FeatureDetector,
}

impl HeuristicScorer {
    /// Create a scorer. An invalid model is replaced by the defaults.
    pub fn new(model: ScoringModel, detector: FeatureDetector) -> Self {
        let model = model.normalized().unwrap_or_else(|e| {
            warn!(error = %e, "Invalid scoring model, using defaults");
            ScoringModel::default()
        });
        Self { model, detector }
    }

    pub fn model(&self) -> &ScoringModel {
        &self.model
    }

    pub fn detector(&self) -> &FeatureDetector {
        &self.detector
    }

    pub fn score(&self, labels: &[Label]) -> ScoreResult {
        let features = self.detector.detect(labels);
        self.score_with_features(labels, features)
    }

    pub fn score_with_features(&self, labels: &[Label], features: FeatureFlags) -> ScoreResult {
        let categories = self.category_scores(labels);
        let bonus = self.bonus(labels, &features);

        let base = self.model.weights.combine(&categories);
        let mut total = base + bonus * self.model.bonus_scale;
        if let Some(recentring) = &self.model.recentring {
            total = recentring.apply(total);
        }
        let total_score = self.model.clamp_score(total);

        debug!(
            base,
            bonus,
            total_score,
            label_count = labels.len(),
            "Computed heuristic score"
        );

        ScoreResult {
            total_score,
            details: ScoreDetails { categories, bonus },
            score_range_label: self.model.range_label(total_score).to_string(),
            features,
        }
    }

    pub fn category_scores(&self, labels: &[Label]) -> CategoryScores {
        CategoryScores {
            composition: self.composition(labels),
            complexity: self.complexity(labels),
            completeness: self.completeness(labels),
        }
    }

    fn composition(&self, labels: &[Label]) -> f64 {
        let mut confident: Vec<f64> = labels
            .iter()
            .map(|l| l.confidence)
            .filter(|c| *c > COMPOSITION_CONFIDENCE_THRESHOLD)
            .collect();
        if confident.is_empty() {
            return COMPOSITION_NO_SUBJECT;
        }

        // Highest confidences first, whatever order the detector used.
        confident.sort_by(|a, b| b.total_cmp(a));
        confident.truncate(COMPOSITION_TOP_LABELS);

        let avg = confident.iter().sum::<f64>() / confident.len() as f64;
        let mut score = (avg - COMPOSITION_BASELINE) * COMPOSITION_MULTIPLIER;

        if labels.iter().any(|l| {
            self.detector.is_primary_subject(l) && l.confidence > COMPOSITION_SUBJECT_FLOOR
        }) {
            score += COMPOSITION_SUBJECT_BONUS;
        }

        score.min(COMPOSITION_CEILING)
    }

    fn complexity(&self, labels: &[Label]) -> f64 {
        let base = if self.detector.has_artwork(labels) {
            COMPLEXITY_ARTWORK_BASE
        } else {
            0.0
        };

        let by_count = match labels.len() {
            0..=2 => 10.0,
            3..=5 => 20.0,
            6..=9 => 30.0,
            10..=15 => 25.0,
            _ => 20.0,
        };

        base + by_count
    }

    fn completeness(&self, labels: &[Label]) -> f64 {
        let mut score = COMPLETENESS_BASE;

        if self.detector.has_artwork(labels) {
            score += COMPLETENESS_ARTWORK_BONUS;
        }

        let high = labels
            .iter()
            .filter(|l| l.confidence > COMPLETENESS_HIGH_CONFIDENCE)
            .count();
        let very_high = labels
            .iter()
            .filter(|l| l.confidence > COMPLETENESS_VERY_HIGH_CONFIDENCE)
            .count();
        score += (high + very_high) as f64 * COMPLETENESS_PER_LABEL_BONUS;

        match mean_confidence(labels) {
            Some(mean) if mean > COMPLETENESS_MEAN_HIGH => score += COMPLETENESS_MEAN_HIGH_BONUS,
            Some(mean) if mean < COMPLETENESS_MEAN_LOW => score -= COMPLETENESS_MEAN_LOW_PENALTY,
            _ => {}
        }

        score.clamp(COMPLETENESS_MIN, COMPLETENESS_MAX)
    }

    /// Raw (unscaled) bonus term.
    pub fn bonus(&self, labels: &[Label], features: &FeatureFlags) -> f64 {
        let policy = &self.model.bonus;
        let mut bonus = 0.0;

        if self.detector.has_artwork(labels) {
            bonus += policy.artwork;
        }

        if features.has_primary_subject {
            bonus += policy.subject_present;
            if features.primary_subject_confidence >= policy.subject_high_confidence_threshold {
                bonus += policy.subject_high_confidence;
            }
        } else {
            bonus += policy.missing_term(Feature::PrimarySubject);
        }

        if features.has_accent_feature {
            bonus += policy.accent_present;
        } else {
            bonus += policy.missing_term(Feature::Accent);
        }

        if features.is_appealing {
            bonus += policy.appealing_present;
        } else {
            bonus += policy.missing_term(Feature::Appeal);
        }

        bonus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const WORDS: &[&str] = &[
        "Bird", "Gem", "Drawing", "Paper", "Text", "Cartoon", "Animal", "Diamond", "Sketch",
        "Person", "Pattern", "Circle", "Toy", "Line Art", "Face",
    ];

    fn scorer() -> HeuristicScorer {
        HeuristicScorer::default()
    }

    fn random_labels(rng: &mut StdRng) -> Vec<Label> {
        let count = rng.random_range(0..=30);
        (0..count)
            .map(|_| {
                let word = WORDS[rng.random_range(0..WORDS.len())];
                Label::new(word, rng.random_range(0.0..=100.0))
            })
            .collect()
    }

    #[test]
    fn test_default_model_is_valid() {
        assert_eq!(ScoringModel::default().validate(), Ok(()));
        assert!((CategoryWeights::default().sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_total_score_always_within_bounds() {
        let scorer = scorer();
        let mut rng = StdRng::seed_from_u64(0x0b5e55ed);
        for _ in 0..2000 {
            let labels = random_labels(&mut rng);
            let result = scorer.score(&labels);
            assert!(
                (10..=100).contains(&result.total_score),
                "score {} out of bounds for {:?}",
                result.total_score,
                labels
            );
        }
    }

    #[test]
    fn test_bounds_hold_with_recentring() {
        let model = ScoringModel {
            recentring: Some(Recentring {
                anchor: 60.0,
                factor: 0.8,
            }),
            floor: 20,
            ceiling: 95,
            ..ScoringModel::default()
        };
        let scorer = HeuristicScorer::new(model, FeatureDetector::default());
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..500 {
            let result = scorer.score(&random_labels(&mut rng));
            assert!((20..=95).contains(&result.total_score));
        }
    }

    #[test]
    fn test_empty_labels_score_near_floor() {
        let result = scorer().score(&[]);
        assert_eq!(result.features, FeatureFlags::none());
        assert_eq!(result.details.categories.composition, COMPOSITION_NO_SUBJECT);
        assert_eq!(result.details.categories.complexity, 10.0);
        assert_eq!(result.details.categories.completeness, COMPLETENESS_BASE);
        assert!(result.total_score <= 20, "got {}", result.total_score);
        assert_eq!(
            result.score_range_label,
            "Start from the basics and use the reference drawing."
        );
    }

    #[test]
    fn test_full_feature_set_scores_good() {
        let labels = vec![
            Label::new("bird-like mascot", 92.0),
            Label::new("gem ornament", 88.0),
            Label::new("illustration", 81.0),
        ];
        let result = scorer().score(&labels);

        assert!(result.features.has_primary_subject);
        assert!(result.features.has_accent_feature);
        assert!(result.features.is_appealing);
        assert!(
            (70..=89).contains(&result.total_score),
            "got {}",
            result.total_score
        );
        assert!(result.score_range_label.starts_with("Good"));
    }

    #[test]
    fn test_adding_subject_label_never_decreases_score() {
        let scorer = scorer();
        let mut rng = StdRng::seed_from_u64(7);
        let no_subject_words = ["Paper", "Text", "Gem", "Sketch", "Pattern", "Circle", "Face"];

        for _ in 0..500 {
            let count = rng.random_range(0..=15);
            let mut labels: Vec<Label> = (0..count)
                .map(|_| {
                    let word = no_subject_words[rng.random_range(0..no_subject_words.len())];
                    Label::new(word, rng.random_range(45.0..=100.0))
                })
                .collect();
            let before = scorer.score(&labels).total_score;

            labels.push(Label::new("Bird", rng.random_range(45.0..=100.0)));
            let after = scorer.score(&labels).total_score;

            assert!(after >= before, "{} -> {} for {:?}", before, after, labels);
        }
    }

    #[test]
    fn test_missing_subject_costs_more_than_presence_earns() {
        let policy = BonusPolicy::default();
        assert!(policy.subject_missing.abs() > policy.subject_present);
        assert!(policy.accent_missing.abs() >= policy.accent_present);
    }

    #[test]
    fn test_composition_caps_and_floors() {
        let scorer = scorer();
        let strong = vec![
            Label::new("Bird", 100.0),
            Label::new("Animal", 100.0),
            Label::new("Beak", 100.0),
        ];
        assert_eq!(scorer.category_scores(&strong).composition, 65.0);

        let weak = vec![Label::new("Bird", 60.0)];
        assert_eq!(scorer.category_scores(&weak).composition, COMPOSITION_NO_SUBJECT);
    }

    #[test]
    fn test_composition_uses_most_confident_labels_regardless_of_order() {
        let scorer = scorer();
        let labels = vec![
            Label::new("Paper", 76.0),
            Label::new("Text", 76.0),
            Label::new("Face", 76.0),
            Label::new("Pattern", 99.0),
            Label::new("Circle", 99.0),
            Label::new("Toy", 99.0),
        ];
        let mut reversed = labels.clone();
        reversed.reverse();

        let composition = scorer.category_scores(&labels).composition;
        assert!((composition - 58.8).abs() < 1e-9, "got {}", composition);
        assert_eq!(composition, scorer.category_scores(&reversed).composition);
        assert_eq!(
            scorer.score(&labels).total_score,
            scorer.score(&reversed).total_score
        );
    }

    #[test]
    fn test_complexity_step_function() {
        let scorer = scorer();
        let labels_of = |n: usize| -> Vec<Label> {
            (0..n).map(|i| Label::new(format!("Thing {}", i), 50.0)).collect()
        };
        assert_eq!(scorer.category_scores(&labels_of(2)).complexity, 10.0);
        assert_eq!(scorer.category_scores(&labels_of(4)).complexity, 20.0);
        assert_eq!(scorer.category_scores(&labels_of(8)).complexity, 30.0);
        assert_eq!(scorer.category_scores(&labels_of(12)).complexity, 25.0);
        assert_eq!(scorer.category_scores(&labels_of(20)).complexity, 20.0);
    }

    #[test]
    fn test_completeness_is_clamped() {
        let scorer = scorer();
        let many: Vec<Label> = (0..20).map(|i| Label::new(format!("Sketch {}", i), 99.0)).collect();
        assert_eq!(scorer.category_scores(&many).completeness, COMPLETENESS_MAX);

        let low = vec![Label::new("Paper", 46.0)];
        assert_eq!(scorer.category_scores(&low).completeness, 35.0);
    }

    #[test]
    fn test_recentring_pulls_toward_anchor() {
        let recentring = Recentring {
            anchor: 60.0,
            factor: 0.8,
        };
        assert_eq!(recentring.apply(60.0), 60.0);
        assert_eq!(recentring.apply(100.0), 92.0);
        assert_eq!(recentring.apply(10.0), 20.0);
    }

    #[test]
    fn test_range_label_buckets() {
        let model = ScoringModel::default();
        assert!(model.range_label(100).starts_with("Perfect"));
        assert!(model.range_label(90).starts_with("Perfect"));
        assert!(model.range_label(89).starts_with("Excellent"));
        assert!(model.range_label(65).starts_with("Decent"));
        assert!(model.range_label(39).starts_with("Start"));
    }

    #[test]
    fn test_invalid_weights_fall_back_to_defaults() {
        let model = ScoringModel {
            weights: CategoryWeights {
                composition: 0.5,
                complexity: 0.5,
                completeness: 0.5,
            },
            ..ScoringModel::default()
        };
        assert_eq!(
            model.validate(),
            Err(ScoringModelError::WeightsDoNotSumToOne(1.5))
        );
        let scorer = HeuristicScorer::new(model, FeatureDetector::default());
        assert_eq!(scorer.model(), &ScoringModel::default());
    }

    #[test]
    fn test_load_model_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(
            &path,
            r#"{
                "weights": {"composition": 0.4, "complexity": 0.1, "completeness": 0.5},
                "bands": [{"min": 0, "label": "low"}, {"min": 50, "label": "high"}]
            }"#,
        )
        .unwrap();

        let model = ScoringModel::load(&path).unwrap();
        assert_eq!(model.weights.composition, 0.4);
        assert_eq!(model.bonus_scale, 0.7);
        assert_eq!(model.range_label(55), "high");
        assert_eq!(model.range_label(12), "low");
    }

    #[test]
    fn test_load_missing_model_uses_defaults() {
        let model = ScoringModel::load_or_default(Path::new("/nonexistent/model.json"));
        assert_eq!(model, ScoringModel::default());
    }

    #[test]
    fn test_breakdown_accepts_essential_features_alias() {
        let scores: CategoryScores = serde_json::from_str(
            r#"{"composition": 70, "essential_features": 60, "completeness": 65}"#,
        )
        .unwrap();
        assert_eq!(scores.complexity, 60.0);
    }
}
