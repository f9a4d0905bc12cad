//! Feature detection over label names.
//!
//! Each feature is a keyword group: a list of case-insensitive regex
//! patterns matched against every label name. The groups are plain data so
//! they can be tuned from the config file without touching the scorer.

use super::labels::Label;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Reported subject confidence when no label matches the subject group.
pub const DEFAULT_SUBJECT_CONFIDENCE: f64 = 75.0;

/// Domain traits derived from a label set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureFlags {
    /// The mascot bird itself was recognised.
    pub has_primary_subject: bool,
    /// The gem/ornament accent was recognised.
    pub has_accent_feature: bool,
    /// Something reads as cute or cartoon-like.
    pub is_appealing: bool,
    pub primary_subject_confidence: f64,
}

impl FeatureFlags {
    /// Flags for an image where nothing was recognised.
    pub fn none() -> Self {
        Self {
            has_primary_subject: false,
            has_accent_feature: false,
            is_appealing: false,
            primary_subject_confidence: DEFAULT_SUBJECT_CONFIDENCE,
        }
    }

    /// Features that are missing, in remediation priority order.
    pub fn missing(&self) -> Vec<Feature> {
        let mut missing = Vec::new();
        if !self.has_primary_subject {
            missing.push(Feature::PrimarySubject);
        }
        if !self.has_accent_feature {
            missing.push(Feature::Accent);
        }
        if !self.is_appealing {
            missing.push(Feature::Appeal);
        }
        missing
    }
}

/// The individual traits the detector knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    PrimarySubject,
    Accent,
    Appeal,
}

impl Feature {
    /// Short description used inside prompts.
    pub fn describe(&self) -> &'static str {
        match self {
            Feature::PrimarySubject => "bird features (beak, wings, round body)",
            Feature::Accent => "the ruby gem on the tail",
            Feature::Appeal => "a cute, friendly expression",
        }
    }

    /// Concrete tip offered when the feature is missing.
    pub fn remediation_tip(&self) -> &'static str {
        match self {
            Feature::PrimarySubject => "Draw the bird features clearly: a beak, wings and a round body.",
            Feature::Accent => "Add the ruby gem to the tail so the drawing reads as Oruby.",
            Feature::Appeal => "Give the character a cuter, friendlier expression.",
        }
    }
}

/// Keyword groups, one list of regex patterns per feature.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FeatureKeywords {
    pub primary_subject: Vec<String>,
    pub accent: Vec<String>,
    pub appealing: Vec<String>,
    /// Labels meaning "this is a drawing", used by the scorer.
    pub artwork: Vec<String>,
}

fn patterns(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

impl Default for FeatureKeywords {
    fn default() -> Self {
        Self {
            primary_subject: patterns(&[
                "bird", "beak", "wing", "feather", "avian", "animal", "character", "mascot",
            ]),
            accent: patterns(&[
                "gem",
                "jewel",
                "crystal",
                "stone",
                "ornament",
                "accessor(y|ies)",
                "diamond",
                "ruby",
                "shape",
                "geometric",
                "triangle",
            ]),
            appealing: patterns(&[
                "cute",
                "adorable",
                "cartoon",
                "toy",
                "plush",
                "kawaii",
                "drawing",
                "sketch",
                "doodle",
                "simple",
                "illustration",
                "mascot",
            ]),
            artwork: patterns(&["drawing", "sketch", "illustration", r"\bart", "doodle"]),
        }
    }
}

/// A compiled keyword group. An empty group never matches.
#[derive(Debug, Clone)]
struct KeywordGroup(Option<Regex>);

impl KeywordGroup {
    fn compile(patterns: &[String]) -> Result<Self, regex::Error> {
        if patterns.is_empty() {
            return Ok(Self(None));
        }
        let alternation = patterns
            .iter()
            .map(|p| format!("(?:{})", p))
            .collect::<Vec<_>>()
            .join("|");
        Ok(Self(Some(Regex::new(&format!("(?i){}", alternation))?)))
    }

    fn matches(&self, label: &Label) -> bool {
        self.0.as_ref().is_some_and(|re| re.is_match(&label.name))
    }

    fn any(&self, labels: &[Label]) -> bool {
        labels.iter().any(|l| self.matches(l))
    }
}

/// Derives [`FeatureFlags`] from labels.
#[derive(Debug, Clone)]
pub struct FeatureDetector {
    primary_subject: KeywordGroup,
    accent: KeywordGroup,
    appealing: KeywordGroup,
    artwork: KeywordGroup,
}

impl FeatureDetector {
    pub fn new(keywords: &FeatureKeywords) -> Result<Self, regex::Error> {
        Ok(Self {
            primary_subject: KeywordGroup::compile(&keywords.primary_subject)?,
            accent: KeywordGroup::compile(&keywords.accent)?,
            appealing: KeywordGroup::compile(&keywords.appealing)?,
            artwork: KeywordGroup::compile(&keywords.artwork)?,
        })
    }

    pub fn detect(&self, labels: &[Label]) -> FeatureFlags {
        let primary_subject_confidence = labels
            .iter()
            .filter(|l| self.primary_subject.matches(l))
            .map(|l| l.confidence)
            .fold(None, |max: Option<f64>, c| Some(max.map_or(c, |m| m.max(c))))
            .unwrap_or(DEFAULT_SUBJECT_CONFIDENCE);

        FeatureFlags {
            has_primary_subject: self.primary_subject.any(labels),
            has_accent_feature: self.accent.any(labels),
            is_appealing: self.appealing.any(labels),
            primary_subject_confidence,
        }
    }

    pub fn is_primary_subject(&self, label: &Label) -> bool {
        self.primary_subject.matches(label)
    }

    pub fn is_artwork(&self, label: &Label) -> bool {
        self.artwork.matches(label)
    }

    pub fn has_artwork(&self, labels: &[Label]) -> bool {
        self.artwork.any(labels)
    }
}

impl Default for FeatureDetector {
    fn default() -> Self {
        // The built-in patterns are static and known to compile.
        Self::new(&FeatureKeywords::default()).expect("built-in feature keywords must compile")
    }
}
