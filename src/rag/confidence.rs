//! Confidence scoring and answer guardrails.

use crate::config::{ConfidenceSettings, NOT_FOUND_SENTINEL};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

/// Source agreement when two or more chunks were retrieved.
const MULTI_SOURCE_AGREEMENT: f32 = 1.0;
/// Source agreement for a single retrieved chunk.
const SINGLE_SOURCE_AGREEMENT: f32 = 0.7;

/// Coarse confidence bucket shown to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceCategory {
    High,
    Medium,
    Low,
}

impl ConfidenceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceCategory::High => "high",
            ConfidenceCategory::Medium => "medium",
            ConfidenceCategory::Low => "low",
        }
    }

    /// Display colour for the category.
    pub fn color(&self) -> &'static str {
        match self {
            ConfidenceCategory::High => "green",
            ConfidenceCategory::Medium => "yellow",
            ConfidenceCategory::Low => "red",
        }
    }
}

impl fmt::Display for ConfidenceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A confidence score formatted for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfidenceDisplay {
    pub score: f32,
    pub category: ConfidenceCategory,
    pub color: &'static str,
    /// Score as a percentage with one decimal, e.g. `"82.4%"`.
    pub percentage: String,
}

/// The scores behind an answer's confidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceAssessment {
    pub avg_similarity: f32,
    pub source_agreement: f32,
    pub confidence: f32,
    pub category: ConfidenceCategory,
}

/// Outcome of the pre-generation guardrail.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardrailDecision {
    Pass,
    Reject(String),
}

impl GuardrailDecision {
    pub fn passed(&self) -> bool {
        matches!(self, GuardrailDecision::Pass)
    }
}

/// Scores retrieval results and applies the answer guardrails.
#[derive(Debug, Clone)]
pub struct ConfidenceScorer {
    settings: ConfidenceSettings,
}

impl Default for ConfidenceScorer {
    fn default() -> Self {
        Self::new(ConfidenceSettings::default())
    }
}

impl ConfidenceScorer {
    pub fn new(settings: ConfidenceSettings) -> Self {
        Self { settings }
    }

    /// Bucket a confidence score.
    pub fn categorize(&self, confidence: f32) -> ConfidenceCategory {
        if confidence >= self.settings.high_threshold {
            ConfidenceCategory::High
        } else if confidence >= self.settings.medium_threshold {
            ConfidenceCategory::Medium
        } else {
            ConfidenceCategory::Low
        }
    }

    /// Format a score with its category, colour and percentage.
    pub fn display(&self, score: f32) -> ConfidenceDisplay {
        let category = self.categorize(score);
        ConfidenceDisplay {
            score: round3(score),
            category,
            color: category.color(),
            percentage: format!("{:.1}%", score * 100.0),
        }
    }

    /// Score a set of retrieval similarities.
    pub fn assess(&self, similarities: &[f32]) -> ConfidenceAssessment {
        let avg_similarity = if similarities.is_empty() {
            0.0
        } else {
            similarities.iter().sum::<f32>() / similarities.len() as f32
        };

        let source_agreement = if similarities.len() >= 2 {
            MULTI_SOURCE_AGREEMENT
        } else {
            SINGLE_SOURCE_AGREEMENT
        };

        let confidence = self.settings.similarity_weight * avg_similarity
            + self.settings.agreement_weight * source_agreement;

        info!(
            "Confidence: {:.3} (similarity: {:.3}, agreement: {:.3})",
            confidence, avg_similarity, source_agreement
        );

        ConfidenceAssessment {
            avg_similarity,
            source_agreement,
            confidence,
            category: self.categorize(confidence),
        }
    }

    /// Decide whether an answer should be generated at all.
    pub fn pre_check(&self, assessment: &ConfidenceAssessment) -> GuardrailDecision {
        if assessment.avg_similarity < self.settings.similarity_threshold {
            let reason = format!(
                "Retrieval score {:.3} below threshold {}",
                assessment.avg_similarity, self.settings.similarity_threshold
            );
            warn!("Guardrail triggered: {}", reason);
            return GuardrailDecision::Reject(reason);
        }

        if assessment.confidence < self.settings.confidence_threshold {
            let reason = format!(
                "Confidence {:.3} below threshold {}",
                assessment.confidence, self.settings.confidence_threshold
            );
            warn!("Guardrail triggered: {}", reason);
            return GuardrailDecision::Reject(reason);
        }

        GuardrailDecision::Pass
    }

    /// Check a generated answer. Returns false when the model reported that
    /// the context does not contain the answer.
    ///
    /// Confidence thresholds are enforced by [`ConfidenceScorer::pre_check`]
    /// before generation; only the answer text is inspected here.
    pub fn post_check(&self, answer: &str) -> bool {
        if answer.to_lowercase().contains(&NOT_FOUND_SENTINEL.to_lowercase()) {
            warn!("Guardrail triggered after generation: model found no answer in context");
            return false;
        }

        true
    }
}

/// Round to three decimal places.
pub(crate) fn round3(value: f32) -> f32 {
    (value * 1000.0).round() / 1000.0
}
