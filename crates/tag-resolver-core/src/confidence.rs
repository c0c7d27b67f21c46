//! Confidence classification and routing.
//!
//! Confidence blends two signals from the ranked score list:
//!
//! - **margin**: `(top - second) / top`, how clearly the leader stands out;
//! - **magnitude**: `top / (top + saturation)`, how much evidence the
//!   leader has in absolute terms.
//!
//! `confidence = margin_weight × margin + magnitude_weight × magnitude`,
//! plus a boost when there is only one candidate. Margin carries the larger
//! weight, so a dominant leader with a modest score still routes to
//! `return_path` while a narrow race between strong matches asks the user.

use serde::{Deserialize, Serialize};

/// Documented default threshold between `high` and `low`.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLabel {
    High,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextStep {
    ReturnPath,
    Clarify,
}

/// Classification of a single request's ranked scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceResult {
    /// Normalized confidence in `[0, 1]`.
    pub score: f64,
    pub label: ConfidenceLabel,
    pub next_step: NextStep,
}

/// Tunables for [`classify`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceParams {
    pub threshold: f64,
    pub margin_weight: f64,
    pub magnitude_weight: f64,
    /// Top score at which magnitude reaches 0.5.
    pub magnitude_saturation: f64,
    pub single_candidate_boost: f64,
}

impl Default for ConfidenceParams {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            margin_weight: 0.6,
            magnitude_weight: 0.4,
            magnitude_saturation: 3.0,
            single_candidate_boost: 0.2,
        }
    }
}

/// Normalized confidence for scores sorted in descending order.
pub fn compute_confidence(scores: &[f64], params: &ConfidenceParams) -> f64 {
    let top = match scores.first() {
        Some(s) if s.is_finite() && *s > 0.0 => *s,
        _ => return 0.0,
    };
    let second = scores
        .get(1)
        .copied()
        .filter(|s| s.is_finite())
        .unwrap_or(0.0)
        .clamp(0.0, top);

    let margin = (top - second) / top;
    let magnitude = top / (top + params.magnitude_saturation);
    let mut confidence = params.margin_weight * margin + params.magnitude_weight * magnitude;

    if scores.len() == 1 {
        confidence += params.single_candidate_boost;
    }

    confidence.clamp(0.0, 1.0)
}

/// Confidence plus the label and routing decision at `params.threshold`.
pub fn classify(scores: &[f64], params: &ConfidenceParams) -> ConfidenceResult {
    let score = compute_confidence(scores, params);
    if score >= params.threshold {
        ConfidenceResult {
            score,
            label: ConfidenceLabel::High,
            next_step: NextStep::ReturnPath,
        }
    } else {
        ConfidenceResult {
            score,
            label: ConfidenceLabel::Low,
            next_step: NextStep::Clarify,
        }
    }
}
