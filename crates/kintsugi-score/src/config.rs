//! Tunable weights for the confidence formula

use serde::{Deserialize, Serialize};

/// Default weight for evidence diversity (distinct sources)
pub const DEFAULT_SOURCE_DIVERSITY_WEIGHT: f64 = 0.4;

/// Default weight for temporal spread
pub const DEFAULT_TEMPORAL_SPREAD_WEIGHT: f64 = 0.25;

/// Default weight for content presence (hash/hint vs metadata-only)
pub const DEFAULT_CONTENT_PRESENCE_WEIGHT: f64 = 0.35;

/// Factor weights for the confidence formula
///
/// The weighted sum is normalized by the weight total, so the weights need
/// not sum to 1.0. The defaults are a starting point for empirical
/// calibration, not a claim about the One True Weighting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Weight for distinct contributing sources
    pub source_diversity: f64,
    /// Weight for sightings spread over time
    pub temporal_spread: f64,
    /// Weight for presence of recoverable content
    pub content_presence: f64,
}

impl ScoringWeights {
    /// Validate: weights must be non-negative and not all zero
    pub fn validate(&self) -> Result<(), String> {
        let weights = [self.source_diversity, self.temporal_spread, self.content_presence];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err("scoring weights must be finite and non-negative".to_string());
        }
        if weights.iter().sum::<f64>() == 0.0 {
            return Err("at least one scoring weight must be positive".to_string());
        }
        Ok(())
    }

    /// Sum of all weights (the normalization denominator)
    pub fn total(&self) -> f64 {
        self.source_diversity + self.temporal_spread + self.content_presence
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            source_diversity: DEFAULT_SOURCE_DIVERSITY_WEIGHT,
            temporal_spread: DEFAULT_TEMPORAL_SPREAD_WEIGHT,
            content_presence: DEFAULT_CONTENT_PRESENCE_WEIGHT,
        }
    }
}
