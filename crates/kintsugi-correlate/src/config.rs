//! Configuration for the Correlation Engine

use serde::{Deserialize, Serialize};

/// Default fuzzy-match acceptance threshold (token-set similarity)
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.6;

/// Default temporal proximity window for fuzzy matches (24 hours)
pub const DEFAULT_TEMPORAL_WINDOW_MS: u64 = 24 * 60 * 60 * 1000;

/// Configuration for the Correlation Engine
///
/// Both knobs are tunable-by-design: the right values depend on the noise
/// profile of the machine being scanned and are meant to be calibrated
/// empirically, not guessed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelateConfig {
    /// Minimum token-set similarity for a tier-3 fuzzy match [0.0, 1.0]
    pub fuzzy_match_threshold: f64,

    /// Maximum distance between a record's instant and a cluster's observed
    /// time range for a fuzzy match (milliseconds)
    pub temporal_window_ms: u64,
}

impl CorrelateConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.fuzzy_match_threshold) {
            return Err(format!(
                "fuzzy_match_threshold must be in [0.0, 1.0], got {}",
                self.fuzzy_match_threshold
            ));
        }
        if self.temporal_window_ms == 0 {
            return Err("temporal_window_ms must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for CorrelateConfig {
    fn default() -> Self {
        Self {
            fuzzy_match_threshold: DEFAULT_FUZZY_THRESHOLD,
            temporal_window_ms: DEFAULT_TEMPORAL_WINDOW_MS,
        }
    }
}
