//! Top-level configuration for a scan run
//!
//! Loaded from `~/.kintsugi/config.toml` (or `--config`); every field has a
//! documented default so an empty file is a valid configuration.

use crate::error::ScanError;
use kintsugi_correlate::CorrelateConfig;
use kintsugi_normalize::NormalizeConfig;
use kintsugi_score::ScoringWeights;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default per-adapter wall-clock budget (120 seconds)
pub const DEFAULT_ADAPTER_TIMEOUT_SECS: u64 = 120;

/// Default retention horizon before artifacts go stale (90 days)
pub const DEFAULT_RETENTION_MAX_AGE_SECS: u64 = 90 * 24 * 3600;

/// Configuration for the whole pipeline
///
/// The matching thresholds and scoring weights are tunable-by-design; the
/// right values depend on the noise profile of the machine being scanned.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KintsugiConfig {
    /// SQLite database path
    pub db_path: PathBuf,

    /// Roots the filesystem adapter walks
    pub scan_roots: Vec<PathBuf>,

    /// Recents-list JSON files, one adapter instance per entry
    pub recents_files: Vec<RecentsSource>,

    /// Source ids to run; empty means "all built-in adapters"
    pub enabled_sources: Vec<String>,

    /// Per-adapter wall-clock budget (seconds); an adapter exceeding it is
    /// marked Degraded and the scan proceeds with what it sent
    pub adapter_timeout_secs: u64,

    /// Artifacts whose newest sighting is older than this go stale (seconds)
    pub retention_max_age_secs: u64,

    /// Tolerance for adapter clock skew before a future instant is flagged
    /// suspect (seconds)
    pub skew_tolerance_secs: u64,

    /// Treat observed paths case-insensitively
    pub case_insensitive: bool,

    /// Minimum token-set similarity for a fuzzy match [0.0, 1.0]
    pub fuzzy_match_threshold: f64,

    /// Temporal proximity window for fuzzy matches (seconds)
    pub temporal_window_secs: u64,

    /// Confidence factor weights
    pub scoring_weights: ScoringWeights,
}

/// One recents-list source: a JSON file plus the source id to report it under
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentsSource {
    /// Source id, e.g. "vscode_recents"
    pub source_id: String,
    /// Path to the JSON recents file
    pub path: PathBuf,
}

impl Default for KintsugiConfig {
    fn default() -> Self {
        let correlate = CorrelateConfig::default();
        let normalize = NormalizeConfig::default();
        Self {
            db_path: PathBuf::from("kintsugi.db"),
            scan_roots: vec![std::env::temp_dir()],
            recents_files: Vec::new(),
            enabled_sources: Vec::new(),
            adapter_timeout_secs: DEFAULT_ADAPTER_TIMEOUT_SECS,
            retention_max_age_secs: DEFAULT_RETENTION_MAX_AGE_SECS,
            skew_tolerance_secs: normalize.skew_tolerance_ms / 1000,
            case_insensitive: false,
            fuzzy_match_threshold: correlate.fuzzy_match_threshold,
            temporal_window_secs: correlate.temporal_window_ms / 1000,
            scoring_weights: ScoringWeights::default(),
        }
    }
}

impl KintsugiConfig {
    /// Load from a TOML file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self, ScanError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text)
            .map_err(|e| ScanError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints
    pub fn validate(&self) -> Result<(), ScanError> {
        self.correlate_config().validate().map_err(ScanError::Config)?;
        self.scoring_weights.validate().map_err(ScanError::Config)?;
        if self.adapter_timeout_secs == 0 {
            return Err(ScanError::Config(
                "adapter_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.retention_max_age_secs == 0 {
            return Err(ScanError::Config(
                "retention_max_age_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether a source id should run this scan
    pub fn source_enabled(&self, source_id: &str) -> bool {
        self.enabled_sources.is_empty() || self.enabled_sources.iter().any(|s| s == source_id)
    }

    /// Normalizer configuration derived from this config
    pub fn normalize_config(&self) -> NormalizeConfig {
        NormalizeConfig {
            case_insensitive: self.case_insensitive,
            skew_tolerance_ms: self.skew_tolerance_secs * 1000,
            ..NormalizeConfig::default()
        }
    }

    /// Correlation configuration derived from this config
    pub fn correlate_config(&self) -> CorrelateConfig {
        CorrelateConfig {
            fuzzy_match_threshold: self.fuzzy_match_threshold,
            temporal_window_ms: self.temporal_window_secs * 1000,
        }
    }

    /// Adapter budget as a Duration
    pub fn adapter_timeout(&self) -> Duration {
        Duration::from_secs(self.adapter_timeout_secs)
    }

    /// Retention horizon in milliseconds
    pub fn retention_max_age_ms(&self) -> u64 {
        self.retention_max_age_secs * 1000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = KintsugiConfig::default();
        config.validate().unwrap();
        assert_eq!(config.adapter_timeout_secs, 120);
        assert_eq!(config.retention_max_age_secs, 90 * 24 * 3600);
        assert!(config.source_enabled("tmp_scan"));
    }

    #[test]
    fn test_empty_toml_is_defaults() {
        let config: KintsugiConfig = toml::from_str("").unwrap();
        assert_eq!(config.db_path, PathBuf::from("kintsugi.db"));
        assert!((config.fuzzy_match_threshold - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config: KintsugiConfig = toml::from_str(
            r#"
            db_path = "/var/lib/kintsugi/evidence.db"
            enabled_sources = ["tmp_scan"]
            fuzzy_match_threshold = 0.8

            [[recents_files]]
            source_id = "vscode_recents"
            path = "/home/me/.config/Code/recents.json"

            [scoring_weights]
            source_diversity = 0.5
            temporal_spread = 0.2
            content_presence = 0.3
            "#,
        )
        .unwrap();
        config.validate().unwrap();
        assert_eq!(config.db_path, PathBuf::from("/var/lib/kintsugi/evidence.db"));
        assert!(config.source_enabled("tmp_scan"));
        assert!(!config.source_enabled("vscode_recents"));
        assert_eq!(config.recents_files.len(), 1);
        assert!((config.scoring_weights.source_diversity - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_bad_threshold_rejected() {
        let mut config = KintsugiConfig::default();
        config.fuzzy_match_threshold = 1.5;
        assert!(config.validate().is_err());
    }
}
