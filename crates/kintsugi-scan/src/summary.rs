//! Per-scan outcome reporting
//!
//! A scan always produces a summary, even when every source failed; partial
//! source failure is an expected condition, not a crash.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How one source fared this scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    /// Adapter finished cleanly
    Succeeded,
    /// Adapter exceeded its time budget; whatever it sent was kept
    Degraded,
    /// Adapter errored; the rest of the scan proceeded without it
    Failed,
}

impl SourceStatus {
    /// Stable string form
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceStatus::Succeeded => "succeeded",
            SourceStatus::Degraded => "degraded",
            SourceStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one source adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceReport {
    /// Adapter source id
    pub source_id: String,
    /// Final status
    pub status: SourceStatus,
    /// Records the adapter got into the pipeline before finishing
    pub records_emitted: usize,
    /// Error or timeout detail, when not Succeeded
    pub detail: Option<String>,
}

/// What one scan did, end to end
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Per-source outcomes
    pub sources: Vec<SourceReport>,
    /// Records that cleared normalization
    pub records_processed: usize,
    /// Records refused with an audit reason
    pub records_rejected: usize,
    /// Observations skipped as already-known replays
    pub records_replayed: usize,
    /// Clusters that gained members this scan
    pub clusters_touched: usize,
    /// Clusters newly opened this scan
    pub clusters_opened: usize,
    /// Artifacts (re)materialized this scan
    pub artifacts_materialized: usize,
    /// Cross-cluster bridges recorded for review
    pub merge_suggestions: usize,
    /// Member assignments the store actually applied
    pub rows_applied: usize,
    /// Wall-clock duration of the scan
    pub elapsed_ms: u64,
}

impl ScanSummary {
    /// True when every source finished cleanly
    pub fn all_sources_succeeded(&self) -> bool {
        self.sources.iter().all(|s| s.status == SourceStatus::Succeeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_strings() {
        assert_eq!(SourceStatus::Succeeded.as_str(), "succeeded");
        assert_eq!(SourceStatus::Degraded.as_str(), "degraded");
        assert_eq!(SourceStatus::Failed.as_str(), "failed");
    }

    #[test]
    fn test_all_sources_succeeded() {
        let mut summary = ScanSummary::default();
        assert!(summary.all_sources_succeeded());

        summary.sources.push(SourceReport {
            source_id: "tmp_scan".to_string(),
            status: SourceStatus::Degraded,
            records_emitted: 3,
            detail: Some("timed out after 120s".to_string()),
        });
        assert!(!summary.all_sources_succeeded());
    }
}
