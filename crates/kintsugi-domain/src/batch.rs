//! Proposed updates flowing from the engines into the store
//!
//! The correlation and scoring engines are pure; they never touch durable
//! state. Everything they decide is expressed as an [`IngestBatch`] that the
//! store applies in a single transaction.

use crate::artifact::ReconstructedArtifact;
use crate::cluster::ClusterId;
use crate::record::{EvidenceRecord, RecordId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which matching tier produced a correlation decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchRule {
    /// Exact content-hash match against a cluster member
    ContentHash,
    /// Exact path-signature match
    PathSignature,
    /// Fuzzy filename similarity plus temporal proximity
    Fuzzy,
}

impl MatchRule {
    /// Stable string form used in storage and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchRule::ContentHash => "content_hash",
            MatchRule::PathSignature => "path_signature",
            MatchRule::Fuzzy => "fuzzy",
        }
    }

    /// Parse the stable string form
    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "content_hash" => Ok(MatchRule::ContentHash),
            "path_signature" => Ok(MatchRule::PathSignature),
            "fuzzy" => Ok(MatchRule::Fuzzy),
            _ => Err(format!("Unknown match rule: {}", s)),
        }
    }
}

impl fmt::Display for MatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One record's assignment to a cluster, plus the recomputed representative
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterUpdate {
    /// Target cluster
    pub cluster_id: ClusterId,

    /// The record being appended as a member
    pub record: EvidenceRecord,

    /// True when this update opens a new singleton cluster
    pub opened: bool,

    /// Representative path after this merge
    pub representative_path: String,

    /// Representative hint after this merge
    pub representative_hint: Option<String>,
}

/// A cross-cluster bridge the correlator refused to apply
///
/// A single bridging record never merges two existing clusters; the bridge is
/// recorded here for human-in-the-loop review instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeSuggestion {
    /// The record that bridged two clusters
    pub record_id: RecordId,
    /// The cluster the record was actually assigned to
    pub assigned_cluster: ClusterId,
    /// The other cluster the record also matched
    pub other_cluster: ClusterId,
    /// The tier at which the other cluster matched
    pub rule: MatchRule,
    /// When the bridge was observed (epoch ms)
    pub observed_at_ms: u64,
}

/// Why the normalizer refused a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Observed path / synthetic identifier is empty
    EmptyPath,
    /// Source id is empty
    EmptySourceId,
    /// No stamps, no hint, no hash - nothing was observed
    NoObservations,
}

impl RejectReason {
    /// Stable string form used in the audit table
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::EmptyPath => "empty_path",
            RejectReason::EmptySourceId => "empty_source_id",
            RejectReason::NoObservations => "no_observations",
        }
    }

    /// Parse the stable string form
    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "empty_path" => Ok(RejectReason::EmptyPath),
            "empty_source_id" => Ok(RejectReason::EmptySourceId),
            "no_observations" => Ok(RejectReason::NoObservations),
            _ => Err(format!("Unknown reject reason: {}", s)),
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A malformed record kept for the audit trail, never clustered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedRecord {
    /// The record as received (pre-normalization)
    pub record: EvidenceRecord,
    /// Why it was refused
    pub reason: RejectReason,
}

/// Everything one scan proposes to persist, applied atomically
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestBatch {
    /// Member assignments (and any newly opened clusters)
    pub updates: Vec<ClusterUpdate>,
    /// Rescored artifacts for every cluster touched this scan
    pub artifacts: Vec<ReconstructedArtifact>,
    /// Cross-cluster bridges for human review
    pub suggestions: Vec<MergeSuggestion>,
    /// Audit-trail entries for refused records
    pub rejected: Vec<RejectedRecord>,
}

impl IngestBatch {
    /// True when there is nothing to persist
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
            && self.artifacts.is_empty()
            && self.suggestions.is_empty()
            && self.rejected.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_rule_round_trip() {
        for rule in [MatchRule::ContentHash, MatchRule::PathSignature, MatchRule::Fuzzy] {
            assert_eq!(MatchRule::parse(rule.as_str()).unwrap(), rule);
        }
        assert!(MatchRule::parse("psychic").is_err());
    }

    #[test]
    fn test_match_rule_priority_ordering() {
        // Derived Ord is the tier priority: lower = stronger evidence
        assert!(MatchRule::ContentHash < MatchRule::PathSignature);
        assert!(MatchRule::PathSignature < MatchRule::Fuzzy);
    }

    #[test]
    fn test_reject_reason_round_trip() {
        for reason in [
            RejectReason::EmptyPath,
            RejectReason::EmptySourceId,
            RejectReason::NoObservations,
        ] {
            assert_eq!(RejectReason::parse(reason.as_str()).unwrap(), reason);
        }
    }

    #[test]
    fn test_empty_batch() {
        assert!(IngestBatch::default().is_empty());
    }
}
