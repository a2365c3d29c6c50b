//! Reconstructed artifacts - the scoring engine's output for a cluster

use crate::cluster::ClusterId;
use crate::confidence::Confidence;
use crate::record::StampKind;
use serde::{Deserialize, Serialize};

/// One sighting on an artifact's timeline
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimelineEvent {
    /// When it happened (epoch ms)
    pub at_ms: u64,
    /// What kind of event the source reported
    pub kind: StampKind,
    /// Which source reported it
    pub source_id: String,
}

/// The scored, summarized reconstruction of a cluster
///
/// Lifecycle: materialized when a cluster first clears the minimum evidence
/// threshold; recomputed and replaced wholesale whenever its cluster gains
/// members; never deleted, only marked stale by the retention sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconstructedArtifact {
    /// Identifier - always equal to the cluster id
    pub id: ClusterId,

    /// Confidence that this artifact describes one real document
    pub confidence: Confidence,

    /// Best-guess document name
    pub best_name: String,

    /// Best-guess content preview, if any member carried one
    pub preview: Option<String>,

    /// Distinct applications/origins that contributed evidence
    pub origin_apps: Vec<String>,

    /// Ordered sightings drawn from member timestamps (suspect stamps excluded)
    pub timeline: Vec<TimelineEvent>,

    /// Marked by the retention sweep when the evidence has aged out
    pub stale: bool,

    /// When this artifact was (re)computed (epoch ms)
    pub scored_at_ms: u64,
}

impl ReconstructedArtifact {
    /// Most recent instant on the timeline, if any
    pub fn newest_event_ms(&self) -> Option<u64> {
        self.timeline.iter().map(|e| e.at_ms).max()
    }
}
