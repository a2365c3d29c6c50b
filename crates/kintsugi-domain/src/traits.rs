//! Trait definitions for external interactions
//!
//! These traits define the boundary between the engines and infrastructure.
//! The SQLite implementation lives in `kintsugi-store`.

use crate::artifact::ReconstructedArtifact;
use crate::batch::{IngestBatch, MergeSuggestion, RejectedRecord};
use crate::cluster::{ClusterId, EvidenceCluster};
use crate::record::EvidenceRecord;

/// Durable, idempotent persistence of clusters and artifacts
///
/// The store exclusively owns cluster and artifact lifetime; `ingest` is the
/// single point of mutation and must be transactional per batch - either the
/// whole batch commits or none of it does.
pub trait ArtifactStore {
    /// Error type for store operations
    type Error;

    /// Apply a batch atomically; returns the number of newly applied member
    /// assignments (replaying an already-applied batch returns 0)
    fn ingest(&mut self, batch: &IngestBatch) -> Result<usize, Self::Error>;

    /// Get an artifact by id
    fn get_artifact(&self, id: ClusterId) -> Result<Option<ReconstructedArtifact>, Self::Error>;

    /// Get a cluster by id
    fn get_cluster(&self, id: ClusterId) -> Result<Option<EvidenceCluster>, Self::Error>;

    /// All member records of a cluster
    fn cluster_members(&self, id: ClusterId) -> Result<Vec<EvidenceRecord>, Self::Error>;

    /// All clusters (used to rebuild the correlation index)
    fn list_clusters(&self) -> Result<Vec<EvidenceCluster>, Self::Error>;

    /// Artifacts matching the query, paginated
    fn list_artifacts(&self, query: &ArtifactQuery) -> Result<Vec<ReconstructedArtifact>, Self::Error>;

    /// Cross-cluster merge suggestions awaiting human review
    fn list_suggestions(&self) -> Result<Vec<MergeSuggestion>, Self::Error>;

    /// Audit trail of rejected records
    fn list_rejected(&self) -> Result<Vec<RejectedRecord>, Self::Error>;

    /// Mark artifacts whose newest sighting is older than `max_age_ms` as
    /// stale; returns how many were marked. Never deletes.
    fn sweep_stale(&mut self, max_age_ms: u64, now_ms: u64) -> Result<usize, Self::Error>;
}

/// Query criteria for retrieving artifacts
#[derive(Debug, Clone, Default)]
pub struct ArtifactQuery {
    /// Filter by canonical path-signature prefix of the best name /
    /// representative path
    pub signature_prefix: Option<String>,

    /// Minimum confidence (inclusive)
    pub min_confidence: Option<f64>,

    /// Maximum confidence (inclusive)
    pub max_confidence: Option<f64>,

    /// Only artifacts with a timeline event at or after this instant
    pub since_ms: Option<u64>,

    /// Only artifacts with a timeline event at or before this instant
    pub until_ms: Option<u64>,

    /// Include artifacts marked stale (excluded by default)
    pub include_stale: bool,

    /// Maximum results to return
    pub limit: Option<usize>,

    /// Results to skip (pagination)
    pub offset: Option<usize>,
}
