//! Kintsugi Domain Layer
//!
//! Core model for the evidence-fusion pipeline. This crate defines the
//! fundamental concepts every other layer depends on and stays free of
//! infrastructure concerns (no I/O, no storage, no async).
//!
//! ## Key Concepts
//!
//! - **Evidence Record**: one immutable observation from one source about a
//!   possible document (a recents-list entry, an orphaned temp file, a cache
//!   blob)
//! - **Path Signature**: the join key derived from an observed path with
//!   temp/random suffixes stripped
//! - **Evidence Cluster**: a growing, append-only set of records believed to
//!   describe the same real document
//! - **Reconstructed Artifact**: the scored, summarized output derived from a
//!   cluster, replaced wholesale on rescore and never partially mutated
//!
//! ## Architecture
//!
//! Trait definitions for persistence live in [`traits`]; the SQLite
//! implementation lives in `kintsugi-store`. The correlation and scoring
//! engines are pure functions over these types, producing proposed updates
//! ([`batch::IngestBatch`]) that the store applies transactionally.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod artifact;
pub mod batch;
pub mod cluster;
pub mod confidence;
pub mod record;
pub mod signature;
pub mod traits;

// Re-exports for convenience
pub use artifact::{ReconstructedArtifact, TimelineEvent};
pub use batch::{ClusterUpdate, IngestBatch, MatchRule, MergeSuggestion, RejectReason, RejectedRecord};
pub use cluster::{ClusterId, EvidenceCluster};
pub use confidence::Confidence;
pub use record::{EvidenceRecord, ObservedPath, RecordId, Stamp, StampKind};
pub use signature::PathSignature;
pub use traits::{ArtifactQuery, ArtifactStore};
