//! Kintsugi Scoring Engine
//!
//! Pure function of a cluster's member set: decides whether the cluster has
//! cleared the minimum evidence threshold, and if so produces the
//! [`ReconstructedArtifact`] - confidence score, best-guess name, preview,
//! contributing apps, and the sighting timeline.
//!
//! Confidence combines three factors, weighted by configuration:
//!
//! - **source diversity**: distinct sources contributing evidence
//! - **temporal spread**: sightings spread over time score higher than a
//!   pile-up at one instant
//! - **content presence**: actual recoverable bytes beat metadata-only
//!   sightings
//!
//! The weights are deliberately configuration, not law - see
//! [`ScoringWeights`].
//!
//! [`ReconstructedArtifact`]: kintsugi_domain::ReconstructedArtifact

#![warn(missing_docs)]

pub mod config;
pub mod score;

pub use config::ScoringWeights;
pub use score::{meets_evidence_threshold, score_cluster};
