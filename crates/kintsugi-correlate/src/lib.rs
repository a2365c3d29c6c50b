//! Kintsugi Correlation Engine
//!
//! Clusters normalized evidence records that plausibly describe the same
//! underlying document, across sources and across time.
//!
//! The engine is incremental and deterministic: within a scan batch, records
//! are processed in a total order derived from their content - never arrival
//! order - so permuting adapter completion order cannot change the final
//! cluster assignment. Matching runs in three priority tiers:
//!
//! 1. exact `content_hash` match against any cluster member
//! 2. exact `path_signature` match
//! 3. fuzzy token-set filename similarity gated by temporal proximity
//!
//! Two existing clusters are never merged on the strength of a single
//! bridging record; bridges surface as [`MergeSuggestion`]s for human
//! review (a false merge is costlier than a missed one).
//!
//! [`MergeSuggestion`]: kintsugi_domain::MergeSuggestion

#![warn(missing_docs)]

pub mod config;
pub mod correlator;
pub mod error;
pub mod index;
pub mod similarity;

pub use config::CorrelateConfig;
pub use correlator::{CorrelationOutput, Correlator};
pub use error::CorrelateError;
pub use index::{ClusterIndex, ClusterSummary};
