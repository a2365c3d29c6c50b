//! Kintsugi Scan Harness
//!
//! Runs the evidence sources and fuses what they find. Each adapter is a
//! producer behind the [`SourceAdapter`] trait; the pipeline drives them
//! concurrently under per-adapter time budgets, normalizes and correlates
//! the merged stream, rescores the touched clusters, and persists one
//! transactional batch.
//!
//! Failure model: a broken source is marked Failed, a slow one Degraded,
//! and the scan finishes with whatever evidence it got. Only a corrupt
//! store or an exhausted ingest-retry budget aborts a run.

#![warn(missing_docs)]

pub mod adapter;
pub mod adapters;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod summary;

pub use adapter::{FieldMap, RawEvidence, ScanContext, SourceAdapter};
pub use adapters::{RecentsAdapter, TempScanAdapter};
pub use config::{KintsugiConfig, RecentsSource};
pub use error::ScanError;
pub use pipeline::{built_in_adapters, ScanPipeline};
pub use summary::{ScanSummary, SourceReport, SourceStatus};
pub use tokio_util::sync::CancellationToken;
