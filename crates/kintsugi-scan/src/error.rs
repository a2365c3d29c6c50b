//! Error types for the scan harness and pipeline

use thiserror::Error;

/// Errors that can occur while building or running a scan
#[derive(Error, Debug)]
pub enum ScanError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A source adapter failed; the pipeline records this per-source and
    /// keeps going, so this surfaces only from the adapter itself
    #[error("Source '{source_id}' unavailable: {message}")]
    SourceUnavailable {
        /// Adapter source id
        source_id: String,
        /// What went wrong
        message: String,
    },

    /// Normalizer construction failed (bad strip rule)
    #[error(transparent)]
    Normalize(#[from] kintsugi_normalize::NormalizeError),

    /// Correlator construction failed (bad thresholds)
    #[error(transparent)]
    Correlate(#[from] kintsugi_correlate::CorrelateError),

    /// Store operation failed after retries were exhausted
    #[error(transparent)]
    Store(#[from] kintsugi_store::StoreError),

    /// Filesystem error outside any adapter (e.g. reading a config file)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
