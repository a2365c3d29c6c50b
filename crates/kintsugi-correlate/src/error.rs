//! Error types for the Correlation Engine

use thiserror::Error;

/// Errors that can occur while building a correlator
#[derive(Error, Debug)]
pub enum CorrelateError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
