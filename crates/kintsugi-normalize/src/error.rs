//! Error types for the Normalizer

use thiserror::Error;

/// Errors that can occur while building a Normalizer
#[derive(Error, Debug)]
pub enum NormalizeError {
    /// A configured suffix-strip rule is not a valid regex
    #[error("Invalid strip rule '{pattern}': {source}")]
    InvalidRule {
        /// The offending pattern
        pattern: String,
        /// Underlying regex error
        source: regex::Error,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
