//! Kintsugi Normalizer
//!
//! Cleans and canonicalizes raw evidence records before correlation:
//! lexical path canonicalization, `path_signature` derivation via
//! configurable suffix-strip rules, timestamp clamping with `suspect`
//! flagging, and rejection of malformed records with audit reason codes.
//!
//! Normalization is deterministic and pure: the wall clock is passed in,
//! and no filesystem access happens here.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod normalizer;

pub use config::NormalizeConfig;
pub use error::NormalizeError;
pub use normalizer::{NormalizeOutcome, Normalizer};
