//! Kintsugi CLI library.
//!
//! Thin layer over the scan pipeline and the artifact store: argument
//! parsing, configuration resolution, and output formatting. All recovery
//! logic lives in the engine crates.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use cli::{Cli, Command};
pub use error::{CliError, Result};
pub use output::{Formatter, OutputFormat};
