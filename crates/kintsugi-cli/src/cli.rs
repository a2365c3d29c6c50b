//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Kintsugi - recover and reassemble the digital artifacts a machine left behind.
#[derive(Debug, Parser)]
#[command(name = "kintsugi")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path (default: ~/.kintsugi/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (IDs only)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the evidence sources and fuse what they find
    Scan(ScanArgs),

    /// List reconstructed artifacts
    List(ListArgs),

    /// Show one artifact with its full timeline and evidence
    Show(ShowArgs),

    /// Export artifacts as JSON, one record per line
    Export(ExportArgs),

    /// List cross-cluster merge suggestions awaiting review
    Suggestions,

    /// List records rejected during normalization
    Rejected,

    /// Mark artifacts older than the retention horizon as stale
    Sweep(SweepArgs),
}

/// Arguments for the scan command.
#[derive(Debug, Parser)]
pub struct ScanArgs {
    /// Roots to walk (overrides configured scan_roots)
    pub roots: Vec<PathBuf>,
}

/// Arguments for the list command.
#[derive(Debug, Parser)]
pub struct ListArgs {
    /// Filter by canonical path prefix (e.g. "tmp/notes")
    #[arg(short, long)]
    pub prefix: Option<String>,

    /// Minimum confidence (0.0-1.0)
    #[arg(long)]
    pub min_confidence: Option<f64>,

    /// Maximum confidence (0.0-1.0)
    #[arg(long)]
    pub max_confidence: Option<f64>,

    /// Only artifacts with a sighting at or after this instant (epoch ms)
    #[arg(long)]
    pub since: Option<u64>,

    /// Only artifacts with a sighting at or before this instant (epoch ms)
    #[arg(long)]
    pub until: Option<u64>,

    /// Include artifacts marked stale
    #[arg(long)]
    pub include_stale: bool,

    /// Maximum results
    #[arg(short, long, default_value = "50")]
    pub limit: usize,

    /// Results to skip (pagination)
    #[arg(short, long, default_value = "0")]
    pub offset: usize,
}

/// Arguments for the show command.
#[derive(Debug, Parser)]
pub struct ShowArgs {
    /// Artifact id (UUID)
    pub id: String,
}

/// Arguments for the export command.
#[derive(Debug, Parser)]
pub struct ExportArgs {
    /// Write to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Include artifacts marked stale
    #[arg(long)]
    pub include_stale: bool,
}

/// Arguments for the sweep command.
#[derive(Debug, Parser)]
pub struct SweepArgs {
    /// Retention horizon in seconds (default: configured retention_max_age_secs)
    #[arg(long)]
    pub max_age_secs: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_list_defaults() {
        let cli = Cli::parse_from(["kintsugi", "list"]);
        match cli.command {
            Command::List(args) => {
                assert_eq!(args.limit, 50);
                assert_eq!(args.offset, 0);
                assert!(!args.include_stale);
            }
            _ => panic!("expected list"),
        }
    }

    #[test]
    fn test_scan_roots_positional() {
        let cli = Cli::parse_from(["kintsugi", "scan", "/tmp", "/var/tmp"]);
        match cli.command {
            Command::Scan(args) => assert_eq!(args.roots.len(), 2),
            _ => panic!("expected scan"),
        }
    }
}
