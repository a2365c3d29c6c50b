//! List command implementation.

use crate::cli::ListArgs;
use crate::commands::open_store;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use kintsugi_domain::{ArtifactQuery, ArtifactStore};
use kintsugi_scan::KintsugiConfig;

/// Execute the list command.
pub fn execute_list(
    args: ListArgs,
    config: &KintsugiConfig,
    formatter: &Formatter,
) -> Result<()> {
    for bound in [args.min_confidence, args.max_confidence].into_iter().flatten() {
        if !(0.0..=1.0).contains(&bound) {
            return Err(CliError::InvalidInput(
                "Confidence must be between 0.0 and 1.0".to_string(),
            ));
        }
    }

    let query = ArtifactQuery {
        signature_prefix: args.prefix,
        min_confidence: args.min_confidence,
        max_confidence: args.max_confidence,
        since_ms: args.since,
        until_ms: args.until,
        include_stale: args.include_stale,
        limit: Some(args.limit),
        offset: Some(args.offset),
    };

    let store = open_store(config)?;
    let artifacts = store.list_artifacts(&query)?;
    println!("{}", formatter.format_artifacts(&artifacts)?);
    Ok(())
}
