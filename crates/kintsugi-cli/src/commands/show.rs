//! Show command implementation.

use crate::cli::ShowArgs;
use crate::commands::open_store;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use kintsugi_domain::{ArtifactStore, ClusterId};
use kintsugi_scan::KintsugiConfig;

/// Execute the show command.
pub fn execute_show(
    args: ShowArgs,
    config: &KintsugiConfig,
    formatter: &Formatter,
) -> Result<()> {
    let id = ClusterId::from_string(&args.id).map_err(CliError::InvalidInput)?;

    let store = open_store(config)?;
    let artifact = store
        .get_artifact(id)?
        .ok_or_else(|| CliError::InvalidInput(format!("no artifact with id {}", args.id)))?;

    println!("{}", formatter.format_artifact_detail(&artifact)?);
    Ok(())
}
