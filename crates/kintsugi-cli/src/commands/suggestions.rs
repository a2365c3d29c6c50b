//! Suggestions command implementation.

use crate::commands::open_store;
use crate::error::Result;
use crate::output::Formatter;
use kintsugi_domain::ArtifactStore;
use kintsugi_scan::KintsugiConfig;

/// Execute the suggestions command: cross-cluster bridges awaiting review.
pub fn execute_suggestions(config: &KintsugiConfig, formatter: &Formatter) -> Result<()> {
    let store = open_store(config)?;
    let suggestions = store.list_suggestions()?;
    println!("{}", formatter.format_suggestions(&suggestions)?);
    Ok(())
}
