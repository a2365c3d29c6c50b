//! Rejected command implementation.

use crate::commands::open_store;
use crate::error::Result;
use crate::output::Formatter;
use kintsugi_domain::ArtifactStore;
use kintsugi_scan::KintsugiConfig;

/// Execute the rejected command: the normalization audit trail.
pub fn execute_rejected(config: &KintsugiConfig, formatter: &Formatter) -> Result<()> {
    let store = open_store(config)?;
    let rejected = store.list_rejected()?;
    println!("{}", formatter.format_rejected(&rejected)?);
    Ok(())
}
