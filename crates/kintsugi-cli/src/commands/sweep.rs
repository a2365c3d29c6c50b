//! Sweep command implementation.

use crate::cli::SweepArgs;
use crate::commands::{now_ms, open_store};
use crate::error::Result;
use crate::output::Formatter;
use kintsugi_domain::ArtifactStore;
use kintsugi_scan::KintsugiConfig;

/// Execute the sweep command: mark artifacts past retention as stale.
///
/// Nothing is deleted; stale artifacts drop out of default listings but
/// stay queryable with `--include-stale`.
pub fn execute_sweep(
    args: SweepArgs,
    config: &KintsugiConfig,
    formatter: &Formatter,
) -> Result<()> {
    let max_age_ms = args
        .max_age_secs
        .map(|s| s * 1000)
        .unwrap_or_else(|| config.retention_max_age_ms());

    let mut store = open_store(config)?;
    let marked = store.sweep_stale(max_age_ms, now_ms())?;
    println!(
        "{}",
        formatter.success(&format!("marked {} artifact(s) stale", marked))
    );
    Ok(())
}
