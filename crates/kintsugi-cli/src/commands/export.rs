//! Export command implementation.

use crate::cli::ExportArgs;
use crate::commands::open_store;
use crate::error::Result;
use crate::output::{artifact_json, Formatter};
use kintsugi_domain::{ArtifactQuery, ArtifactStore};
use kintsugi_scan::KintsugiConfig;
use std::io::Write;

/// Execute the export command: one JSON record per artifact, one per line.
pub fn execute_export(
    args: ExportArgs,
    config: &KintsugiConfig,
    formatter: &Formatter,
) -> Result<()> {
    let store = open_store(config)?;
    let artifacts = store.list_artifacts(&ArtifactQuery {
        include_stale: args.include_stale,
        ..Default::default()
    })?;

    let mut lines = String::new();
    for artifact in &artifacts {
        lines.push_str(&serde_json::to_string(&artifact_json(artifact))?);
        lines.push('\n');
    }

    match args.output {
        Some(path) => {
            let mut file = std::fs::File::create(&path)?;
            file.write_all(lines.as_bytes())?;
            println!(
                "{}",
                formatter.success(&format!(
                    "exported {} artifact(s) to {}",
                    artifacts.len(),
                    path.display()
                ))
            );
        }
        None => print!("{}", lines),
    }
    Ok(())
}
