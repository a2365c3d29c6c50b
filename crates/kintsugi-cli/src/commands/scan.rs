//! Scan command implementation.

use crate::cli::ScanArgs;
use crate::commands::{now_ms, open_store};
use crate::error::Result;
use crate::output::Formatter;
use kintsugi_scan::{built_in_adapters, CancellationToken, KintsugiConfig, ScanPipeline};

/// Execute the scan command.
pub async fn execute_scan(
    args: ScanArgs,
    mut config: KintsugiConfig,
    formatter: &Formatter,
) -> Result<()> {
    if !args.roots.is_empty() {
        config.scan_roots = args.roots;
    }

    let pipeline = ScanPipeline::from_config(&config)?;
    let adapters = built_in_adapters(&config);
    if adapters.is_empty() {
        println!("{}", formatter.error("no sources enabled; nothing to scan"));
        return Ok(());
    }

    let mut store = open_store(&config)?;

    // Ctrl-C stops the sources; evidence already collected still commits
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, stopping scan");
            signal_cancel.cancel();
        }
    });

    let summary = pipeline
        .run_with_cancel(adapters, &mut store, now_ms(), cancel)
        .await?;
    println!("{}", formatter.format_summary(&summary)?);
    Ok(())
}
