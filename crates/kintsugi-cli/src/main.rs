//! Kintsugi CLI - forensic recovery of lost digital artifacts.

use clap::Parser;
use kintsugi_cli::commands;
use kintsugi_cli::{Cli, Command, Formatter, OutputFormat};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = kintsugi_cli::config::load_config(cli.config.as_deref())?;
    let format = cli.format.map(Into::into).unwrap_or(OutputFormat::Table);
    let formatter = Formatter::new(format, !cli.no_color);

    match cli.command {
        Command::Scan(args) => commands::execute_scan(args, config, &formatter).await?,
        Command::List(args) => commands::execute_list(args, &config, &formatter)?,
        Command::Show(args) => commands::execute_show(args, &config, &formatter)?,
        Command::Export(args) => commands::execute_export(args, &config, &formatter)?,
        Command::Suggestions => commands::execute_suggestions(&config, &formatter)?,
        Command::Rejected => commands::execute_rejected(&config, &formatter)?,
        Command::Sweep(args) => commands::execute_sweep(args, &config, &formatter)?,
    }

    Ok(())
}
