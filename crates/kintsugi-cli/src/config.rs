//! Configuration loading for the CLI.
//!
//! The pipeline configuration lives in `kintsugi-scan`; this module only
//! decides where the file is and where a relative database path lands.

use crate::error::{CliError, Result};
use kintsugi_scan::KintsugiConfig;
use std::path::{Path, PathBuf};

/// Directory holding the config file and, by default, the database
pub fn kintsugi_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".kintsugi")
}

/// Default config file location: `~/.kintsugi/config.toml`
pub fn default_config_path() -> PathBuf {
    kintsugi_dir().join("config.toml")
}

/// Load the configuration, honoring `--config`
pub fn load_config(override_path: Option<&Path>) -> Result<KintsugiConfig> {
    let path = override_path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_path);
    if override_path.is_some() && !path.exists() {
        return Err(CliError::Config(format!(
            "config file not found: {}",
            path.display()
        )));
    }
    Ok(KintsugiConfig::load(&path)?)
}

/// Resolve the database path; relative paths land under `~/.kintsugi/`
pub fn resolve_db_path(config: &KintsugiConfig) -> PathBuf {
    if config.db_path.is_absolute() {
        config.db_path.clone()
    } else {
        kintsugi_dir().join(&config.db_path)
    }
}
