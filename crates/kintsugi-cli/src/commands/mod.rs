//! Command implementations.

mod export;
mod list;
mod rejected;
mod scan;
mod show;
mod suggestions;
mod sweep;

pub use export::execute_export;
pub use list::execute_list;
pub use rejected::execute_rejected;
pub use scan::execute_scan;
pub use show::execute_show;
pub use suggestions::execute_suggestions;
pub use sweep::execute_sweep;

use crate::config::resolve_db_path;
use crate::error::Result;
use kintsugi_scan::KintsugiConfig;
use kintsugi_store::SqliteStore;

/// Open the store at the configured location, creating the directory on
/// first use
pub fn open_store(config: &KintsugiConfig) -> Result<SqliteStore> {
    let path = resolve_db_path(config);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(SqliteStore::open(path)?)
}

/// Current wall clock as epoch milliseconds
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
