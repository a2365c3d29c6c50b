//! Built-in source adapters

mod recents;
mod tmp_scan;

pub use recents::RecentsAdapter;
pub use tmp_scan::{TempScanAdapter, DEFAULT_BYTE_BUDGET};
