//! CLI command implementations.

pub mod fs;
pub mod kv;
pub mod record;

use nvstore_core::{NvStore, RecordStore, StorageManager};
use tracing::info;

/// Initialises the manager and returns its record backend.
pub(crate) fn record_store(
    manager: &StorageManager,
) -> Result<&RecordStore, Box<dyn std::error::Error>> {
    let store = manager
        .records()
        .ok_or("this command needs the record backend (--root)")?;
    manager.init()?;
    info!(root = %store.volume().root().display(), "volume mounted");
    Ok(store)
}
