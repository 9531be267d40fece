pub mod disk;
pub mod memory;

use crate::core::config::AppConfig;
use crate::core::error::StoreError;
use crate::core::store::KeyValueStore;
use anyhow::{Context, Result};
use disk::DiskStore;
use memory::MemoryStore;
use std::sync::Arc;
use tracing::debug;

/// Rejects a write of `key`/`value` when it does not fit next to `used` bytes.
pub(crate) fn check_quota(
    key: &str,
    value: &str,
    used: usize,
    quota: usize,
) -> Result<(), StoreError> {
    let needed = key.len() + value.len();
    let available = quota.saturating_sub(used);
    if needed > available {
        return Err(StoreError::QuotaExceeded {
            key: key.to_string(),
            needed,
            available,
        });
    }
    Ok(())
}

/// Opens the store described by the configuration.
pub fn open_store(config: &AppConfig) -> Result<Arc<dyn KeyValueStore>> {
    let quota = config.storage.quota_bytes;
    if !config.storage.persist {
        debug!("Persistence disabled, using memory store");
        return Ok(Arc::new(match quota {
            Some(q) => MemoryStore::with_quota(q),
            None => MemoryStore::new(),
        }));
    }

    let path = config.default_data_path()?.join("store");
    let store = DiskStore::open(&path, quota)
        .with_context(|| format!("Failed to open store at {}", path.display()))?;
    Ok(Arc::new(store))
}
