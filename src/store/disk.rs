use super::check_quota;
use crate::core::error::StoreError;
use crate::core::store::KeyValueStore;
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::path::Path;
use tracing::debug;

const PARTITION: &str = "kv";

fn backend(e: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(e.to_string())
}

/// Persistent store backed by a fjall keyspace.
pub struct DiskStore {
    keyspace: Keyspace,
    partition: PartitionHandle,
    quota_bytes: Option<usize>,
}

impl DiskStore {
    pub fn open(path: &Path, quota_bytes: Option<usize>) -> Result<Self, StoreError> {
        std::fs::create_dir_all(path).map_err(backend)?;

        let keyspace = Config::new(path.join("fjall_db")).open().map_err(backend)?;
        let partition = keyspace
            .open_partition(PARTITION, PartitionCreateOptions::default())
            .map_err(backend)?;
        debug!(path = %path.display(), "Opened disk store");
        Ok(Self {
            keyspace,
            partition,
            quota_bytes,
        })
    }

    fn used_bytes_except(&self, key: &str) -> Result<usize, StoreError> {
        let mut used = 0;
        for item in self.partition.iter() {
            let (k, v) = item.map_err(backend)?;
            if &*k != key.as_bytes() {
                used += k.len() + v.len();
            }
        }
        Ok(used)
    }
}

impl KeyValueStore for DiskStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let Some(raw) = self.partition.get(key).map_err(backend)? else {
            debug!(key, "Disk store MISS");
            return Ok(None);
        };
        debug!(key, "Disk store HIT");
        String::from_utf8(raw.to_vec()).map(Some).map_err(backend)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if let Some(quota) = self.quota_bytes {
            check_quota(key, value, self.used_bytes_except(key)?, quota)?;
        }
        self.partition.insert(key, value).map_err(backend)?;
        self.keyspace.persist(PersistMode::SyncAll).map_err(backend)?;
        debug!(key, bytes = value.len(), "Disk store SET");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.partition.remove(key).map_err(backend)?;
        self.keyspace.persist(PersistMode::SyncAll).map_err(backend)?;
        debug!(key, "Disk store REMOVE");
        Ok(())
    }
}
