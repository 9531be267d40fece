use super::check_quota;
use crate::core::error::StoreError;
use crate::core::store::KeyValueStore;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// In-memory store used when persistence is disabled and in tests.
pub struct MemoryStore {
    inner: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    /// Creates an unbounded store
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            quota_bytes: None,
        }
    }

    /// Creates a store refusing writes once keys and values exceed `quota_bytes`
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self.entries().get(key).cloned();
        debug!(key, hit = value.is_some(), "Memory store GET");
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries();
        if let Some(quota) = self.quota_bytes {
            let used: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            check_quota(key, value, used, quota)?;
        }
        entries.insert(key.to_string(), value.to_string());
        debug!(key, bytes = value.len(), "Memory store SET");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries().remove(key);
        debug!(key, "Memory store REMOVE");
        Ok(())
    }
}
