//! Persistence abstraction shared by the rate cache and the history log.

use super::error::StoreError;
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

/// Key under which the last fetched market rate is kept.
pub const KEY_LAST_RATE: &str = "cc-lastRate";
/// Key under which the calculation history is kept.
pub const KEY_HISTORY: &str = "cc-history";

/// A string key-value store. Writes may be refused with
/// [`StoreError::QuotaExceeded`] when the store is full.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Reads and decodes a JSON value. Any failure is reported as `None`.
pub fn get_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            debug!(key, error = %e, "Store read failed");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(key, error = %e, "Discarding malformed stored value");
            None
        }
    }
}

pub fn set_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let raw = serde_json::to_string(value).map_err(|e| StoreError::Serialization {
        key: key.to_string(),
        message: e.to_string(),
    })?;
    store.set(key, &raw)
}
