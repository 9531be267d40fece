use super::error::{PersistenceError, StoreError};
use super::store::{KEY_HISTORY, KeyValueStore, get_json, set_json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

pub const DEFAULT_MAX_ENTRIES: usize = 50;
pub const DEFAULT_RECOVERY_KEEP: usize = 10;

/// A saved calculation. Field names match the stored JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationEntry {
    pub id: i64,
    pub date: String,
    pub gel: f64,
    pub office_rate: f64,
    pub market_rate: f64,
    pub btc_amount: f64,
    pub spread: f64,
    pub source: String,
}

/// Saved calculations, newest first.
pub type HistoryLog = Vec<CalculationEntry>;

/// Bounded calculation history kept in the key-value store.
#[derive(Clone)]
pub struct HistoryStore {
    store: Arc<dyn KeyValueStore>,
    max_entries: usize,
    recovery_keep: usize,
}

fn persistence(source: StoreError) -> PersistenceError {
    PersistenceError {
        what: "history",
        source,
    }
}

impl HistoryStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_limits(store, DEFAULT_MAX_ENTRIES, DEFAULT_RECOVERY_KEEP)
    }

    pub fn with_limits(store: Arc<dyn KeyValueStore>, max_entries: usize, recovery_keep: usize) -> Self {
        Self {
            store,
            max_entries: max_entries.max(1),
            recovery_keep: recovery_keep.min(max_entries),
        }
    }

    /// Returns the saved entries. Unreadable history reads as empty.
    pub fn list(&self) -> HistoryLog {
        get_json(self.store.as_ref(), KEY_HISTORY).unwrap_or_default()
    }

    /// Saves `entry` at the front of the log and returns it as stored.
    pub fn append(&self, mut entry: CalculationEntry) -> Result<CalculationEntry, PersistenceError> {
        let mut history = self.list();
        if let Some(front) = history.first() {
            if entry.id <= front.id {
                entry.id = front.id + 1;
            }
        }

        match self.write_with(&history, &entry) {
            Ok(()) => {}
            Err(e) if e.is_quota_exceeded() => {
                warn!(
                    error = %e,
                    keep = self.recovery_keep,
                    "History storage full, trimming old entries"
                );
                history.truncate(self.recovery_keep);
                set_json(self.store.as_ref(), KEY_HISTORY, &history).map_err(persistence)?;
                self.write_with(&history, &entry).map_err(persistence)?;
            }
            Err(e) => return Err(persistence(e)),
        }
        debug!(id = entry.id, "Saved calculation to history");
        Ok(entry)
    }

    fn write_with(&self, history: &[CalculationEntry], entry: &CalculationEntry) -> Result<(), StoreError> {
        let mut updated = Vec::with_capacity(history.len() + 1);
        updated.push(entry.clone());
        updated.extend(history.iter().take(self.max_entries - 1).cloned());
        set_json(self.store.as_ref(), KEY_HISTORY, &updated)
    }

    /// Trims the log down to the entries kept on quota recovery, freeing
    /// space for other keys. Returns whether anything was removed.
    pub fn make_room(&self) -> Result<bool, PersistenceError> {
        let mut history = self.list();
        if history.len() <= self.recovery_keep {
            return Ok(false);
        }
        let removed = history.len() - self.recovery_keep;
        history.truncate(self.recovery_keep);
        set_json(self.store.as_ref(), KEY_HISTORY, &history).map_err(persistence)?;
        warn!(removed, keep = self.recovery_keep, "Trimmed history to free storage");
        Ok(true)
    }

    /// Removes the entry with `id`. Returns whether anything was removed.
    pub fn delete(&self, id: i64) -> Result<bool, PersistenceError> {
        let mut history = self.list();
        let before = history.len();
        history.retain(|entry| entry.id != id);
        if history.len() == before {
            debug!(id, "No history entry to delete");
            return Ok(false);
        }
        set_json(self.store.as_ref(), KEY_HISTORY, &history).map_err(persistence)?;
        debug!(id, "Deleted history entry");
        Ok(true)
    }

    /// Removes every entry. Callers are expected to have confirmed this.
    pub fn clear(&self) -> Result<(), PersistenceError> {
        self.store.remove(KEY_HISTORY).map_err(persistence)?;
        debug!("Cleared history");
        Ok(())
    }
}
