use super::error::PersistenceError;
use super::rate::RateSnapshot;
use super::store::{KEY_LAST_RATE, KeyValueStore, get_json, set_json};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_FRESHNESS: Duration = Duration::from_secs(120);

// Stored form before validation; older or hand-edited values may lack fields.
#[derive(Deserialize)]
struct StoredRate {
    rate: Option<f64>,
    timestamp: Option<i64>,
    source: Option<String>,
}

/// Holds the last known market rate in the key-value store.
#[derive(Clone)]
pub struct RateCache {
    store: Arc<dyn KeyValueStore>,
    freshness: Duration,
}

impl RateCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_freshness(store, DEFAULT_FRESHNESS)
    }

    pub fn with_freshness(store: Arc<dyn KeyValueStore>, freshness: Duration) -> Self {
        Self { store, freshness }
    }

    /// Returns the cached snapshot, or `None` when nothing valid is stored.
    pub fn load(&self) -> Option<RateSnapshot> {
        let stored: StoredRate = get_json(self.store.as_ref(), KEY_LAST_RATE)?;
        let (Some(rate), Some(timestamp)) = (stored.rate, stored.timestamp) else {
            debug!("Cached rate is missing fields");
            return None;
        };
        if !(rate.is_finite() && rate > 0.0) || timestamp <= 0 {
            debug!(rate, timestamp, "Cached rate failed validation");
            return None;
        }
        Some(RateSnapshot {
            rate,
            timestamp,
            source: stored.source.unwrap_or_default(),
        })
    }

    pub fn store(&self, snapshot: &RateSnapshot) -> Result<(), PersistenceError> {
        set_json(self.store.as_ref(), KEY_LAST_RATE, snapshot).map_err(|source| {
            PersistenceError {
                what: "rate cache",
                source,
            }
        })?;
        debug!(rate = snapshot.rate, "Cached market rate");
        Ok(())
    }

    /// A snapshot dated in the future is treated as stale.
    pub fn is_stale(&self, snapshot: &RateSnapshot, now_ms: i64) -> bool {
        let age = snapshot.age_ms(now_ms);
        age < 0 || age > self.freshness.as_millis() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    const NOW: i64 = 1_700_000_000_000;

    fn cache() -> (Arc<MemoryStore>, RateCache) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), RateCache::new(store))
    }

    fn snapshot(timestamp: i64) -> RateSnapshot {
        RateSnapshot {
            rate: 270_000.5,
            timestamp,
            source: "CoinGecko".to_string(),
        }
    }

    #[test]
    fn test_store_then_load() {
        let (_, cache) = cache();
        assert!(cache.load().is_none());

        cache.store(&snapshot(NOW)).unwrap();
        assert_eq!(cache.load(), Some(snapshot(NOW)));

        // A second store replaces the first
        cache.store(&snapshot(NOW + 1)).unwrap();
        assert_eq!(cache.load().unwrap().timestamp, NOW + 1);
    }

    #[test]
    fn test_load_rejects_bad_values() {
        let (store, cache) = cache();
        for raw in [
            "garbage",
            r#"{"timestamp": 1700000000000, "source": "x"}"#,
            r#"{"rate": 100.0, "source": "x"}"#,
            r#"{"rate": 0, "timestamp": 1700000000000}"#,
            r#"{"rate": -3.5, "timestamp": 1700000000000}"#,
            r#"{"rate": "100", "timestamp": 1700000000000}"#,
            "[]",
        ] {
            store.set(KEY_LAST_RATE, raw).unwrap();
            assert!(cache.load().is_none(), "accepted {raw}");
        }
    }

    #[test]
    fn test_load_without_source() {
        let (store, cache) = cache();
        store
            .set(KEY_LAST_RATE, r#"{"rate": 5.0, "timestamp": 1700000000000}"#)
            .unwrap();
        let loaded = cache.load().unwrap();
        assert_eq!(loaded.rate, 5.0);
        assert_eq!(loaded.source, "");
    }

    #[test]
    fn test_staleness_window() {
        let (_, cache) = cache();
        assert!(!cache.is_stale(&snapshot(NOW - 60_000), NOW));
        assert!(!cache.is_stale(&snapshot(NOW - 120_000), NOW));
        assert!(cache.is_stale(&snapshot(NOW - 121_000), NOW));
        assert!(!cache.is_stale(&snapshot(NOW), NOW));
    }

    #[test]
    fn test_future_timestamp_is_stale() {
        let (_, cache) = cache();
        assert!(cache.is_stale(&snapshot(NOW + 1), NOW));
        assert!(cache.is_stale(&snapshot(NOW + 86_400_000), NOW));
    }

    #[test]
    fn test_store_reports_quota() {
        let store = Arc::new(MemoryStore::with_quota(8));
        let cache = RateCache::new(store);
        let err = cache.store(&snapshot(NOW)).unwrap_err();
        assert!(err.source.is_quota_exceeded());
        assert!(cache.load().is_none());
    }
}
