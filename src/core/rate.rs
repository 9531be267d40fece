//! Market rate abstractions and core types

use super::error::FetchError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Minutes elapsed for a millisecond age, rounded down.
pub fn age_minutes(age_ms: i64) -> i64 {
    age_ms.max(0) / 60_000
}

/// A market rate observed at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSnapshot {
    /// Fiat per BTC, always positive
    pub rate: f64,
    /// Epoch milliseconds of the observation
    pub timestamp: i64,
    pub source: String,
}

impl RateSnapshot {
    /// Milliseconds between the observation and `now_ms`.
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms - self.timestamp
    }
}

/// How the market rate handed to the caller was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateStatus {
    /// Freshly fetched from the provider.
    Online,
    /// Served from cache because it was still fresh.
    Cached,
    /// Served from cache because the fetch failed.
    CachedWithError { message: String },
}

impl RateStatus {
    /// Human readable status, e.g. `Cached (3 min ago) - HTTP 500`.
    pub fn describe(&self, age_ms: i64, source: &str) -> String {
        let minutes = age_minutes(age_ms);
        match self {
            RateStatus::Online => format!("Online ({source})"),
            RateStatus::Cached => format!("Cached ({minutes} min ago)"),
            RateStatus::CachedWithError { message } => {
                format!("Cached ({minutes} min ago) - {message}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarketRate {
    pub snapshot: RateSnapshot,
    pub status: RateStatus,
}

impl MarketRate {
    pub fn describe(&self, now_ms: i64) -> String {
        self.status
            .describe(self.snapshot.age_ms(now_ms), &self.snapshot.source)
    }
}

#[async_trait]
pub trait MarketRateProvider: Send + Sync {
    /// Label recorded as the snapshot source.
    fn name(&self) -> &str;

    async fn fetch_rate(&self) -> Result<RateSnapshot, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(timestamp: i64) -> RateSnapshot {
        RateSnapshot {
            rate: 250_000.0,
            timestamp,
            source: "CoinGecko".to_string(),
        }
    }

    #[test]
    fn test_describe_status() {
        let now = 1_700_000_000_000;
        let online = MarketRate {
            snapshot: snapshot(now),
            status: RateStatus::Online,
        };
        assert_eq!(online.describe(now), "Online (CoinGecko)");

        let cached = MarketRate {
            snapshot: snapshot(now - 185_000),
            status: RateStatus::Cached,
        };
        assert_eq!(cached.describe(now), "Cached (3 min ago)");

        let failed = MarketRate {
            snapshot: snapshot(now - 30_000),
            status: RateStatus::CachedWithError {
                message: "Rate limit reached".to_string(),
            },
        };
        assert_eq!(failed.describe(now), "Cached (0 min ago) - Rate limit reached");
    }

    #[test]
    fn test_snapshot_json_shape() {
        let json = serde_json::to_value(snapshot(42)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"rate": 250000.0, "timestamp": 42, "source": "CoinGecko"})
        );
    }
}
