//! Entry point for the presentation layer. User intents come in as
//! [`Intent`] values and results go back out as [`Outcome`] values.

use super::calc::{self, Calculation};
use super::error::SessionError;
use super::fetcher::RateFetcher;
use super::history::{CalculationEntry, HistoryLog, HistoryStore};
use super::rate::{MarketRate, MarketRateProvider, RateSnapshot, age_minutes};
use chrono::Utc;
use tracing::{debug, instrument};

#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Calculate {
        gel: Option<f64>,
        office_rate: Option<f64>,
        /// Fetch a new market rate even if the cached one is fresh
        refresh: bool,
    },
    /// Market rate, served from cache while it is fresh
    Rate,
    Refresh,
    Save(Calculation),
    Delete(i64),
    /// Only dispatch after the user confirmed.
    ClearAll,
    History,
    Status,
}

/// Cached rate as known at start-up, without touching the network.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheStatus {
    Cached(RateSnapshot),
    Empty,
}

impl CacheStatus {
    pub fn describe(&self, now_ms: i64) -> String {
        match self {
            CacheStatus::Cached(snapshot) => {
                format!("Cached ({} min ago)", age_minutes(snapshot.age_ms(now_ms)))
            }
            CacheStatus::Empty => "No cached data".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Calculated(Calculation),
    Rate(MarketRate),
    Saved {
        entry: CalculationEntry,
        history: HistoryLog,
    },
    Deleted {
        removed: bool,
        history: HistoryLog,
    },
    Cleared,
    History(HistoryLog),
    Status(CacheStatus),
}

pub struct Session<P: MarketRateProvider> {
    fetcher: RateFetcher<P>,
    history: HistoryStore,
}

impl<P: MarketRateProvider> Session<P> {
    pub fn new(fetcher: RateFetcher<P>, history: HistoryStore) -> Self {
        Self { fetcher, history }
    }

    #[instrument(name = "SessionDispatch", skip(self))]
    pub async fn dispatch(&self, intent: Intent) -> Result<Outcome, SessionError> {
        match intent {
            Intent::Calculate {
                gel,
                office_rate,
                refresh,
            } => self
                .calculate(gel, office_rate, refresh)
                .await
                .map(Outcome::Calculated),
            Intent::Rate => Ok(Outcome::Rate(self.fetcher.get_market_rate(false).await?)),
            Intent::Refresh => Ok(Outcome::Rate(self.fetcher.get_market_rate(true).await?)),
            Intent::Save(calculation) => {
                let entry = self.history.append(calculation.to_entry())?;
                Ok(Outcome::Saved {
                    entry,
                    history: self.history.list(),
                })
            }
            Intent::Delete(id) => {
                let removed = self.history.delete(id)?;
                Ok(Outcome::Deleted {
                    removed,
                    history: self.history.list(),
                })
            }
            Intent::ClearAll => {
                self.history.clear()?;
                Ok(Outcome::Cleared)
            }
            Intent::History => Ok(Outcome::History(self.history.list())),
            Intent::Status => Ok(Outcome::Status(self.status())),
        }
    }

    pub async fn calculate(
        &self,
        gel: Option<f64>,
        office_rate: Option<f64>,
        refresh: bool,
    ) -> Result<Calculation, SessionError> {
        let (gel, office_rate) = calc::validate(gel, office_rate)?;
        let market = self.fetcher.get_market_rate(refresh).await?;
        let calculation = calc::calculate(gel, office_rate, &market, Utc::now());
        debug!(btc = calculation.btc_amount, spread = calculation.spread, "Calculated");
        Ok(calculation)
    }

    pub fn status(&self) -> CacheStatus {
        match self.fetcher.cache().load() {
            Some(snapshot) => CacheStatus::Cached(snapshot),
            None => CacheStatus::Empty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{FetchError, ValidationError};
    use crate::core::rate::RateStatus;
    use crate::core::rate_cache::RateCache;
    use crate::store::memory::MemoryStore;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedProvider {
        rate: Option<f64>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl<'a> MarketRateProvider for &'a FixedProvider {
        fn name(&self) -> &str {
            "Fixed"
        }

        async fn fetch_rate(&self) -> Result<RateSnapshot, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.rate
                .map(|rate| RateSnapshot {
                    rate,
                    timestamp: Utc::now().timestamp_millis(),
                    source: "Fixed".to_string(),
                })
                .ok_or_else(|| FetchError::Network("connection refused".to_string()))
        }
    }

    fn session(provider: &FixedProvider) -> Session<&FixedProvider> {
        let store = Arc::new(MemoryStore::new());
        let fetcher = RateFetcher::new(provider, RateCache::new(store.clone()));
        Session::new(fetcher, HistoryStore::new(store))
    }

    #[tokio::test]
    async fn test_calculate_then_save() {
        let provider = FixedProvider {
            rate: Some(250_000.0),
            calls: AtomicUsize::new(0),
        };
        let session = session(&provider);

        let Outcome::Calculated(calculation) = session
            .dispatch(Intent::Calculate {
                gel: Some(500.0),
                office_rate: Some(255_000.0),
                refresh: false,
            })
            .await
            .unwrap()
        else {
            panic!("Expected a calculation");
        };
        assert_eq!(calculation.market_rate, 250_000.0);
        assert_eq!(calculation.status, RateStatus::Online);
        assert_eq!(calculation.source, "Fixed");

        let Outcome::Saved { entry, history } =
            session.dispatch(Intent::Save(calculation)).await.unwrap()
        else {
            panic!("Expected a saved entry");
        };
        assert_eq!(history, vec![entry.clone()]);

        // A second calculation uses the now fresh cache
        session.calculate(Some(1.0), Some(1.0), false).await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        let Outcome::Deleted { removed, history } =
            session.dispatch(Intent::Delete(entry.id)).await.unwrap()
        else {
            panic!("Expected a delete outcome");
        };
        assert!(removed);
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_input_never_fetches() {
        let provider = FixedProvider {
            rate: Some(250_000.0),
            calls: AtomicUsize::new(0),
        };
        let session = session(&provider);

        let err = session
            .dispatch(Intent::Calculate {
                gel: Some(0.0),
                office_rate: Some(255_000.0),
                refresh: false,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Validation(ValidationError(_))));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_offline_without_cache() {
        let provider = FixedProvider {
            rate: None,
            calls: AtomicUsize::new(0),
        };
        let session = session(&provider);

        assert_eq!(
            session.dispatch(Intent::Status).await.unwrap(),
            Outcome::Status(CacheStatus::Empty)
        );
        let err = session.dispatch(Intent::Refresh).await.unwrap_err();
        assert!(matches!(err, SessionError::Network(_)));
    }

    #[tokio::test]
    async fn test_status_and_clear() {
        let provider = FixedProvider {
            rate: Some(10.0),
            calls: AtomicUsize::new(0),
        };
        let session = session(&provider);

        session.dispatch(Intent::Refresh).await.unwrap();
        let Outcome::Status(status) = session.dispatch(Intent::Status).await.unwrap() else {
            panic!("Expected a status");
        };
        assert_eq!(
            status.describe(Utc::now().timestamp_millis()),
            "Cached (0 min ago)"
        );

        let calculation = session.calculate(Some(5.0), Some(10.0), false).await.unwrap();
        session.dispatch(Intent::Save(calculation)).await.unwrap();
        assert_eq!(session.dispatch(Intent::ClearAll).await.unwrap(), Outcome::Cleared);
        assert_eq!(
            session.dispatch(Intent::History).await.unwrap(),
            Outcome::History(vec![])
        );
    }
}
