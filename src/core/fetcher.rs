use super::error::{FetchError, NetworkError};
use super::history::HistoryStore;
use super::rate::{MarketRate, MarketRateProvider, RateSnapshot, RateStatus};
use super::rate_cache::RateCache;
use chrono::Utc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Produces the current market rate from the provider, falling back to the
/// cached rate when the provider cannot be reached.
pub struct RateFetcher<P: MarketRateProvider> {
    provider: P,
    cache: RateCache,
    timeout: Duration,
    history: Option<HistoryStore>,
}

impl<P: MarketRateProvider> RateFetcher<P> {
    pub fn new(provider: P, cache: RateCache) -> Self {
        Self::with_timeout(provider, cache, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(provider: P, cache: RateCache, timeout: Duration) -> Self {
        Self {
            provider,
            cache,
            timeout,
            history: None,
        }
    }

    /// Lets a full store give up old history entries so the rate can
    /// still be cached for offline use.
    pub fn with_history(mut self, history: HistoryStore) -> Self {
        self.history = Some(history);
        self
    }

    pub fn cache(&self) -> &RateCache {
        &self.cache
    }

    pub async fn get_market_rate(&self, force_refresh: bool) -> Result<MarketRate, NetworkError> {
        let cached = self.cache.load();

        if !force_refresh {
            if let Some(snapshot) = &cached {
                if !self.cache.is_stale(snapshot, Utc::now().timestamp_millis()) {
                    debug!(rate = snapshot.rate, "Using fresh cached rate");
                    return Ok(MarketRate {
                        snapshot: snapshot.clone(),
                        status: RateStatus::Cached,
                    });
                }
            }
        }

        match self.fetch().await {
            Ok(snapshot) => {
                self.cache_rate(&snapshot);
                info!(rate = snapshot.rate, source = %snapshot.source, "Fetched market rate");
                Ok(MarketRate {
                    snapshot,
                    status: RateStatus::Online,
                })
            }
            Err(cause) => match cached {
                Some(snapshot) => {
                    warn!(error = %cause, "Fetch failed, falling back to cached rate");
                    Ok(MarketRate {
                        snapshot,
                        status: RateStatus::CachedWithError {
                            message: cause.to_string(),
                        },
                    })
                }
                None => {
                    warn!(error = %cause, "Fetch failed and no rate is cached");
                    Err(NetworkError { cause })
                }
            },
        }
    }

    // Failures are logged and the fetched rate is returned regardless.
    fn cache_rate(&self, snapshot: &RateSnapshot) {
        let Err(e) = self.cache.store(snapshot) else {
            return;
        };
        if e.source.is_quota_exceeded() {
            if let Some(history) = &self.history {
                match history.make_room() {
                    Ok(true) => match self.cache.store(snapshot) {
                        Ok(()) => return,
                        Err(e) => warn!(error = %e, "Could not cache fetched rate after trimming history"),
                    },
                    Ok(false) => warn!(error = %e, "Could not cache fetched rate, history already trimmed"),
                    Err(trim) => warn!(error = %trim, "Could not trim history to cache fetched rate"),
                }
                return;
            }
        }
        warn!(error = %e, "Could not cache fetched rate");
    }

    // Dropping the provider future at the deadline aborts the request.
    async fn fetch(&self) -> Result<RateSnapshot, FetchError> {
        debug!(provider = self.provider.name(), timeout = ?self.timeout, "Fetching market rate");
        tokio::time::timeout(self.timeout, self.provider.fetch_rate())
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))?
    }
}
