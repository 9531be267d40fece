use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::core::config::ProviderConfig;
use crate::core::error::FetchError;
use crate::core::rate::{MarketRateProvider, RateSnapshot};

/// Fetches the BTC price from the CoinGecko simple price endpoint.
pub struct CoinGeckoProvider {
    name: String,
    base_url: String,
    coin: String,
    vs_currency: String,
    client: reqwest::Client,
}

impl CoinGeckoProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("satcalc/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(CoinGeckoProvider {
            name: config.name.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            coin: config.coin.to_lowercase(),
            vs_currency: config.vs_currency.to_lowercase(),
            client,
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/api/v3/simple/price?ids={}&vs_currencies={}",
            self.base_url, self.coin, self.vs_currency
        )
    }

    // Response shape: {"bitcoin": {"gel": 271234.5}}
    fn extract_rate(&self, body: &str) -> Result<f64, FetchError> {
        let data: Value = serde_json::from_str(body)
            .map_err(|e| FetchError::InvalidData(format!("Failed to parse JSON response: {e}")))?;
        let rate = data
            .get(&self.coin)
            .and_then(|prices| prices.get(&self.vs_currency))
            .and_then(Value::as_f64)
            .ok_or_else(|| {
                FetchError::InvalidData(format!(
                    "No {} price found for {}",
                    self.vs_currency, self.coin
                ))
            })?;
        if !(rate.is_finite() && rate > 0.0) {
            return Err(FetchError::InvalidData(format!("Non-positive rate: {rate}")));
        }
        Ok(rate)
    }
}

#[async_trait]
impl MarketRateProvider for CoinGeckoProvider {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "CoinGeckoRateFetch",
        skip(self),
        fields(coin = %self.coin, vs = %self.vs_currency)
    )]
    async fn fetch_rate(&self) -> Result<RateSnapshot, FetchError> {
        let url = self.url();
        debug!("Requesting rate from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        debug!(%status, "Received CoinGecko response");
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimit);
        }
        if !status.is_success() {
            return Err(FetchError::Http(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        let rate = self.extract_rate(&body)?;

        Ok(RateSnapshot {
            rate,
            timestamp: Utc::now().timestamp_millis(),
            source: self.name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_server(response: ResponseTemplate) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v3/simple/price"))
            .and(query_param("ids", "bitcoin"))
            .and(query_param("vs_currencies", "gel"))
            .respond_with(response)
            .mount(&mock_server)
            .await;

        mock_server
    }

    fn provider(mock_server: &MockServer) -> CoinGeckoProvider {
        let config = ProviderConfig {
            base_url: mock_server.uri(),
            ..ProviderConfig::default()
        };
        CoinGeckoProvider::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_successful_rate_fetch() {
        let mock_server = create_mock_server(
            ResponseTemplate::new(200).set_body_string(r#"{"bitcoin": {"gel": 271234.5}}"#),
        )
        .await;

        let before = Utc::now().timestamp_millis();
        let snapshot = provider(&mock_server).fetch_rate().await.unwrap();
        assert_eq!(snapshot.rate, 271234.5);
        assert_eq!(snapshot.source, "CoinGecko");
        assert!(snapshot.timestamp >= before);
    }

    #[tokio::test]
    async fn test_integer_rate_is_accepted() {
        let mock_server = create_mock_server(
            ResponseTemplate::new(200).set_body_string(r#"{"bitcoin": {"gel": 270000}}"#),
        )
        .await;

        let snapshot = provider(&mock_server).fetch_rate().await.unwrap();
        assert_eq!(snapshot.rate, 270000.0);
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let mock_server = create_mock_server(ResponseTemplate::new(429)).await;
        let result = provider(&mock_server).fetch_rate().await;
        assert_eq!(result.unwrap_err(), FetchError::RateLimit);
    }

    #[tokio::test]
    async fn test_server_error() {
        let mock_server = create_mock_server(ResponseTemplate::new(500)).await;
        let result = provider(&mock_server).fetch_rate().await;
        assert_eq!(result.unwrap_err(), FetchError::Http(500));
    }

    #[tokio::test]
    async fn test_invalid_rate_data() {
        for body in [
            r#"{"bitcoin": {}}"#,
            r#"{"bitcoin": {"gel": 0}}"#,
            r#"{"bitcoin": {"gel": -12.5}}"#,
            r#"{"bitcoin": {"gel": "270000"}}"#,
            r#"{"ethereum": {"gel": 9000}}"#,
            "<html>maintenance</html>",
        ] {
            let mock_server =
                create_mock_server(ResponseTemplate::new(200).set_body_string(body)).await;
            let result = provider(&mock_server).fetch_rate().await;
            assert!(
                matches!(result, Err(FetchError::InvalidData(_))),
                "body {body} gave {result:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_slow_response_is_cut_off_by_fetcher() {
        use crate::core::fetcher::RateFetcher;
        use crate::core::rate_cache::RateCache;
        use crate::store::memory::MemoryStore;
        use std::sync::Arc;

        let mock_server = create_mock_server(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"bitcoin": {"gel": 1.0}}"#)
                .set_delay(Duration::from_secs(3)),
        )
        .await;

        let fetcher = RateFetcher::with_timeout(
            provider(&mock_server),
            RateCache::new(Arc::new(MemoryStore::new())),
            Duration::from_millis(200),
        );
        let err = fetcher.get_market_rate(true).await.unwrap_err();
        assert_eq!(err.cause, FetchError::Timeout(Duration::from_millis(200)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        let config = ProviderConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            ..ProviderConfig::default()
        };
        let result = CoinGeckoProvider::new(&config).unwrap().fetch_rate().await;
        assert!(matches!(result, Err(FetchError::Network(_))));
    }
}
