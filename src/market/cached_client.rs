//! Cached market client that wraps CoinGeckoClient with stale-tolerant caching.

use chrono::{DateTime, Utc};
use color_eyre::Result;

use crate::cache::{CacheError, CacheResult, CacheSource, StaleTolerantCache};
use crate::config::Config;

use super::api_types::{GlobalMarket, PriceTable, TrendingCoins};
use super::client::CoinGeckoClient;
use super::mock;
use super::types::{MarketSnapshot, PricesQuery};

/// Number of trending coins included in a snapshot
const SNAPSHOT_TRENDING: usize = 5;

/// Market data client with transparent caching support.
///
/// Each resource kind has its own cache instance with its own timing, so a
/// throttled prices lookup never affects trending or global lookups.
#[derive(Clone)]
pub struct CachedMarketClient {
  inner: CoinGeckoClient,
  prices: StaleTolerantCache<PriceTable>,
  trending: StaleTolerantCache<TrendingCoins>,
  global: StaleTolerantCache<GlobalMarket>,
  default_prices: PricesQuery,
}

impl CachedMarketClient {
  /// Create a new cached market client.
  pub fn new(config: &Config) -> Result<Self> {
    let inner = CoinGeckoClient::new(&config.upstream)?;
    Ok(Self::with_client(inner, config))
  }

  pub fn with_client(inner: CoinGeckoClient, config: &Config) -> Self {
    Self {
      inner,
      prices: StaleTolerantCache::new("prices", config.cache.prices.to_policy(), mock::prices()),
      trending: StaleTolerantCache::new(
        "trending",
        config.cache.trending.to_policy(),
        mock::trending(),
      ),
      global: StaleTolerantCache::new("global", config.cache.global.to_policy(), mock::global()),
      default_prices: PricesQuery {
        ids: config.prices.default_ids.clone(),
        vs_currencies: config.prices.default_vs_currencies.clone(),
      },
    }
  }

  pub fn default_prices_query(&self) -> &PricesQuery {
    &self.default_prices
  }

  /// Get prices for the given coins.
  ///
  /// There is a single prices entry regardless of the query, so a fresh
  /// entry fetched for one set of ids also answers a request for another.
  pub async fn prices(
    &self,
    query: &PricesQuery,
    now: DateTime<Utc>,
  ) -> Result<CacheResult<PriceTable>, CacheError> {
    self
      .prices
      .get(now, || {
        let inner = self.inner.clone();
        let query = query.clone();
        async move { inner.simple_price(&query).await }
      })
      .await
  }

  /// Get trending coins.
  pub async fn trending(&self, now: DateTime<Utc>) -> Result<CacheResult<TrendingCoins>, CacheError> {
    self
      .trending
      .get(now, || {
        let inner = self.inner.clone();
        async move { inner.trending().await }
      })
      .await
  }

  /// Get global market statistics.
  pub async fn global(&self, now: DateTime<Utc>) -> Result<CacheResult<GlobalMarket>, CacheError> {
    self
      .global
      .get(now, || {
        let inner = self.inner.clone();
        async move { inner.global().await }
      })
      .await
  }

  /// Gather prices for the default coins, the top trending coins and the
  /// global stats in one go.
  ///
  /// The prices entry is shared by every query, so it is narrowed to the
  /// default ids before being returned.
  pub async fn snapshot(&self, now: DateTime<Utc>) -> MarketSnapshot {
    let (prices, trending, global) = futures::join!(
      self.prices(&self.default_prices, now),
      self.trending(now),
      self.global(now)
    );

    let sources = [
      source_of(&prices),
      source_of(&trending),
      source_of(&global),
    ];
    let mock = sources
      .iter()
      .any(|s| matches!(s, Some(CacheSource::Mock(_))));
    let degraded = sources.iter().any(|s| {
      !matches!(
        s,
        Some(CacheSource::Network) | Some(CacheSource::CacheFresh)
      )
    });

    MarketSnapshot {
      prices: prices
        .ok()
        .map(|r| r.data.only(&self.default_prices.ids)),
      trending: trending
        .map(|r| r.data.top(SNAPSHOT_TRENDING))
        .unwrap_or_default(),
      global: global.ok().map(|r| r.data),
      degraded,
      mock,
    }
  }
}

fn source_of<T>(result: &Result<CacheResult<T>, CacheError>) -> Option<CacheSource> {
  result.as_ref().ok().map(|r| r.source)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::Degradation;
  use crate::config::UpstreamConfig;
  use chrono::{Duration, TimeZone};
  use wiremock::matchers::path;
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
  }

  fn market(server: &MockServer) -> CachedMarketClient {
    let mut config = Config::default();
    config.upstream = UpstreamConfig {
      base_url: format!("{}/api/v3", server.uri()),
      ..UpstreamConfig::default()
    };
    let inner = CoinGeckoClient::with_api_key(&config.upstream, None).unwrap();
    CachedMarketClient::with_client(inner, &config)
  }

  fn trending_body() -> serde_json::Value {
    let coins: Vec<_> = (1..=7)
      .map(|i| {
        serde_json::json!({ "item": {
          "id": format!("coin-{i}"), "name": format!("Coin {i}"),
          "symbol": format!("C{i}"), "market_cap_rank": i, "thumb": ""
        }})
      })
      .collect();
    serde_json::json!({ "coins": coins })
  }

  #[tokio::test]
  async fn test_prices_cached_within_fresh_window() {
    let server = MockServer::start().await;
    Mock::given(path("/api/v3/simple/price"))
      .respond_with(
        ResponseTemplate::new(200)
          .set_body_json(serde_json::json!({ "bitcoin": { "usd": 1.0 } })),
      )
      .expect(1)
      .mount(&server)
      .await;

    let market = market(&server);
    let query = market.default_prices_query().clone();

    let first = market.prices(&query, at(0)).await.unwrap();
    let second = market.prices(&query, at(30)).await.unwrap();

    assert_eq!(first.source, CacheSource::Network);
    assert_eq!(second.source, CacheSource::CacheFresh);
    assert_eq!(first.data, second.data);
  }

  #[tokio::test]
  async fn test_upstream_outage_falls_back_to_mock() {
    let server = MockServer::start().await;
    Mock::given(path("/api/v3/global"))
      .respond_with(ResponseTemplate::new(500))
      .mount(&server)
      .await;

    let market = market(&server);
    let result = market.global(at(0)).await.unwrap();

    assert_eq!(result.data, mock::global());
    assert_eq!(result.source, CacheSource::Mock(Degradation::UpstreamUnavailable));

    // Global stats wait 20s between attempts
    let throttled = market.global(at(19)).await.unwrap_err();
    assert_eq!(
      throttled,
      CacheError::RateLimited {
        resource: "global",
        retry_after: Duration::seconds(1),
      }
    );
  }

  #[tokio::test]
  async fn test_resources_are_throttled_independently() {
    let server = MockServer::start().await;
    Mock::given(path("/api/v3/search/trending"))
      .respond_with(ResponseTemplate::new(429))
      .mount(&server)
      .await;
    Mock::given(path("/api/v3/global"))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "data": { "markets": 1 }
      })))
      .mount(&server)
      .await;

    let market = market(&server);
    let trending = market.trending(at(0)).await.unwrap();
    let global = market.global(at(0)).await.unwrap();

    assert_eq!(
      trending.source,
      CacheSource::Mock(Degradation::UpstreamRateLimited)
    );
    assert_eq!(global.source, CacheSource::Network);
    assert_eq!(global.data.markets, 1);
  }

  #[tokio::test]
  async fn test_snapshot_combines_resources() {
    let server = MockServer::start().await;
    Mock::given(path("/api/v3/simple/price"))
      .respond_with(
        ResponseTemplate::new(200)
          .set_body_json(serde_json::json!({ "bitcoin": { "usd": 2.0, "usd_24h_change": 0.1 } })),
      )
      .mount(&server)
      .await;
    Mock::given(path("/api/v3/search/trending"))
      .respond_with(ResponseTemplate::new(200).set_body_json(trending_body()))
      .mount(&server)
      .await;
    Mock::given(path("/api/v3/global"))
      .respond_with(ResponseTemplate::new(503))
      .mount(&server)
      .await;

    let snapshot = market(&server).snapshot(at(0)).await;

    assert_eq!(snapshot.prices.unwrap().figure("bitcoin", "usd"), Some(2.0));
    assert_eq!(snapshot.trending.len(), SNAPSHOT_TRENDING);
    assert_eq!(snapshot.trending[0].item.id, "coin-1");
    assert_eq!(snapshot.global, Some(mock::global()));
    assert!(snapshot.mock);
    assert!(snapshot.degraded);
  }

  #[tokio::test]
  async fn test_snapshot_narrows_prices_to_default_ids() {
    let server = MockServer::start().await;
    Mock::given(path("/api/v3/simple/price"))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "shiba-inu": { "usd": 0.1 },
        "bitcoin": { "usd": 3.0 }
      })))
      .mount(&server)
      .await;
    Mock::given(path("/api/v3/search/trending"))
      .respond_with(ResponseTemplate::new(200).set_body_json(trending_body()))
      .mount(&server)
      .await;
    Mock::given(path("/api/v3/global"))
      .respond_with(ResponseTemplate::new(503))
      .mount(&server)
      .await;

    let market = market(&server);
    let custom = PricesQuery::from_params(Some("shiba-inu,bitcoin"), None, market.default_prices_query());
    market.prices(&custom, at(0)).await.unwrap();

    // The entry left by the custom query is still fresh
    let snapshot = market.snapshot(at(1)).await;
    let prices = snapshot.prices.unwrap();
    assert_eq!(prices.figure("shiba-inu", "usd"), None);
    assert_eq!(prices.figure("bitcoin", "usd"), Some(3.0));
  }

  #[tokio::test]
  async fn test_snapshot_omits_throttled_sections() {
    let server = MockServer::start().await;
    Mock::given(wiremock::matchers::any())
      .respond_with(ResponseTemplate::new(500))
      .mount(&server)
      .await;

    let market = market(&server);
    market.snapshot(at(0)).await;

    // Every cache is empty and inside its request interval
    let snapshot = market.snapshot(at(1)).await;
    assert!(snapshot.prices.is_none());
    assert!(snapshot.trending.is_empty());
    assert!(snapshot.global.is_none());
    assert!(snapshot.degraded);
    assert!(!snapshot.mock);
  }
}
