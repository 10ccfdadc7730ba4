use crate::cache::FetchError;
use crate::config::{Config, UpstreamConfig};
use crate::market::api_types::{GlobalMarket, GlobalResponse, PriceTable, TrendingCoins};
use crate::market::types::PricesQuery;
use color_eyre::{eyre::eyre, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// CoinGecko API client wrapper
#[derive(Clone)]
pub struct CoinGeckoClient {
  http: reqwest::Client,
  base_url: Url,
}

impl CoinGeckoClient {
  pub fn new(config: &UpstreamConfig) -> Result<Self> {
    Self::with_api_key(config, Config::coingecko_api_key())
  }

  pub fn with_api_key(config: &UpstreamConfig, api_key: Option<String>) -> Result<Self> {
    // Url::join replaces the last segment unless the base ends with a slash
    let mut base = config.base_url.trim().to_string();
    if !base.ends_with('/') {
      base.push('/');
    }
    let base_url =
      Url::parse(&base).map_err(|e| eyre!("Invalid upstream URL {}: {}", config.base_url, e))?;

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    if let Some(key) = api_key {
      let value =
        HeaderValue::from_str(&key).map_err(|e| eyre!("Invalid CoinGecko API key: {}", e))?;
      headers.insert("x-cg-demo-api-key", value);
    }

    let http = reqwest::Client::builder()
      .user_agent(config.user_agent.clone())
      .default_headers(headers)
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { http, base_url })
  }

  /// Current prices with 24h change, market cap and volume
  pub async fn simple_price(&self, query: &PricesQuery) -> Result<PriceTable, FetchError> {
    let ids = query.ids_param();
    let vs_currencies = query.vs_currencies_param();
    self
      .get_json(
        "simple/price",
        &[
          ("ids", ids.as_str()),
          ("vs_currencies", vs_currencies.as_str()),
          ("include_24hr_change", "true"),
          ("include_market_cap", "true"),
          ("include_24hr_vol", "true"),
        ],
      )
      .await
  }

  /// Trending search coins
  pub async fn trending(&self) -> Result<TrendingCoins, FetchError> {
    self.get_json("search/trending", &[]).await
  }

  /// Global market statistics
  pub async fn global(&self) -> Result<GlobalMarket, FetchError> {
    let response: GlobalResponse = self.get_json("global", &[]).await?;
    Ok(response.data)
  }

  async fn get_json<T: DeserializeOwned>(
    &self,
    path: &str,
    query: &[(&str, &str)],
  ) -> Result<T, FetchError> {
    let url = self
      .base_url
      .join(path)
      .map_err(|e| FetchError::Transport(format!("invalid endpoint {}: {}", path, e)))?;

    debug!(%url, "requesting upstream");

    let response = self
      .http
      .get(url)
      .query(query)
      .send()
      .await
      .map_err(|e| FetchError::Transport(e.to_string()))?;

    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
      return Err(FetchError::RateLimited);
    }
    if !status.is_success() {
      return Err(FetchError::Status(status.as_u16()));
    }

    response.json::<T>().await.map_err(|e| {
      if e.is_decode() {
        FetchError::Decode(e.to_string())
      } else {
        FetchError::Transport(e.to_string())
      }
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use wiremock::matchers::{header, method, path, query_param};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn client(server: &MockServer) -> CoinGeckoClient {
    let config = UpstreamConfig {
      base_url: format!("{}/api/v3", server.uri()),
      user_agent: "marketwatch-test/1.0".to_string(),
      timeout_secs: 5,
    };
    CoinGeckoClient::with_api_key(&config, None).unwrap()
  }

  fn query() -> PricesQuery {
    PricesQuery {
      ids: vec!["bitcoin".into(), "ethereum".into()],
      vs_currencies: vec!["usd".into()],
    }
  }

  #[tokio::test]
  async fn test_simple_price_sends_expected_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/v3/simple/price"))
      .and(query_param("ids", "bitcoin,ethereum"))
      .and(query_param("vs_currencies", "usd"))
      .and(query_param("include_24hr_change", "true"))
      .and(query_param("include_market_cap", "true"))
      .and(query_param("include_24hr_vol", "true"))
      .and(header("accept", "application/json"))
      .and(header("user-agent", "marketwatch-test/1.0"))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "bitcoin": { "usd": 65000.0, "usd_24h_change": 1.5 },
        "ethereum": { "usd": 3200.0, "usd_24h_change": -0.4 }
      })))
      .expect(1)
      .mount(&server)
      .await;

    let table = client(&server).simple_price(&query()).await.unwrap();

    assert_eq!(table.figure("bitcoin", "usd"), Some(65000.0));
    assert_eq!(table.figure("ethereum", "usd_24h_change"), Some(-0.4));
  }

  #[tokio::test]
  async fn test_429_maps_to_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(path("/api/v3/search/trending"))
      .respond_with(ResponseTemplate::new(429))
      .mount(&server)
      .await;

    let err = client(&server).trending().await.unwrap_err();
    assert_eq!(err, FetchError::RateLimited);
  }

  #[tokio::test]
  async fn test_server_error_maps_to_status() {
    let server = MockServer::start().await;
    Mock::given(path("/api/v3/global"))
      .respond_with(ResponseTemplate::new(503))
      .mount(&server)
      .await;

    let err = client(&server).global().await.unwrap_err();
    assert_eq!(err, FetchError::Status(503));
  }

  #[tokio::test]
  async fn test_malformed_body_maps_to_decode() {
    let server = MockServer::start().await;
    Mock::given(path("/api/v3/global"))
      .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
      .mount(&server)
      .await;

    let err = client(&server).global().await.unwrap_err();
    assert!(matches!(err, FetchError::Decode(_)), "got {err:?}");
  }

  #[tokio::test]
  async fn test_global_unwraps_data_field() {
    let server = MockServer::start().await;
    Mock::given(path("/api/v3/global"))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "data": {
          "active_cryptocurrencies": 11000,
          "markets": 870,
          "total_market_cap": { "usd": 2.0e12 },
          "total_volume": { "usd": 7.0e10 },
          "market_cap_percentage": { "btc": 51.0 },
          "market_cap_change_percentage_24h_usd": 0.7
        }
      })))
      .mount(&server)
      .await;

    let global = client(&server).global().await.unwrap();
    assert_eq!(global.markets, 870);
    assert_eq!(global.market_cap_percentage["btc"], 51.0);
  }

  #[tokio::test]
  async fn test_api_key_header_is_sent() {
    let server = MockServer::start().await;
    Mock::given(path("/api/v3/search/trending"))
      .and(header("x-cg-demo-api-key", "demo-key"))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "coins": [] })))
      .expect(1)
      .mount(&server)
      .await;

    let config = UpstreamConfig {
      base_url: format!("{}/api/v3/", server.uri()),
      ..UpstreamConfig::default()
    };
    let client = CoinGeckoClient::with_api_key(&config, Some("demo-key".to_string())).unwrap();

    let trending = client.trending().await.unwrap();
    assert!(trending.coins.is_empty());
  }

  #[tokio::test]
  async fn test_unreachable_host_maps_to_transport() {
    // Grab a free port, then release it so nothing is listening there
    let port = std::net::TcpListener::bind("127.0.0.1:0")
      .unwrap()
      .local_addr()
      .unwrap()
      .port();
    let config = UpstreamConfig {
      base_url: format!("http://127.0.0.1:{port}/api/v3"),
      timeout_secs: 2,
      ..UpstreamConfig::default()
    };
    let client = CoinGeckoClient::with_api_key(&config, None).unwrap();

    let err = client.global().await.unwrap_err();
    assert!(matches!(err, FetchError::Transport(_)), "got {err:?}");
  }
}
