use chrono::Duration;
use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::cache::CachePolicy;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
  pub server: ServerConfig,
  pub upstream: UpstreamConfig,
  pub cache: CacheConfig,
  pub prices: PricesConfig,
  pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  /// Address the HTTP server listens on
  pub bind: SocketAddr,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
  /// CoinGecko API root, e.g. https://api.coingecko.com/api/v3
  pub base_url: String,
  pub user_agent: String,
  /// Per-request timeout; the cache itself never times out
  pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
  fn default() -> Self {
    Self {
      base_url: "https://api.coingecko.com/api/v3".to_string(),
      user_agent: concat!("marketwatch/", env!("CARGO_PKG_VERSION")).to_string(),
      timeout_secs: 10,
    }
  }
}

/// Timing for one cached resource, in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourcePolicy {
  pub fresh_window_secs: u32,
  pub min_request_interval_secs: u32,
}

impl ResourcePolicy {
  const fn new(fresh_window_secs: u32, min_request_interval_secs: u32) -> Self {
    Self {
      fresh_window_secs,
      min_request_interval_secs,
    }
  }

  pub fn to_policy(self) -> CachePolicy {
    CachePolicy::new(
      Duration::seconds(i64::from(self.fresh_window_secs)),
      Duration::seconds(i64::from(self.min_request_interval_secs)),
    )
  }
}

/// Policy as written in YAML; omitted fields fall back per resource.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
struct PartialPolicy {
  fresh_window_secs: Option<u32>,
  min_request_interval_secs: Option<u32>,
}

impl PartialPolicy {
  fn or(self, defaults: ResourcePolicy) -> ResourcePolicy {
    ResourcePolicy {
      fresh_window_secs: self.fresh_window_secs.unwrap_or(defaults.fresh_window_secs),
      min_request_interval_secs: self
        .min_request_interval_secs
        .unwrap_or(defaults.min_request_interval_secs),
    }
  }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CacheConfigFile {
  prices: PartialPolicy,
  trending: PartialPolicy,
  global: PartialPolicy,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(from = "CacheConfigFile")]
pub struct CacheConfig {
  pub prices: ResourcePolicy,
  pub trending: ResourcePolicy,
  pub global: ResourcePolicy,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      prices: ResourcePolicy::new(60, 10),
      trending: ResourcePolicy::new(300, 15),
      global: ResourcePolicy::new(120, 20),
    }
  }
}

impl From<CacheConfigFile> for CacheConfig {
  fn from(file: CacheConfigFile) -> Self {
    let defaults = Self::default();
    Self {
      prices: file.prices.or(defaults.prices),
      trending: file.trending.or(defaults.trending),
      global: file.global.or(defaults.global),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PricesConfig {
  /// Coin ids used when a request does not name any
  pub default_ids: Vec<String>,
  pub default_vs_currencies: Vec<String>,
}

impl Default for PricesConfig {
  fn default() -> Self {
    let ids = [
      "bitcoin",
      "ethereum",
      "binancecoin",
      "cardano",
      "solana",
      "polkadot",
      "dogecoin",
      "avalanche-2",
      "chainlink",
      "polygon",
    ];
    Self {
      default_ids: ids.iter().map(|s| s.to_string()).collect(),
      default_vs_currencies: vec!["usd".to_string()],
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
  /// Filter directive used when RUST_LOG is unset
  pub level: String,
  /// Write logs to this file instead of stderr
  pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: "info,marketwatch=debug,tower_http=info".to_string(),
      file: None,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./marketwatch.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/marketwatch/config.yaml
  ///
  /// Built-in defaults are used when no file is found.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Self::default(),
    };

    config.validate()?;
    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("marketwatch.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("marketwatch").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<()> {
    if self.upstream.base_url.trim().is_empty() {
      return Err(eyre!("upstream.base_url must not be empty"));
    }
    url::Url::parse(&self.upstream.base_url)
      .map_err(|e| eyre!("upstream.base_url is not a valid URL: {}", e))?;

    for (name, policy) in [
      ("prices", self.cache.prices),
      ("trending", self.cache.trending),
      ("global", self.cache.global),
    ] {
      if policy.fresh_window_secs == 0 {
        return Err(eyre!("cache.{}.fresh_window_secs must be positive", name));
      }
    }

    if self.prices.default_ids.is_empty() || self.prices.default_vs_currencies.is_empty() {
      return Err(eyre!(
        "prices.default_ids and prices.default_vs_currencies must not be empty"
      ));
    }

    Ok(())
  }

  /// Get the optional CoinGecko demo API key from the environment.
  ///
  /// Checks MARKETWATCH_COINGECKO_KEY.
  pub fn coingecko_api_key() -> Option<String> {
    std::env::var("MARKETWATCH_COINGECKO_KEY")
      .ok()
      .filter(|key| !key.trim().is_empty())
  }
}
