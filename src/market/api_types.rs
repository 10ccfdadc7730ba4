//! Serde types matching CoinGecko v3 responses.
//!
//! These double as the cached payloads, so mock data built from them has
//! exactly the shape of real upstream data.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// /simple/price
// ============================================================================

/// Per-coin quote, keyed by field name such as `usd`, `usd_24h_change`
/// or `eur_market_cap`. CoinGecko reports missing figures as null.
pub type CoinQuote = BTreeMap<String, Option<f64>>;

/// Response of `/simple/price`, keyed by coin id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceTable(pub BTreeMap<String, CoinQuote>);

impl PriceTable {
  /// Keep only the rows for `coin_ids`.
  pub fn only(&self, coin_ids: &[String]) -> PriceTable {
    PriceTable(
      self
        .0
        .iter()
        .filter(|(id, _)| coin_ids.contains(id))
        .map(|(id, quote)| (id.clone(), quote.clone()))
        .collect(),
    )
  }

  /// Look up a single figure, e.g. `figure("bitcoin", "usd_24h_change")`.
  #[cfg(test)]
  pub fn figure(&self, coin_id: &str, field: &str) -> Option<f64> {
    self.0.get(coin_id)?.get(field).copied().flatten()
  }
}

// ============================================================================
// /search/trending
// ============================================================================

/// Response of `/search/trending`. Only the coin list is kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendingCoins {
  #[serde(default)]
  pub coins: Vec<TrendingCoin>,
}

impl TrendingCoins {
  /// First `n` trending coins in upstream order.
  pub fn top(&self, n: usize) -> Vec<TrendingCoin> {
    self.coins.iter().take(n).cloned().collect()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingCoin {
  pub item: TrendingItem,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingItem {
  pub id: String,
  pub name: String,
  pub symbol: String,
  #[serde(default)]
  pub market_cap_rank: Option<u32>,
  #[serde(default)]
  pub thumb: String,
}

// ============================================================================
// /global
// ============================================================================

/// Wrapper returned by `/global`; the payload lives under `data`.
#[derive(Debug, Deserialize)]
pub struct GlobalResponse {
  pub data: GlobalMarket,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalMarket {
  #[serde(default)]
  pub total_market_cap: BTreeMap<String, f64>,
  #[serde(default)]
  pub total_volume: BTreeMap<String, f64>,
  #[serde(default)]
  pub market_cap_percentage: BTreeMap<String, f64>,
  #[serde(default)]
  pub market_cap_change_percentage_24h_usd: f64,
  #[serde(default)]
  pub active_cryptocurrencies: u64,
  #[serde(default)]
  pub markets: u64,
}
