//! Static placeholder payloads served when no real data is available.

use std::collections::BTreeMap;

use super::api_types::{CoinQuote, GlobalMarket, PriceTable, TrendingCoin, TrendingCoins, TrendingItem};

pub fn prices() -> PriceTable {
  let rows: [(&str, f64, f64, f64); 5] = [
    ("bitcoin", 43000.0, 2.5, 850_000_000_000.0),
    ("ethereum", 2600.0, 1.8, 310_000_000_000.0),
    ("binancecoin", 310.0, -0.5, 47_000_000_000.0),
    ("cardano", 0.48, 3.2, 17_000_000_000.0),
    ("solana", 98.0, 4.1, 42_000_000_000.0),
  ];

  PriceTable(
    rows
      .into_iter()
      .map(|(id, usd, change, market_cap)| {
        let quote: CoinQuote = [
          ("usd".to_string(), Some(usd)),
          ("usd_24h_change".to_string(), Some(change)),
          ("usd_market_cap".to_string(), Some(market_cap)),
        ]
        .into_iter()
        .collect();
        (id.to_string(), quote)
      })
      .collect(),
  )
}

pub fn trending() -> TrendingCoins {
  let rows = [
    ("bitcoin", "Bitcoin", "BTC", 1),
    ("ethereum", "Ethereum", "ETH", 2),
    ("solana", "Solana", "SOL", 5),
    ("cardano", "Cardano", "ADA", 8),
    ("polkadot", "Polkadot", "DOT", 12),
  ];

  TrendingCoins {
    coins: rows
      .into_iter()
      .map(|(id, name, symbol, rank)| TrendingCoin {
        item: TrendingItem {
          id: id.to_string(),
          name: name.to_string(),
          symbol: symbol.to_string(),
          market_cap_rank: Some(rank),
          thumb: String::new(),
        },
      })
      .collect(),
  }
}

pub fn global() -> GlobalMarket {
  GlobalMarket {
    total_market_cap: BTreeMap::from([("usd".to_string(), 1_700_000_000_000.0)]),
    total_volume: BTreeMap::from([("usd".to_string(), 45_000_000_000.0)]),
    market_cap_percentage: BTreeMap::from([
      ("btc".to_string(), 50.2),
      ("eth".to_string(), 18.5),
    ]),
    market_cap_change_percentage_24h_usd: 2.1,
    active_cryptocurrencies: 10_500,
    markets: 850,
  }
}
