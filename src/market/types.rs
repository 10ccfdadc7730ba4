use serde::Serialize;

use super::api_types::{GlobalMarket, PriceTable, TrendingCoin};

/// Parameters for a `/simple/price` lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricesQuery {
  pub ids: Vec<String>,
  pub vs_currencies: Vec<String>,
}

impl PricesQuery {
  /// Build a query from comma separated request parameters, falling back
  /// to `defaults` for any parameter that is missing or blank.
  pub fn from_params(ids: Option<&str>, vs_currencies: Option<&str>, defaults: &PricesQuery) -> Self {
    Self {
      ids: split_list(ids).unwrap_or_else(|| defaults.ids.clone()),
      vs_currencies: split_list(vs_currencies).unwrap_or_else(|| defaults.vs_currencies.clone()),
    }
  }

  pub fn ids_param(&self) -> String {
    self.ids.join(",")
  }

  pub fn vs_currencies_param(&self) -> String {
    self.vs_currencies.join(",")
  }
}

fn split_list(value: Option<&str>) -> Option<Vec<String>> {
  let items: Vec<String> = value?
    .split(',')
    .map(|s| s.trim().to_lowercase())
    .filter(|s| !s.is_empty())
    .collect();

  if items.is_empty() {
    None
  } else {
    Some(items)
  }
}

/// Combined view of the three resources, used as market context.
///
/// A section is `None` when its cache had nothing to offer yet.
#[derive(Debug, Clone, Serialize)]
pub struct MarketSnapshot {
  pub prices: Option<PriceTable>,
  pub trending: Vec<TrendingCoin>,
  pub global: Option<GlobalMarket>,
  /// True when any section was served stale, from mock data, or is missing
  pub degraded: bool,
  /// True when any section carries mock data
  pub mock: bool,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn defaults() -> PricesQuery {
    PricesQuery {
      ids: vec!["bitcoin".into(), "ethereum".into()],
      vs_currencies: vec!["usd".into()],
    }
  }

  #[test]
  fn test_missing_params_use_defaults() {
    assert_eq!(PricesQuery::from_params(None, None, &defaults()), defaults());
  }

  #[test]
  fn test_params_are_normalized() {
    let query = PricesQuery::from_params(Some(" Solana, ,DOGECOIN "), Some("usd,EUR"), &defaults());
    assert_eq!(query.ids, vec!["solana", "dogecoin"]);
    assert_eq!(query.vs_currencies_param(), "usd,eur");
  }

  #[test]
  fn test_blank_param_falls_back() {
    let query = PricesQuery::from_params(Some(" , "), Some(""), &defaults());
    assert_eq!(query, defaults());
    assert_eq!(query.ids_param(), "bitcoin,ethereum");
  }
}
