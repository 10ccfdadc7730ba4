//! Market data and health handlers.

use axum::{
  extract::{Query, State},
  routing::get,
  Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::response::{ApiResult, Envelope};
use super::AppState;
use crate::market::api_types::{GlobalMarket, PriceTable, TrendingCoins};
use crate::market::types::{MarketSnapshot, PricesQuery};

/// Query string accepted by the prices route
#[derive(Debug, Default, Deserialize)]
pub struct PricesParams {
  pub ids: Option<String>,
  pub vs_currencies: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
  pub status: String,
  pub version: String,
}

pub fn crypto_router() -> Router<AppState> {
  Router::new()
    .route("/prices", get(prices))
    .route("/trending", get(trending))
    .route("/global", get(global))
    .route("/snapshot", get(snapshot))
}

pub fn health_router() -> Router<AppState> {
  Router::new().route("/health", get(health))
}

async fn prices(
  State(state): State<AppState>,
  Query(params): Query<PricesParams>,
) -> ApiResult<PriceTable> {
  let query = PricesQuery::from_params(
    params.ids.as_deref(),
    params.vs_currencies.as_deref(),
    state.market.default_prices_query(),
  );
  let result = state.market.prices(&query, Utc::now()).await?;
  Ok(Json(result.into()))
}

async fn trending(State(state): State<AppState>) -> ApiResult<TrendingCoins> {
  let result = state.market.trending(Utc::now()).await?;
  Ok(Json(result.into()))
}

async fn global(State(state): State<AppState>) -> ApiResult<GlobalMarket> {
  let result = state.market.global(Utc::now()).await?;
  Ok(Json(result.into()))
}

async fn snapshot(State(state): State<AppState>) -> Json<Envelope<MarketSnapshot>> {
  let now = Utc::now();
  let snapshot = state.market.snapshot(now).await;
  let mut envelope = Envelope::success(snapshot, now);
  if envelope.data.as_ref().is_some_and(|s| s.mock) {
    envelope.mock = Some(true);
  }
  Json(envelope)
}

async fn health() -> Json<HealthResponse> {
  Json(HealthResponse {
    status: "healthy".to_string(),
    version: env!("CARGO_PKG_VERSION").to_string(),
  })
}
