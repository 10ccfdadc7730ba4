//! JSON envelopes returned by the market routes.

use axum::{
  http::{header::RETRY_AFTER, HeaderValue, StatusCode},
  response::{IntoResponse, Response},
  Json,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::{CacheError, CacheResult};

/// Uniform success envelope for every market resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
  pub success: bool,
  pub data: Option<T>,
  /// ISO-8601, millisecond precision
  pub timestamp: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub cached: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub mock: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub note: Option<String>,
}

impl<T> Envelope<T> {
  /// Envelope for data produced directly by this service.
  pub fn success(data: T, timestamp: DateTime<Utc>) -> Self {
    Self {
      success: true,
      data: Some(data),
      timestamp: iso_timestamp(timestamp),
      cached: None,
      mock: None,
      note: None,
    }
  }
}

impl<T> From<CacheResult<T>> for Envelope<T> {
  fn from(result: CacheResult<T>) -> Self {
    let note = result.note().map(str::to_string);
    // Mock answers carry `mock: true` and no `cached` flag at all
    let mock = result.is_mock().then_some(true);
    let cached = (!result.is_mock()).then(|| result.is_cached());

    Self {
      success: true,
      data: Some(result.data),
      timestamp: iso_timestamp(result.as_of),
      cached,
      mock,
      note,
    }
  }
}

pub fn iso_timestamp(at: DateTime<Utc>) -> String {
  at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Failure body, `{ "success": false, "error": "..." }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
  pub success: bool,
  pub error: String,
}

/// Application error type for Axum.
#[derive(Debug)]
pub struct ApiError(pub CacheError);

impl From<CacheError> for ApiError {
  fn from(err: CacheError) -> Self {
    Self(err)
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let body = Json(ErrorBody {
      success: false,
      error: self.0.to_string(),
    });

    match &self.0 {
      CacheError::RateLimited { resource, .. } => {
        debug!(resource = *resource, "no cached data and upstream attempt too recent");
        let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
        response.headers_mut().insert(
          RETRY_AFTER,
          HeaderValue::from(self.0.retry_after_secs()),
        );
        response
      }
    }
  }
}

/// Result type for Axum handlers.
pub type ApiResult<T> = Result<Json<Envelope<T>>, ApiError>;
