//! Error taxonomy for upstream fetches and cache lookups.

use chrono::Duration;
use thiserror::Error;

/// Failure reported by an upstream fetcher.
///
/// Only `RateLimited` is treated differently by the cache; every other
/// variant takes the generic "upstream unavailable" path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
  /// Upstream answered with HTTP 429
  #[error("upstream rate limited the request")]
  RateLimited,
  /// Upstream answered with a non-success status other than 429
  #[error("upstream returned HTTP {0}")]
  Status(u16),
  /// Connection, TLS or timeout failure
  #[error("upstream request failed: {0}")]
  Transport(String),
  /// Response body did not match the expected shape
  #[error("failed to decode upstream response: {0}")]
  Decode(String),
}

impl FetchError {
  pub fn is_rate_limited(&self) -> bool {
    matches!(self, FetchError::RateLimited)
  }
}

/// The only error a cache lookup surfaces to its caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
  /// A request arrived too soon after the previous upstream attempt and
  /// there is nothing cached to serve instead.
  #[error("Rate limited, please try again later")]
  RateLimited {
    resource: &'static str,
    retry_after: Duration,
  },
}

impl CacheError {
  /// Seconds until the next upstream attempt is allowed, rounded up.
  pub fn retry_after_secs(&self) -> u64 {
    match self {
      CacheError::RateLimited { retry_after, .. } => {
        let millis = retry_after.num_milliseconds().max(0);
        u64::try_from((millis + 999) / 1000).unwrap_or(0)
      }
    }
  }
}
