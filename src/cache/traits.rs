//! Core types describing where a cached answer came from.

use chrono::{DateTime, Utc};

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was fetched (cached and stale answers), or when the
  /// answer was produced (network and mock answers)
  pub as_of: DateTime<Utc>,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh network data.
  pub fn from_network(data: T, now: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      as_of: now,
    }
  }

  /// Create a new cache result from data still inside its fresh window.
  pub fn fresh(data: T, fetched_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::CacheFresh,
      as_of: fetched_at,
    }
  }

  /// Create a new cache result for an expired entry served as a fallback.
  pub fn stale(data: T, fetched_at: DateTime<Utc>, reason: Degradation) -> Self {
    Self {
      data,
      source: CacheSource::CacheStale(reason),
      as_of: fetched_at,
    }
  }

  /// Create a new cache result carrying the configured mock payload.
  pub fn mock(data: T, now: DateTime<Utc>, reason: Degradation) -> Self {
    Self {
      data,
      source: CacheSource::Mock(reason),
      as_of: now,
    }
  }

  pub fn is_cached(&self) -> bool {
    matches!(
      self.source,
      CacheSource::CacheFresh | CacheSource::CacheStale(_)
    )
  }

  pub fn is_mock(&self) -> bool {
    matches!(self.source, CacheSource::Mock(_))
  }

  /// Human readable explanation for degraded answers.
  pub fn note(&self) -> Option<&'static str> {
    self.source.note()
  }
}

/// Indicates where cached data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Data from cache, still inside its fresh window
  CacheFresh,
  /// Data from cache past its fresh window, served instead of upstream
  CacheStale(Degradation),
  /// No real data available, serving the static mock payload
  Mock(Degradation),
}

impl CacheSource {
  pub fn note(&self) -> Option<&'static str> {
    match self {
      CacheSource::Network | CacheSource::CacheFresh => None,
      CacheSource::CacheStale(reason) => Some(match reason {
        Degradation::Throttled => "Rate limited, returning cached data",
        Degradation::UpstreamRateLimited => "API rate limited, returning cached data",
        Degradation::UpstreamUnavailable => "API error, returning cached data",
      }),
      CacheSource::Mock(reason) => Some(match reason {
        Degradation::UpstreamRateLimited => "API rate limited, returning mock data",
        Degradation::Throttled | Degradation::UpstreamUnavailable => {
          "API unavailable, returning mock data"
        }
      }),
    }
  }
}

/// Why a request was answered without fresh upstream data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Degradation {
  /// The local minimum request interval has not elapsed
  Throttled,
  /// Upstream answered with HTTP 429
  UpstreamRateLimited,
  /// Network failure, non-429 error status or malformed body
  UpstreamUnavailable,
}
