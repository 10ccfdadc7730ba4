//! Cache layer that orchestrates caching logic with upstream fetching.

use chrono::{DateTime, Duration, Utc};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use super::error::{CacheError, FetchError};
use super::storage::{Attempt, MemoryStorage};
use super::traits::{CacheResult, Degradation};

/// Timing parameters for one cached resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
  /// How long after a successful fetch the payload is served without
  /// contacting upstream
  pub fresh_window: Duration,
  /// Minimum spacing between upstream attempts, whatever the cache state
  pub min_request_interval: Duration,
}

impl CachePolicy {
  pub fn new(fresh_window: Duration, min_request_interval: Duration) -> Self {
    Self {
      fresh_window,
      min_request_interval,
    }
  }

  fn is_fresh(&self, fetched_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - fetched_at < self.fresh_window
  }
}

/// Cache that shields one upstream resource.
///
/// Every lookup ends in some payload except when a request arrives too
/// soon after the previous upstream attempt with nothing cached yet.
/// Upstream failures degrade to the last good payload, or to the mock
/// payload if nothing was ever fetched.
pub struct StaleTolerantCache<T> {
  resource: &'static str,
  policy: CachePolicy,
  mock: Arc<T>,
  storage: Arc<MemoryStorage<T>>,
}

impl<T: Clone> StaleTolerantCache<T> {
  /// Create a new cache for `resource` with an empty state.
  pub fn new(resource: &'static str, policy: CachePolicy, mock: T) -> Self {
    Self {
      resource,
      policy,
      mock: Arc::new(mock),
      storage: Arc::new(MemoryStorage::new()),
    }
  }

  /// Look up the resource at time `now`.
  ///
  /// 1. Entry inside its fresh window: return it, no upstream call
  /// 2. Previous attempt too recent: return the entry stale, or fail with
  ///    `CacheError::RateLimited` when there is none
  /// 3. Otherwise record the attempt and call `fetcher`; on failure fall
  ///    back to the stale entry, then to the mock payload
  pub async fn get<F, Fut>(&self, now: DateTime<Utc>, fetcher: F) -> Result<CacheResult<T>, CacheError>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
  {
    let cached = self.storage.entry();

    if let Some(entry) = &cached {
      if self.policy.is_fresh(entry.fetched_at, now) {
        debug!(resource = self.resource, "serving fresh cache entry");
        return Ok(CacheResult::fresh(
          entry.payload.clone(),
          entry.fetched_at,
        ));
      }
    }

    if let Attempt::Denied { retry_after } =
      self.storage.begin_attempt(now, self.policy.min_request_interval)
    {
      return match cached {
        Some(entry) => {
          debug!(resource = self.resource, "throttled, serving stale cache entry");
          Ok(CacheResult::stale(
            entry.payload.clone(),
            entry.fetched_at,
            Degradation::Throttled,
          ))
        }
        None => {
          debug!(resource = self.resource, "throttled with empty cache");
          Err(CacheError::RateLimited {
            resource: self.resource,
            retry_after,
          })
        }
      };
    }

    match fetcher().await {
      Ok(data) => {
        self.storage.replace(data.clone(), now);
        debug!(resource = self.resource, "cache refreshed from upstream");
        Ok(CacheResult::from_network(data, now))
      }
      Err(err) => {
        let reason = if err.is_rate_limited() {
          Degradation::UpstreamRateLimited
        } else {
          Degradation::UpstreamUnavailable
        };
        warn!(resource = self.resource, error = %err, "upstream fetch failed");

        // Another caller may have refreshed the entry while we were waiting
        match self.storage.entry().or(cached) {
          Some(entry) if self.policy.is_fresh(entry.fetched_at, now) => {
            Ok(CacheResult::fresh(entry.payload.clone(), entry.fetched_at))
          }
          Some(entry) => Ok(CacheResult::stale(
            entry.payload.clone(),
            entry.fetched_at,
            reason,
          )),
          None => Ok(CacheResult::mock((*self.mock).clone(), now, reason)),
        }
      }
    }
  }
}

impl<T> Clone for StaleTolerantCache<T> {
  fn clone(&self) -> Self {
    Self {
      resource: self.resource,
      policy: self.policy,
      mock: Arc::clone(&self.mock),
      storage: Arc::clone(&self.storage),
    }
  }
}
