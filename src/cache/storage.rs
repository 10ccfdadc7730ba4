//! In-memory state backing a single cached resource.

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A payload together with the time it was fetched.
///
/// Entries are immutable once built and are swapped in whole.
#[derive(Debug)]
pub struct CacheEntry<T> {
  pub payload: T,
  pub fetched_at: DateTime<Utc>,
}

#[derive(Debug)]
struct SlotState<T> {
  entry: Option<Arc<CacheEntry<T>>>,
  /// Last upstream attempt, successful or not
  last_attempt_at: Option<DateTime<Utc>>,
}

/// Outcome of asking for permission to call upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
  /// The attempt has been recorded; go ahead
  Allowed,
  /// Too soon after the previous attempt
  Denied { retry_after: Duration },
}

/// Process-local storage for one resource: the latest entry and the
/// rate limit bookkeeping.
#[derive(Debug)]
pub struct MemoryStorage<T> {
  state: Mutex<SlotState<T>>,
}

impl<T> MemoryStorage<T> {
  pub fn new() -> Self {
    Self {
      state: Mutex::new(SlotState {
        entry: None,
        last_attempt_at: None,
      }),
    }
  }

  // A panic while holding the lock cannot leave a half-written entry, so a
  // poisoned lock is safe to keep using.
  fn lock(&self) -> MutexGuard<'_, SlotState<T>> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Current entry, if any upstream fetch has ever succeeded.
  pub fn entry(&self) -> Option<Arc<CacheEntry<T>>> {
    self.lock().entry.clone()
  }

  /// Check the minimum interval and, if it has elapsed, record `now` as the
  /// latest attempt.
  pub fn begin_attempt(&self, now: DateTime<Utc>, min_interval: Duration) -> Attempt {
    let mut state = self.lock();
    if let Some(last) = state.last_attempt_at {
      let elapsed = now - last;
      if elapsed < min_interval {
        return Attempt::Denied {
          retry_after: min_interval - elapsed,
        };
      }
    }
    // A `now` earlier than the last attempt yields a negative elapsed time
    // and is denied above, so the recorded time never moves backwards.
    state.last_attempt_at = Some(now);
    Attempt::Allowed
  }

  /// Replace the entry with a freshly fetched payload.
  pub fn replace(&self, payload: T, fetched_at: DateTime<Utc>) {
    let entry = Arc::new(CacheEntry {
      payload,
      fetched_at,
    });
    self.lock().entry = Some(entry);
  }

  #[cfg(test)]
  pub fn last_attempt_at(&self) -> Option<DateTime<Utc>> {
    self.lock().last_attempt_at
  }
}

impl<T> Default for MemoryStorage<T> {
  fn default() -> Self {
    Self::new()
  }
}
