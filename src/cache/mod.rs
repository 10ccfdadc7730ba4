//! Stale-tolerant caching layer for upstream market data.
//!
//! This module provides a resource-agnostic cache that:
//! - Serves a cached payload while it is younger than its fresh window
//! - Enforces a minimum spacing between upstream call attempts
//! - Serves stale data when upstream throttles or fails
//! - Falls back to a static mock payload when nothing real is available

mod error;
mod layer;
mod storage;
mod traits;

pub use error::{CacheError, FetchError};
pub use layer::{CachePolicy, StaleTolerantCache};
pub use traits::{CacheResult, CacheSource, Degradation};
