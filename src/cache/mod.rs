// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Stale-while-revalidate caching infrastructure.
//!
//! - [`CacheStore`]: owns every cached entry; all reads and writes go through it
//! - [`RequestDeduplicator`]: at most one in-flight fetch per key
//! - [`SubscriberRegistry`]: fans `(data, error, isLoading)` updates out per key
//! - [`RevalidationScheduler`]: marks entries stale when the environment
//!   signals that data may have changed
//!
//! # Examples
//!
//! ```rust,ignore
//! use tokengate::{CacheKey, CacheSettings, CacheStore, QueryOptions};
//! use std::time::Duration;
//!
//! let store = CacheStore::new(CacheSettings::default());
//! let key = CacheKey::new("balance", "0xabc…");
//!
//! // Fresh hit: served from memory. Stale hit: served from memory and
//! // refetched in the background. Miss: awaits the fetch.
//! let value = store
//!     .get(&key, |_cancel| async { fetch_balance().await }, &QueryOptions::default())
//!     .await?;
//! ```

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::constants::{DEFAULT_CACHE_TIME, DEFAULT_STALE_TIME};
use crate::retry::RetryPolicy;

mod dedup;
mod entry;
mod revalidation;
mod store;
mod subscribers;

pub use dedup::{Dedup, RequestDeduplicator, SharedFetch};
pub use entry::Freshness;
pub use revalidation::{EnvironmentSignal, RevalidationHandle, RevalidationScheduler};
pub use store::CacheStore;
pub use subscribers::{Listener, SubscriberRegistry, Subscription, SubscriptionId};

/// Store-wide defaults for freshness and retries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Entries younger than this are served without revalidation
    pub stale_time: Duration,
    /// Entries are evicted this long after their last write
    pub cache_time: Duration,
    /// Retry policy applied to fetchers
    pub retry: RetryPolicy,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            stale_time: DEFAULT_STALE_TIME,
            cache_time: DEFAULT_CACHE_TIME,
            retry: RetryPolicy::access_check(),
        }
    }
}

impl CacheSettings {
    /// Apply per-query overrides. `cache_time` never drops below `stale_time`.
    pub(crate) fn resolve(&self, options: &QueryOptions) -> CacheSettings {
        let stale_time = options.stale_time.unwrap_or(self.stale_time);
        let cache_time = options.cache_time.unwrap_or(self.cache_time).max(stale_time);
        CacheSettings {
            stale_time,
            cache_time,
            retry: options.retry.clone().unwrap_or_else(|| self.retry.clone()),
        }
    }
}

/// Per-query overrides of the store defaults
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Override the stale time
    pub stale_time: Option<Duration>,
    /// Override the cache time
    pub cache_time: Option<Duration>,
    /// Override the retry policy
    pub retry: Option<RetryPolicy>,
}

impl QueryOptions {
    /// Sets the stale time for this query
    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = Some(stale_time);
        self
    }

    /// Sets the cache time for this query
    pub fn with_cache_time(mut self, cache_time: Duration) -> Self {
        self.cache_time = Some(cache_time);
        self
    }

    /// Sets the retry policy for this query
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }
}

/// Statistics about cache behavior
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Fresh entries served without a fetch
    pub hits: u64,
    /// Lookups that had to wait for a fetch
    pub misses: u64,
    /// Stale entries served while a background refetch ran
    pub stale_hits: u64,
    /// Entries removed because `cache_time` elapsed
    pub evictions: u64,
    /// Background refetches started
    pub revalidations: u64,
    /// Fetch results dropped because the entry changed while they were in flight
    pub discarded_writes: u64,
    /// Current number of entries
    pub entries: usize,
}

impl CacheStats {
    /// Share of lookups served from memory, as a percentage (0.0 to 100.0)
    pub fn hit_rate(&self) -> f64 {
        let served = self.hits + self.stale_hits;
        let total = served + self.misses;
        if total == 0 {
            0.0
        } else {
            (served as f64 / total as f64) * 100.0
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits={}, stale_hits={}, misses={}, evictions={}, revalidations={}, discarded_writes={}, entries={}, hit_rate={:.1}%",
            self.hits,
            self.stale_hits,
            self.misses,
            self.evictions,
            self.revalidations,
            self.discarded_writes,
            self.entries,
            self.hit_rate()
        )
    }
}

/// Lock a mutex, recovering the guard if a previous holder panicked.
///
/// None of the guarded state can be left half-updated by a panicking
/// listener, because listeners never run while a lock is held.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_applies_overrides() {
        let settings = CacheSettings::default();
        let resolved = settings.resolve(
            &QueryOptions::default()
                .with_stale_time(Duration::from_secs(5))
                .with_retry(RetryPolicy::no_retry()),
        );
        assert_eq!(resolved.stale_time, Duration::from_secs(5));
        assert_eq!(resolved.cache_time, DEFAULT_CACHE_TIME);
        assert_eq!(resolved.retry, RetryPolicy::no_retry());
    }

    #[test]
    fn test_resolve_keeps_cache_time_above_stale_time() {
        let settings = CacheSettings::default();
        let resolved = settings.resolve(
            &QueryOptions::default()
                .with_stale_time(Duration::from_secs(600))
                .with_cache_time(Duration::from_secs(60)),
        );
        assert_eq!(resolved.cache_time, Duration::from_secs(600));
    }

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats {
            hits: 2,
            stale_hits: 1,
            misses: 1,
            ..Default::default()
        };
        assert_eq!(stats.hit_rate(), 75.0);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }
}
