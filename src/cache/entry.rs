// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Cache entries with freshness metadata

use std::time::Duration;

use tokio::task::AbortHandle;
use tokio::time::Instant;

use crate::errors::FetchError;
use crate::types::cache::Generation;

/// How an entry should be served at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Serve without revalidation
    Fresh,
    /// Serve, and revalidate in the background
    Stale,
    /// Past `cache_time`; treat as absent
    Expired,
}

/// One cached value. Owned exclusively by the store.
#[derive(Debug)]
pub(crate) struct CacheEntry<T> {
    pub(crate) data: T,
    /// When the entry was last written
    pub(crate) written_at: Instant,
    /// Set by invalidation; cleared by the next write
    pub(crate) is_stale: bool,
    pub(crate) generation: Generation,
    pub(crate) stale_time: Duration,
    pub(crate) cache_time: Duration,
    /// Scheduled eviction task, aborted when the entry is replaced or removed
    pub(crate) eviction: Option<AbortHandle>,
}

impl<T> CacheEntry<T> {
    pub(crate) fn new(
        data: T,
        generation: Generation,
        stale_time: Duration,
        cache_time: Duration,
    ) -> Self {
        Self {
            data,
            written_at: Instant::now(),
            is_stale: false,
            generation,
            stale_time,
            cache_time,
            eviction: None,
        }
    }

    pub(crate) fn freshness(&self, now: Instant) -> Freshness {
        let age = now.saturating_duration_since(self.written_at);
        if age >= self.cache_time {
            Freshness::Expired
        } else if self.is_stale || age >= self.stale_time {
            Freshness::Stale
        } else {
            Freshness::Fresh
        }
    }
}

impl<T> Drop for CacheEntry<T> {
    fn drop(&mut self) {
        if let Some(eviction) = self.eviction.take() {
            eviction.abort();
        }
    }
}

/// Error from the most recent failed fetch for a key
///
/// Kept for late subscribers until the next write or until `cache_time`
/// elapses, whichever comes first.
#[derive(Debug)]
pub(crate) struct FailedFetch {
    pub(crate) error: FetchError,
    pub(crate) generation: Generation,
    pub(crate) eviction: Option<AbortHandle>,
}

impl Drop for FailedFetch {
    fn drop(&mut self) {
        if let Some(eviction) = self.eviction.take() {
            eviction.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> CacheEntry<u32> {
        CacheEntry::new(
            1,
            Generation::default(),
            Duration::from_secs(30),
            Duration::from_secs(300),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_freshness_windows() {
        let entry = entry();
        let written = entry.written_at;

        assert_eq!(entry.freshness(written), Freshness::Fresh);
        assert_eq!(
            entry.freshness(written + Duration::from_secs(29)),
            Freshness::Fresh
        );
        assert_eq!(
            entry.freshness(written + Duration::from_secs(30)),
            Freshness::Stale
        );
        assert_eq!(
            entry.freshness(written + Duration::from_secs(299)),
            Freshness::Stale
        );
        assert_eq!(
            entry.freshness(written + Duration::from_secs(300)),
            Freshness::Expired
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidated_entry_is_stale() {
        let mut entry = entry();
        entry.is_stale = true;
        assert_eq!(entry.freshness(entry.written_at), Freshness::Stale);
    }
}
