// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Request deduplication
//!
//! At most one fetch per cache key is in flight. The fetch runs on its own
//! task so it settles (and commits its result) even if every caller that
//! awaited it has gone away; callers hold a [`SharedFetch`] onto the task's
//! outcome. The pending entry is removed by the task itself when it settles
//! or unwinds, so the map is empty for a key between requests.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::lock;
use crate::errors::FetchError;
use crate::types::cache::CacheKey;

/// Cloneable handle onto the outcome of one in-flight fetch
pub type SharedFetch<T> = Shared<BoxFuture<'static, Result<T, FetchError>>>;

/// Outcome of [`RequestDeduplicator::run`]
pub enum Dedup<T> {
    /// A fetch was already in flight; the caller joined it
    Joined(SharedFetch<T>),
    /// No fetch was in flight; a new one was started
    Started(SharedFetch<T>),
}

impl<T> Dedup<T> {
    /// Whether this call started the fetch
    pub fn is_started(&self) -> bool {
        matches!(self, Dedup::Started(_))
    }

    /// The shared outcome, regardless of who started it
    pub fn into_shared(self) -> SharedFetch<T> {
        match self {
            Dedup::Joined(shared) | Dedup::Started(shared) => shared,
        }
    }
}

struct PendingFetch<T> {
    ticket: u64,
    cancel: CancellationToken,
    shared: SharedFetch<T>,
}

type PendingMap<T> = Arc<Mutex<HashMap<CacheKey, PendingFetch<T>>>>;

/// Removes a task's own pending entry when the task ends, including when the
/// fetch panics or the task is aborted
struct PendingGuard<T> {
    pending: PendingMap<T>,
    key: CacheKey,
    ticket: u64,
}

impl<T> Drop for PendingGuard<T> {
    fn drop(&mut self) {
        let mut pending = lock(&self.pending);
        if pending
            .get(&self.key)
            .is_some_and(|entry| entry.ticket == self.ticket)
        {
            pending.remove(&self.key);
        }
    }
}

/// Map of in-flight fetches keyed by cache key
pub struct RequestDeduplicator<T> {
    pending: PendingMap<T>,
    next_ticket: Arc<AtomicU64>,
}

impl<T> Clone for RequestDeduplicator<T> {
    fn clone(&self) -> Self {
        Self {
            pending: Arc::clone(&self.pending),
            next_ticket: Arc::clone(&self.next_ticket),
        }
    }
}

impl<T> Default for RequestDeduplicator<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RequestDeduplicator<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates an empty deduplicator
    pub fn new() -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_ticket: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Joins the in-flight fetch for `key`, or starts one with `start`.
    ///
    /// `start` is only called when no fetch is pending. It receives a child of
    /// `parent`; the returned future must stop when that token fires. Must be
    /// called from within a tokio runtime.
    pub fn run<F, Fut>(&self, key: &CacheKey, parent: &CancellationToken, start: F) -> Dedup<T>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        let mut pending = lock(&self.pending);
        if let Some(existing) = pending.get(key) {
            debug!(key = %key, "Joining in-flight fetch");
            return Dedup::Joined(existing.shared.clone());
        }

        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let cancel = parent.child_token();
        let fetch = start(cancel.clone());

        // The task cannot remove its entry before it is inserted: removal
        // takes the same lock that is held until this function returns.
        let map = Arc::clone(&self.pending);
        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            let _guard = PendingGuard {
                pending: map,
                key: task_key,
                ticket,
            };
            fetch.await
        });

        let shared = handle
            .map(|joined| match joined {
                Ok(result) => result,
                Err(err) if err.is_cancelled() => Err(FetchError::Aborted),
                Err(err) => Err(FetchError::network(format!("fetch task failed: {err}"))),
            })
            .boxed()
            .shared();

        trace!(key = %key, ticket, "Started fetch");
        pending.insert(
            key.clone(),
            PendingFetch {
                ticket,
                cancel,
                shared: shared.clone(),
            },
        );
        Dedup::Started(shared)
    }

    /// Cancels the in-flight fetch for `key`. Waiters resolve to
    /// [`FetchError::Aborted`] and the key is free for a new fetch at once.
    pub fn cancel(&self, key: &CacheKey) -> bool {
        let removed = lock(&self.pending).remove(key);
        match removed {
            Some(entry) => {
                debug!(key = %key, "Cancelled in-flight fetch");
                entry.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancels every in-flight fetch and returns how many were cancelled
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<PendingFetch<T>> = lock(&self.pending).drain().map(|(_, v)| v).collect();
        for entry in &drained {
            entry.cancel.cancel();
        }
        drained.len()
    }

    /// Whether a fetch is in flight for `key`
    pub fn is_pending(&self, key: &CacheKey) -> bool {
        lock(&self.pending).contains_key(key)
    }

    /// Number of keys with a fetch in flight
    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn key() -> CacheKey {
        CacheKey::new("test", "k")
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_runs_share_one_fetch() {
        let dedup = RequestDeduplicator::<u32>::new();
        let parent = CancellationToken::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let mut outcomes = Vec::new();
        for _ in 0..5 {
            let calls = calls.clone();
            outcomes.push(dedup.run(&key(), &parent, move |_| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok(42)
            }));
        }

        assert_eq!(outcomes.iter().filter(|o| o.is_started()).count(), 1);
        for outcome in outcomes {
            assert_eq!(outcome.into_shared().await, Ok(42));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(dedup.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_removed_after_failure() {
        let dedup = RequestDeduplicator::<u32>::new();
        let parent = CancellationToken::new();

        let result = dedup
            .run(&key(), &parent, |_| async { Err(FetchError::Timeout) })
            .into_shared()
            .await;

        assert_eq!(result, Err(FetchError::Timeout));
        assert!(!dedup.is_pending(&key()));
    }

    fn exploding_fetch() -> Result<u32, FetchError> {
        panic!("fetcher blew up")
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_removed_after_panic() {
        let dedup = RequestDeduplicator::<u32>::new();
        let parent = CancellationToken::new();

        let result = dedup
            .run(&key(), &parent, |_| async { exploding_fetch() })
            .into_shared()
            .await;

        assert!(matches!(result, Err(FetchError::Network { .. })));
        assert!(!dedup.is_pending(&key()));

        let retried = dedup.run(&key(), &parent, |_| async { Ok(3) });
        assert!(retried.is_started());
        assert_eq!(retried.into_shared().await, Ok(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_aborts_waiters_and_frees_key() {
        let dedup = RequestDeduplicator::<u32>::new();
        let parent = CancellationToken::new();

        let first = dedup.run(&key(), &parent, |cancel| async move {
            cancel.cancelled().await;
            Err(FetchError::Aborted)
        });
        assert!(dedup.cancel(&key()));
        assert!(!dedup.is_pending(&key()));
        assert_eq!(first.into_shared().await, Err(FetchError::Aborted));

        // A new fetch for the same key is not disturbed by the old task settling
        let second = dedup.run(&key(), &parent, |_| async { Ok(1) });
        assert!(second.is_started());
        assert_eq!(second.into_shared().await, Ok(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_parent_cancellation_reaches_fetch() {
        let dedup = RequestDeduplicator::<u32>::new();
        let parent = CancellationToken::new();

        let outcome = dedup.run(&key(), &parent, |cancel| async move {
            cancel.cancelled().await;
            Err(FetchError::Aborted)
        });
        parent.cancel();
        assert_eq!(outcome.into_shared().await, Err(FetchError::Aborted));
    }
}
