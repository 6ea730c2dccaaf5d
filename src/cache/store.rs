// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Stale-while-revalidate cache store
//!
//! [`CacheStore`] is the only owner of cached entries. A lookup classifies the
//! entry by age:
//!
//! - younger than `stale_time` (and not invalidated): served as is
//! - older than `stale_time`: served as is, and a background refetch starts
//! - older than `cache_time`, or absent: the caller awaits a fetch
//!
//! Every write takes a new [`Generation`]. A fetch remembers the generation it
//! started from, and its result is dropped if the entry moved on while the
//! request was in flight, so a slow revalidation can never overwrite a newer
//! `mutate`.
//!
//! Each write also schedules an eviction task that removes the entry
//! `cache_time` later unless a newer write replaced it first.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn, Instrument};

use super::dedup::{Dedup, RequestDeduplicator};
use super::entry::{CacheEntry, FailedFetch, Freshness};
use super::subscribers::{SubscriberRegistry, Subscription};
use super::{lock, CacheSettings, CacheStats, QueryOptions};
use crate::errors::FetchError;
use crate::retry::RetryExecutor;
use crate::spans;
use crate::types::cache::{CacheKey, Generation, QueryState};

/// Shared handle to a stale-while-revalidate cache
///
/// Cloning is cheap; clones share the same entries, in-flight fetches and
/// listeners. When the last handle is dropped, in-flight fetches are cancelled
/// and pending evictions become no-ops.
///
/// Writes schedule eviction tasks, so `get` and `mutate` must be called from
/// within a tokio runtime.
pub struct CacheStore<T> {
    inner: Arc<StoreInner<T>>,
}

impl<T> Clone for CacheStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct StoreInner<T> {
    state: Mutex<StoreState<T>>,
    dedup: RequestDeduplicator<T>,
    subscribers: SubscriberRegistry<T>,
    settings: CacheSettings,
    shutdown: CancellationToken,
}

struct StoreState<T> {
    entries: HashMap<CacheKey, CacheEntry<T>>,
    /// Error from the most recent failed fetch, cleared by the next write or
    /// evicted after `cache_time`
    errors: HashMap<CacheKey, FailedFetch>,
    last_generation: Generation,
    stats: CacheStats,
}

impl<T> StoreState<T> {
    fn next_generation(&mut self) -> Generation {
        self.last_generation = self.last_generation.next();
        self.last_generation
    }
}

enum Lookup<T> {
    Fresh(T),
    Stale(T),
    Miss,
}

impl<T> Drop for StoreInner<T> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl<T> CacheStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates an empty store with the given defaults
    pub fn new(settings: CacheSettings) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: Mutex::new(StoreState {
                    entries: HashMap::new(),
                    errors: HashMap::new(),
                    last_generation: Generation::default(),
                    stats: CacheStats::default(),
                }),
                dedup: RequestDeduplicator::new(),
                subscribers: SubscriberRegistry::new(),
                settings,
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Creates an empty store with default freshness windows and retries
    pub fn with_defaults() -> Self {
        Self::new(CacheSettings::default())
    }

    /// Store-wide defaults
    pub fn settings(&self) -> &CacheSettings {
        &self.inner.settings
    }

    /// Returns the value for `key`, fetching it if needed.
    ///
    /// - Fresh entry: returned without calling `fetcher`.
    /// - Stale entry: returned immediately; a background refetch starts unless
    ///   one is already in flight.
    /// - Missing or expired entry: awaits the in-flight fetch for `key`,
    ///   starting one if none exists.
    ///
    /// `fetcher` is retried under the resolved retry policy and receives a
    /// token that fires when the fetch is cancelled.
    pub async fn get<F, Fut>(
        &self,
        key: &CacheKey,
        fetcher: F,
        options: &QueryOptions,
    ) -> Result<T, FetchError>
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        let settings = self.inner.settings.resolve(options);

        match self.lookup(key) {
            Lookup::Fresh(data) => Ok(data),
            Lookup::Stale(data) => {
                if self.fetch(key, fetcher, settings).is_started() {
                    lock(&self.inner.state).stats.revalidations += 1;
                }
                Ok(data)
            }
            Lookup::Miss => self.fetch(key, fetcher, settings).into_shared().await,
        }
    }

    fn lookup(&self, key: &CacheKey) -> Lookup<T> {
        let now = Instant::now();
        let mut state = lock(&self.inner.state);
        let found = state
            .entries
            .get(key)
            .map(|entry| (entry.freshness(now), entry.data.clone()));

        match found {
            Some((Freshness::Fresh, data)) => {
                state.stats.hits += 1;
                trace!(key = %key, "Cache hit");
                Lookup::Fresh(data)
            }
            Some((Freshness::Stale, data)) => {
                state.stats.stale_hits += 1;
                debug!(key = %key, "Serving stale entry, revalidating");
                Lookup::Stale(data)
            }
            Some((Freshness::Expired, _)) => {
                state.entries.remove(key);
                state.stats.evictions += 1;
                state.stats.misses += 1;
                debug!(key = %key, "Entry expired");
                Lookup::Miss
            }
            None => {
                state.stats.misses += 1;
                debug!(key = %key, "Cache miss");
                Lookup::Miss
            }
        }
    }

    fn fetch<F, Fut>(&self, key: &CacheKey, fetcher: F, settings: CacheSettings) -> Dedup<T>
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        let store = Arc::downgrade(&self.inner);
        let task_key = key.clone();
        let (announced, announcement) = oneshot::channel::<()>();
        let mut started = None;

        let dedup = self.inner.dedup.run(key, &self.inner.shutdown, |cancel| {
            let started_from = lock(&self.inner.state)
                .entries
                .get(key)
                .map(|entry| entry.generation);
            started = Some(started_from);

            async move {
                // The fetch may not settle before `loading` has been delivered
                let _ = announcement.await;

                let executor = RetryExecutor::new(settings.retry.clone());
                let result = executor
                    .run(&cancel, |_| fetcher(cancel.clone()))
                    .instrument(spans::cache_fetch(&task_key))
                    .await;

                match store.upgrade() {
                    Some(inner) => inner.commit(&task_key, started_from, result, &settings),
                    None => result,
                }
            }
        });

        if let Some(started_from) = started {
            self.announce_loading(key, started_from);
        }
        let _ = announced.send(());
        dedup
    }

    /// Notifies `loading` for a fetch that just started, unless a write
    /// already superseded it
    fn announce_loading(&self, key: &CacheKey, started_from: Option<Generation>) {
        let current = {
            let state = lock(&self.inner.state);
            let entry = state.entries.get(key);
            if entry.map(|e| e.generation) != started_from {
                trace!(key = %key, "Fetch superseded before it was announced");
                return;
            }
            entry.map(|e| e.data.clone())
        };
        self.inner
            .subscribers
            .notify(key, &QueryState::loading(current));
    }

    /// Writes `data` directly, marks it fresh and notifies subscribers.
    ///
    /// Any fetch for `key` already in flight will have its result discarded.
    pub fn mutate(&self, key: &CacheKey, data: T) {
        {
            let mut state = lock(&self.inner.state);
            self.inner
                .write(&mut state, key, data.clone(), &self.inner.settings);
        }
        debug!(key = %key, "Cache entry mutated");
        self.inner.subscribers.notify(key, &QueryState::ready(data));
    }

    /// Removes the entry for `key` and cancels any fetch in flight for it.
    /// Subscribers are not notified. Returns whether an entry was removed.
    pub fn delete(&self, key: &CacheKey) -> bool {
        let removed = {
            let mut state = lock(&self.inner.state);
            state.errors.remove(key);
            state.entries.remove(key)
        };
        self.inner.dedup.cancel(key);
        debug!(key = %key, removed = removed.is_some(), "Cache entry deleted");
        removed.is_some()
    }

    /// Removes every entry and cancels every fetch in flight
    pub fn clear(&self) {
        let removed = {
            let mut state = lock(&self.inner.state);
            state.errors.clear();
            std::mem::take(&mut state.entries)
        };
        let cancelled = self.inner.dedup.cancel_all();
        debug!(entries = removed.len(), cancelled, "Cache cleared");
    }

    /// Marks the entry for `key` stale without evicting it. The next `get`
    /// serves it and revalidates in the background.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        match lock(&self.inner.state).entries.get_mut(key) {
            Some(entry) => {
                entry.is_stale = true;
                true
            }
            None => false,
        }
    }

    /// Marks every entry stale. Returns the number of entries marked.
    pub fn invalidate_all(&self) -> usize {
        let mut state = lock(&self.inner.state);
        for entry in state.entries.values_mut() {
            entry.is_stale = true;
        }
        let count = state.entries.len();
        debug!(entries = count, "Invalidated all entries");
        count
    }

    /// Returns the value for `key` only if it is fresh. Never fetches.
    pub fn peek(&self, key: &CacheKey) -> Option<T> {
        let now = Instant::now();
        let state = lock(&self.inner.state);
        state
            .entries
            .get(key)
            .filter(|entry| entry.freshness(now) == Freshness::Fresh)
            .map(|entry| entry.data.clone())
    }

    /// Current `(data, error, isLoading)` for `key`, for late subscribers
    pub fn snapshot(&self, key: &CacheKey) -> QueryState<T> {
        let now = Instant::now();
        let (data, error) = {
            let state = lock(&self.inner.state);
            let data = state
                .entries
                .get(key)
                .filter(|entry| entry.freshness(now) != Freshness::Expired)
                .map(|entry| entry.data.clone());
            (data, state.errors.get(key).map(|failed| failed.error.clone()))
        };
        QueryState {
            data,
            error,
            is_loading: self.inner.dedup.is_pending(key),
        }
    }

    /// Cancels the fetch in flight for `key`, if any. Cached data is kept.
    pub fn cancel(&self, key: &CacheKey) -> bool {
        self.inner.dedup.cancel(key)
    }

    /// Registers a listener for updates to `key`
    pub fn subscribe<F>(&self, key: &CacheKey, listener: F) -> Subscription
    where
        F: Fn(&QueryState<T>) + Send + Sync + 'static,
    {
        self.inner.subscribers.subscribe(key.clone(), listener)
    }

    /// Removes a listener. Safe to call from inside a notification.
    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        self.inner.subscribers.unsubscribe(subscription)
    }

    /// Number of listeners registered for `key`
    pub fn listener_count(&self, key: &CacheKey) -> usize {
        self.inner.subscribers.listener_count(key)
    }

    /// Current statistics
    pub fn stats(&self) -> CacheStats {
        let state = lock(&self.inner.state);
        CacheStats {
            entries: state.entries.len(),
            ..state.stats.clone()
        }
    }
}

impl<T> StoreInner<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Inserts a new entry, replacing (and un-scheduling) any previous one
    fn write(
        self: &Arc<Self>,
        state: &mut StoreState<T>,
        key: &CacheKey,
        data: T,
        settings: &CacheSettings,
    ) -> Generation {
        let generation = state.next_generation();
        let mut entry = CacheEntry::new(data, generation, settings.stale_time, settings.cache_time);
        entry.eviction = Some(self.schedule_eviction(key.clone(), generation, settings.cache_time));
        state.entries.insert(key.clone(), entry);
        state.errors.remove(key);
        generation
    }

    fn schedule_eviction(
        self: &Arc<Self>,
        key: CacheKey,
        generation: Generation,
        after: Duration,
    ) -> AbortHandle {
        let store = Arc::downgrade(self);
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            if let Some(inner) = store.upgrade() {
                inner.evict(&key, generation);
            }
        })
        .abort_handle()
    }

    fn evict(&self, key: &CacheKey, generation: Generation) {
        let mut state = lock(&self.state);
        if state
            .entries
            .get(key)
            .is_some_and(|entry| entry.generation == generation)
        {
            state.entries.remove(key);
            state.errors.remove(key);
            state.stats.evictions += 1;
            debug!(key = %key, generation = generation.get(), "Evicted entry");
        } else if state
            .errors
            .get(key)
            .is_some_and(|failed| failed.generation == generation)
        {
            state.errors.remove(key);
            trace!(key = %key, "Expired failed fetch");
        }
    }

    /// Applies a settled fetch to the store and notifies subscribers.
    ///
    /// If the entry was written, deleted or evicted since the fetch started,
    /// the outcome is dropped and the caller receives the current data
    /// instead, when there is any.
    fn commit(
        self: &Arc<Self>,
        key: &CacheKey,
        started_from: Option<Generation>,
        result: Result<T, FetchError>,
        settings: &CacheSettings,
    ) -> Result<T, FetchError> {
        if matches!(&result, Err(error) if error.is_aborted()) {
            trace!(key = %key, "Fetch aborted");
            return result;
        }

        let update = {
            let mut state = lock(&self.state);
            let current = state.entries.get(key).map(|entry| entry.generation);
            if current != started_from {
                state.stats.discarded_writes += 1;
                debug!(key = %key, "Discarding superseded fetch result");
                return match state.entries.get(key) {
                    Some(entry) => Ok(entry.data.clone()),
                    None => result,
                };
            }

            match &result {
                Ok(data) => {
                    self.write(&mut state, key, data.clone(), settings);
                    QueryState::ready(data.clone())
                }
                Err(error) => {
                    warn!(key = %key, error = %error, "Fetch failed");
                    let generation = state.next_generation();
                    let eviction =
                        self.schedule_eviction(key.clone(), generation, settings.cache_time);
                    state.errors.insert(
                        key.clone(),
                        FailedFetch {
                            error: error.clone(),
                            generation,
                            eviction: Some(eviction),
                        },
                    );
                    let data = state.entries.get(key).map(|entry| entry.data.clone());
                    QueryState::failed(data, error.clone())
                }
            }
        };

        self.subscribers.notify(key, &update);
        result
    }
}
