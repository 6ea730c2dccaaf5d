// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Per-key fan-out of query state to listeners

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::trace;

use super::lock;
use crate::types::cache::{CacheKey, QueryState};

/// Callback receiving `(data, error, isLoading)` updates for one key
pub type Listener<T> = Arc<dyn Fn(&QueryState<T>) + Send + Sync>;

/// Identifier of one registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Handle returned by `subscribe`, used to unsubscribe
///
/// Dropping the handle does not remove the listener; listeners live until
/// explicitly unsubscribed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub(crate) key: CacheKey,
    pub(crate) id: SubscriptionId,
}

impl Subscription {
    /// The key this subscription listens on
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// The listener identifier
    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

struct RegistryState<T> {
    listeners: HashMap<CacheKey, Vec<(SubscriptionId, Listener<T>)>>,
    next_id: u64,
}

/// Registry of listeners keyed by cache key
///
/// Notification copies the listener list before invoking anything, so a
/// listener may subscribe or unsubscribe (itself or others) from inside its
/// callback without deadlocking. Changes made during a notification take
/// effect from the next notification.
pub struct SubscriberRegistry<T> {
    state: Mutex<RegistryState<T>>,
}

impl<T> SubscriberRegistry<T> {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState {
                listeners: HashMap::new(),
                next_id: 0,
            }),
        }
    }

    /// Registers a listener for `key`
    pub fn subscribe<F>(&self, key: CacheKey, listener: F) -> Subscription
    where
        F: Fn(&QueryState<T>) + Send + Sync + 'static,
    {
        let mut state = lock(&self.state);
        let id = SubscriptionId(state.next_id);
        state.next_id += 1;
        state
            .listeners
            .entry(key.clone())
            .or_default()
            .push((id, Arc::new(listener)));
        trace!(key = %key, id = id.0, "Listener subscribed");
        Subscription { key, id }
    }

    /// Removes a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        let mut state = lock(&self.state);
        let Some(listeners) = state.listeners.get_mut(&subscription.key) else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|(id, _)| *id != subscription.id);
        let removed = listeners.len() != before;
        if listeners.is_empty() {
            state.listeners.remove(&subscription.key);
        }
        removed
    }

    /// Delivers `update` to every listener registered for `key`
    pub fn notify(&self, key: &CacheKey, update: &QueryState<T>) {
        let listeners: Vec<Listener<T>> = {
            let state = lock(&self.state);
            match state.listeners.get(key) {
                Some(listeners) => listeners.iter().map(|(_, l)| Arc::clone(l)).collect(),
                None => return,
            }
        };

        trace!(
            key = %key,
            listeners = listeners.len(),
            is_loading = update.is_loading,
            "Notifying listeners"
        );
        for listener in listeners {
            listener(update);
        }
    }

    /// Number of listeners registered for `key`
    pub fn listener_count(&self, key: &CacheKey) -> usize {
        lock(&self.state).listeners.get(key).map_or(0, Vec::len)
    }
}

impl<T> Default for SubscriberRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
