// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Environment-driven revalidation
//!
//! When the host regains foreground visibility or network connectivity,
//! cached answers may be out of date. The scheduler reacts by marking every
//! entry stale; it never evicts and never fetches. The next `get` on a key
//! then serves the old value and refetches in the background.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::store::CacheStore;

/// A change in the host environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentSignal {
    /// The host became visible (`true`) or hidden (`false`)
    Visibility(bool),
    /// The host went online (`true`) or offline (`false`)
    Connectivity(bool),
}

/// Marks cache entries stale when visibility or connectivity is regained
pub struct RevalidationScheduler<T> {
    store: CacheStore<T>,
    visible: bool,
    online: bool,
}

impl<T> RevalidationScheduler<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a scheduler for `store`. The environment is assumed visible
    /// and online until told otherwise.
    pub fn new(store: CacheStore<T>) -> Self {
        Self {
            store,
            visible: true,
            online: true,
        }
    }

    /// Applies one signal. Returns `true` if it invalidated the store.
    ///
    /// Only a false-to-true transition counts as "regained"; repeated
    /// `true` signals do nothing.
    pub fn handle_signal(&mut self, signal: EnvironmentSignal) -> bool {
        let regained = match signal {
            EnvironmentSignal::Visibility(now) => {
                let regained = now && !self.visible;
                self.visible = now;
                regained
            }
            EnvironmentSignal::Connectivity(now) => {
                let regained = now && !self.online;
                self.online = now;
                regained
            }
        };

        if regained {
            let marked = self.store.invalidate_all();
            info!(?signal, entries = marked, "Environment regained, entries marked stale");
        } else {
            debug!(?signal, "Environment signal ignored");
        }
        regained
    }

    /// Consumes signals from `signals` on a background task until the sender
    /// side closes or the returned handle is stopped.
    pub fn spawn(mut self, mut signals: mpsc::Receiver<EnvironmentSignal>) -> RevalidationHandle {
        let stop = CancellationToken::new();
        let token = stop.clone();
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    signal = signals.recv() => match signal {
                        Some(signal) => {
                            self.handle_signal(signal);
                        }
                        None => break,
                    },
                }
            }
            debug!("Revalidation listener stopped");
        });
        RevalidationHandle { stop, task }
    }
}

/// Handle to a running revalidation listener
pub struct RevalidationHandle {
    stop: CancellationToken,
    task: JoinHandle<()>,
}

impl RevalidationHandle {
    /// Stops the listener and waits for it to exit
    pub async fn stop(self) {
        self.stop.cancel();
        // The task only exits through its loop; a join error means it panicked
        if let Err(err) = self.task.await {
            debug!(error = %err, "Revalidation listener ended abnormally");
        }
    }

    /// Whether the listener has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
