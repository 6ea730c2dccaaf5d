// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Mint operation state machine
//!
//! [`MintFlow`] drives one mint at a time through
//! `preparing -> awaiting_approval -> minting -> confirming -> success`,
//! or into `error` with a classified [`MintError`](crate::MintError).
//!
//! Every operation gets an id and a cancellation token. Starting a new mint or
//! calling [`MintFlow::reset`] cancels the running operation: its pending
//! retries stop, and any transition it attempts afterwards is dropped because
//! the published snapshot already belongs to a newer operation. Cancellation
//! is silent; it never produces an `error` state.
//!
//! On success the recipient's access record is written into the shared access
//! cache, so the gate reports access without another backend round trip.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};

use crate::cache::{lock, CacheStore};
use crate::errors::FetchError;
use crate::gate::access_key;
use crate::receipt::ReceiptPoller;
use crate::retry::{RetryExecutor, RetryPolicy};
use crate::spans;
use crate::transport::AccessBackend;
use crate::types::access::AccessRecord;
use crate::types::address::WalletAddress;
use crate::types::mint::{MintResult, MintSnapshot, MintState};

mod approval;
mod classify;

pub use approval::{ApprovalProvider, AutoApprove};

struct ActiveOperation {
    id: u64,
    cancel: CancellationToken,
}

/// Drives mint operations and publishes their state
///
/// # Example
///
/// ```rust,ignore
/// use tokengate::{AccessGate, MintFlow, MintState};
///
/// let flow = MintFlow::new(backend.clone(), poller, gate.store().clone());
/// let mut updates = flow.subscribe();
///
/// let snapshot = flow.mint("0x…").await;
/// if snapshot.state == MintState::Success {
///     assert!(gate.check_access("0x…").await);
/// }
/// ```
pub struct MintFlow<B, R, A = AutoApprove> {
    backend: Arc<B>,
    receipts: Arc<R>,
    approval: Arc<A>,
    access_cache: CacheStore<AccessRecord>,
    retry: RetryExecutor,
    state: watch::Sender<MintSnapshot>,
    active: Mutex<Option<ActiveOperation>>,
    next_operation: AtomicU64,
}

impl<B, R> MintFlow<B, R, AutoApprove>
where
    B: AccessBackend,
    R: ReceiptPoller,
{
    /// Creates a flow that needs no wallet approval and retries submissions
    /// with the mint policy (3 attempts, linear backoff from 1000ms)
    pub fn new(backend: B, receipts: R, access_cache: CacheStore<AccessRecord>) -> Self {
        let (state, _) = watch::channel(MintSnapshot::default());
        Self {
            backend: Arc::new(backend),
            receipts: Arc::new(receipts),
            approval: Arc::new(AutoApprove),
            access_cache,
            retry: RetryExecutor::new(RetryPolicy::mint()),
            state,
            active: Mutex::new(None),
            next_operation: AtomicU64::new(0),
        }
    }
}

impl<B, R, A> MintFlow<B, R, A>
where
    B: AccessBackend,
    R: ReceiptPoller,
    A: ApprovalProvider,
{
    /// Replaces the wallet approval step
    pub fn with_approval<A2: ApprovalProvider>(self, approval: A2) -> MintFlow<B, R, A2> {
        MintFlow {
            backend: self.backend,
            receipts: self.receipts,
            approval: Arc::new(approval),
            access_cache: self.access_cache,
            retry: self.retry,
            state: self.state,
            active: self.active,
            next_operation: self.next_operation,
        }
    }

    /// Replaces the retry policy for mint submissions
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = RetryExecutor::new(policy);
        self
    }

    /// Current snapshot
    pub fn state(&self) -> MintSnapshot {
        self.state.borrow().clone()
    }

    /// Receives a snapshot on every transition
    pub fn subscribe(&self) -> watch::Receiver<MintSnapshot> {
        self.state.subscribe()
    }

    /// Runs a mint to `address` and returns the snapshot it ended in.
    ///
    /// A mint already running is cancelled first. If this operation is itself
    /// cancelled, the returned snapshot is whatever superseded it.
    pub async fn mint(&self, address: &str) -> MintSnapshot {
        let (id, cancel) = self.begin();

        self.run(id, &cancel, address)
            .instrument(spans::mint(id, address))
            .await;

        let mut active = lock(&self.active);
        if active.as_ref().is_some_and(|op| op.id == id) {
            *active = None;
        }
        drop(active);

        self.state()
    }

    /// Cancels the running operation, if any, and returns to `idle`.
    ///
    /// No further attempt is made and no further snapshot is published for
    /// the cancelled operation.
    pub fn reset(&self) {
        let previous = lock(&self.active).take();
        if let Some(previous) = previous {
            debug!(operation = previous.id, "Cancelling mint operation");
            previous.cancel.cancel();
        }
        let id = self.next_operation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_replace(MintSnapshot::idle(id));
    }

    fn begin(&self) -> (u64, CancellationToken) {
        let id = self.next_operation.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancellationToken::new();

        let previous = lock(&self.active).replace(ActiveOperation {
            id,
            cancel: cancel.clone(),
        });
        if let Some(previous) = previous {
            debug!(operation = previous.id, superseded_by = id, "Cancelling mint operation");
            previous.cancel.cancel();
        }

        self.state.send_replace(MintSnapshot::idle(id));
        (id, cancel)
    }

    async fn run(&self, id: u64, cancel: &CancellationToken, address: &str) {
        if !self.transition(id, MintState::Preparing, |_| {}) {
            return;
        }
        let address = match WalletAddress::parse(address) {
            Ok(address) => address,
            Err(err) => return self.fail(id, &FetchError::from(err)),
        };

        if !self.transition(id, MintState::AwaitingApproval, |_| {}) {
            return;
        }
        let approved = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Aborted),
            result = self.approval.request_approval(&address) => result,
        };
        if let Err(err) = approved {
            return self.fail(id, &err);
        }

        if !self.transition(id, MintState::Minting, |_| {}) {
            return;
        }
        let backend = &self.backend;
        let submitted = self
            .retry
            .run(cancel, |attempt| {
                debug!(attempt, "Submitting mint");
                backend.mint(&address)
            })
            .await;
        let submission = match submitted {
            Ok(submission) => submission,
            Err(err) => return self.fail(id, &err),
        };

        if !self.transition(id, MintState::Confirming, |snapshot| {
            snapshot.tx_hash = Some(submission.tx_hash);
        }) {
            return;
        }
        let confirmed = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Aborted),
            result = self
                .receipts
                .wait_for_confirmation(submission.tx_hash)
                .instrument(spans::confirm_receipt(submission.tx_hash)) => result,
        };
        let confirmation = match confirmed {
            Ok(confirmation) => confirmation,
            Err(err) => return self.fail(id, &err),
        };

        // The token exists on-chain whether or not this operation is still current
        self.access_cache
            .mutate(&access_key(&address), AccessRecord::granted_by_mint(address));

        let result = MintResult {
            token_id: submission.token_id,
            transaction_hash: submission.tx_hash,
            block_number: confirmation.block_number,
        };
        self.transition(id, MintState::Success, |snapshot| {
            snapshot.result = Some(result);
        });
    }

    /// Applies `next` if operation `id` is still current and the move is
    /// legal. Returns whether it was applied.
    fn transition(&self, id: u64, next: MintState, update: impl FnOnce(&mut MintSnapshot)) -> bool {
        let mut rejected_from = None;
        let applied = self.state.send_if_modified(|snapshot| {
            if snapshot.operation != id {
                return false;
            }
            if !snapshot.state.can_transition_to(next) {
                rejected_from = Some(snapshot.state);
                return false;
            }
            snapshot.state = next;
            update(snapshot);
            true
        });

        if applied {
            info!(operation = id, state = %next, "Mint state changed");
        } else if let Some(from) = rejected_from {
            warn!(operation = id, from = %from, to = %next, "Illegal mint transition ignored");
        } else {
            debug!(operation = id, state = %next, "Dropping transition for superseded operation");
        }
        applied
    }

    fn fail(&self, id: u64, error: &FetchError) {
        if error.is_aborted() {
            debug!(operation = id, "Mint operation aborted");
            return;
        }
        let classified = classify::classify(error);
        warn!(operation = id, code = %classified.code, error = %error, "Mint failed");
        self.transition(id, MintState::Error, |snapshot| {
            snapshot.error = Some(classified);
        });
    }
}
