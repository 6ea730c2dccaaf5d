// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Test helpers for tokengate integration tests
//!
//! Provides mock implementations of the backend, receipt poller, and wallet
//! approval seams so the gate and the mint flow can be driven without a
//! network or a chain.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use alloy_primitives::{TxHash, U256};
use async_trait::async_trait;
use chrono::Utc;
use tokengate::receipt::{Confirmation, ReceiptPoller};
use tokengate::transport::AccessBackend;
use tokengate::{AccessRecord, ApprovalProvider, FetchError, MintSubmission, WalletAddress};

pub const ADDRESS: &str = "0x00000000000000000000000000000000000000aa";
pub const OTHER_ADDRESS: &str = "0x00000000000000000000000000000000000000bb";

pub fn address() -> WalletAddress {
    WalletAddress::parse(ADDRESS).unwrap()
}

/// Submission returned by [`MockBackend::mint`] unless scripted otherwise
pub fn submission() -> MintSubmission {
    MintSubmission {
        tx_hash: TxHash::repeat_byte(0x11),
        token_id: U256::from(7),
    }
}

/// Scripted backend
///
/// Each call pops the next scripted result; when the script is empty, access
/// checks answer `default_access` and mints succeed with [`submission`].
///
/// # Example
///
/// ```rust,ignore
/// let backend = Arc::new(MockBackend::granting().with_delay(Duration::from_millis(100)));
/// backend.push_access(Err(FetchError::network("reset")));
///
/// let gate = AccessGate::new(CacheStore::with_defaults(), backend.clone());
/// assert!(gate.check_access(ADDRESS).await);
/// assert_eq!(backend.access_calls(), 2);
/// ```
pub struct MockBackend {
    default_access: bool,
    access: Mutex<VecDeque<Result<bool, FetchError>>>,
    mints: Mutex<VecDeque<Result<MintSubmission, FetchError>>>,
    delay: Duration,
    access_calls: AtomicUsize,
    mint_calls: AtomicUsize,
}

impl MockBackend {
    /// Backend that denies access by default
    pub fn denying() -> Self {
        Self {
            default_access: false,
            access: Mutex::new(VecDeque::new()),
            mints: Mutex::new(VecDeque::new()),
            delay: Duration::ZERO,
            access_calls: AtomicUsize::new(0),
            mint_calls: AtomicUsize::new(0),
        }
    }

    /// Backend that grants access by default
    pub fn granting() -> Self {
        Self {
            default_access: true,
            ..Self::denying()
        }
    }

    /// Delay every call by `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn push_access(&self, result: Result<bool, FetchError>) {
        self.access.lock().unwrap().push_back(result);
    }

    pub fn push_mint(&self, result: Result<MintSubmission, FetchError>) {
        self.mints.lock().unwrap().push_back(result);
    }

    pub fn access_calls(&self) -> usize {
        self.access_calls.load(Ordering::SeqCst)
    }

    pub fn mint_calls(&self) -> usize {
        self.mint_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccessBackend for MockBackend {
    async fn check_access(&self, address: &WalletAddress) -> Result<AccessRecord, FetchError> {
        self.access_calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.access.lock().unwrap().pop_front();
        next.unwrap_or(Ok(self.default_access))
            .map(|has_access| AccessRecord {
                address: *address,
                has_access,
                balance: Some(U256::from(has_access as u8)),
                checked_at: Utc::now(),
            })
    }

    async fn mint(&self, _address: &WalletAddress) -> Result<MintSubmission, FetchError> {
        self.mint_calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.mints.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(submission()))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Receipt poller that confirms after `delay` in block 100, or fails with a
/// configured error
pub struct MockReceiptPoller {
    outcome: Result<Confirmation, FetchError>,
    delay: Duration,
    calls: AtomicUsize,
}

impl MockReceiptPoller {
    pub fn confirming() -> Self {
        Self {
            outcome: Ok(Confirmation { block_number: 100 }),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: FetchError) -> Self {
        Self {
            outcome: Err(error),
            ..Self::confirming()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReceiptPoller for MockReceiptPoller {
    async fn wait_for_confirmation(&self, _tx_hash: TxHash) -> Result<Confirmation, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.outcome.clone()
    }
}

/// Wallet that declines every approval request
pub struct RejectingWallet;

#[async_trait]
impl ApprovalProvider for RejectingWallet {
    async fn request_approval(&self, _address: &WalletAddress) -> Result<(), FetchError> {
        Err(FetchError::UserRejected {
            message: "user declined in wallet".to_string(),
        })
    }
}
