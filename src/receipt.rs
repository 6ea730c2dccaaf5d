// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Mint transaction confirmation
//!
//! The mint flow's `confirming` state waits on a [`ReceiptPoller`].
//! [`ProviderReceiptPoller`] implements it over any alloy [`Provider`] by
//! polling `eth_getTransactionReceipt` until the receipt appears or the
//! timeout elapses.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use alloy_network::{Ethereum, Network, ReceiptResponse};
use alloy_primitives::TxHash;
use alloy_provider::Provider;
use async_trait::async_trait;
use tokio::time::{sleep, Instant};
use tracing::{debug, trace};

use crate::config::constants::{DEFAULT_RECEIPT_POLL_INTERVAL, DEFAULT_RECEIPT_TIMEOUT};
use crate::errors::FetchError;

/// Inclusion of a mint transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmation {
    /// Block the transaction was included in
    pub block_number: u64,
}

/// Waits for a submitted transaction to be included
#[async_trait]
pub trait ReceiptPoller: Send + Sync {
    /// Resolves once `tx_hash` is included.
    ///
    /// A transaction that was included but failed resolves to
    /// [`FetchError::ContractReverted`]; one that is not included in time
    /// resolves to [`FetchError::Timeout`].
    async fn wait_for_confirmation(&self, tx_hash: TxHash) -> Result<Confirmation, FetchError>;
}

#[async_trait]
impl<R> ReceiptPoller for Arc<R>
where
    R: ReceiptPoller + ?Sized,
{
    async fn wait_for_confirmation(&self, tx_hash: TxHash) -> Result<Confirmation, FetchError> {
        (**self).wait_for_confirmation(tx_hash).await
    }
}

/// [`ReceiptPoller`] backed by an alloy provider
pub struct ProviderReceiptPoller<P, N = Ethereum> {
    provider: P,
    interval: Duration,
    timeout: Duration,
    _network: PhantomData<fn() -> N>,
}

impl<P, N> ProviderReceiptPoller<P, N>
where
    P: Provider<N>,
    N: Network,
{
    /// Creates a poller with the default interval (2s) and timeout (120s)
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            interval: DEFAULT_RECEIPT_POLL_INTERVAL,
            timeout: DEFAULT_RECEIPT_TIMEOUT,
            _network: PhantomData,
        }
    }

    /// Sets the delay between receipt lookups
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets how long to wait before giving up
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl<P, N> ReceiptPoller for ProviderReceiptPoller<P, N>
where
    P: Provider<N> + Send + Sync,
    N: Network,
{
    async fn wait_for_confirmation(&self, tx_hash: TxHash) -> Result<Confirmation, FetchError> {
        let deadline = Instant::now() + self.timeout;
        let mut polls = 0u32;

        loop {
            polls += 1;
            match self.provider.get_transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => {
                    if !receipt.status() {
                        return Err(FetchError::ContractReverted {
                            message: "mint transaction failed on-chain".to_string(),
                            detail: Some(format!("receipt status 0 for {tx_hash}")),
                        });
                    }
                    if let Some(block_number) = receipt.block_number() {
                        debug!(%tx_hash, block_number, polls, "Transaction confirmed");
                        return Ok(Confirmation { block_number });
                    }
                    trace!(%tx_hash, "Receipt has no block number yet");
                }
                Ok(None) => trace!(%tx_hash, polls, "Receipt not available yet"),
                // Transient RPC failures do not end the wait; the deadline does
                Err(err) => debug!(%tx_hash, error = %err, "Receipt lookup failed"),
            }

            if Instant::now() + self.interval > deadline {
                debug!(%tx_hash, polls, "Gave up waiting for receipt");
                return Err(FetchError::Timeout);
            }
            sleep(self.interval).await;
        }
    }
}
