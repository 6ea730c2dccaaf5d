// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Resilient data synchronization for token-gated access.
//!
//! - [`CacheStore`]: stale-while-revalidate cache with request deduplication,
//!   per-key subscribers, generation-tagged writes and scheduled eviction
//! - [`RetryExecutor`]: cancellable retries with error-class-aware
//!   short-circuiting
//! - [`AccessGate`]: "does address X have access", degrading to `false`
//! - [`MintFlow`]: the multi-state mint lifecycle, cancellable at any point
//!
//! The backend is reached through [`transport::AccessBackend`] and mint
//! confirmation through [`receipt::ReceiptPoller`].

pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod errors;
mod gate;
mod mint;
pub mod receipt;
mod retry;
mod spans;
pub mod transport;
pub mod types;

pub use cache::{
    CacheSettings, CacheStats, CacheStore, EnvironmentSignal, QueryOptions, RevalidationHandle,
    RevalidationScheduler, Subscription,
};
pub use config::{SyncConfig, SyncConfigBuilder};
pub use errors::{
    AddressError, ConfigError, FetchError, MintError, MintErrorCode, TokenGateError,
};
pub use gate::{access_key, AccessCheck, AccessGate};
pub use mint::{ApprovalProvider, AutoApprove, MintFlow};
pub use retry::{Backoff, RetryExecutor, RetryPolicy, Retryable};
pub use types::access::AccessRecord;
pub use types::address::WalletAddress;
pub use types::cache::{CacheKey, Generation, QueryState};
pub use types::mint::{MintResult, MintSnapshot, MintState, MintSubmission};
