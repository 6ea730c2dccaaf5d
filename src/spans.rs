//! Span creation helpers for tokengate operations.
//!
//! Each instrumented operation has a span helper here instead of an
//! `#[instrument]` attribute on the function, keeping telemetry out of the
//! business logic. Async callers attach the span with
//! [`tracing::Instrument`]:
//!
//! ```rust,ignore
//! async move { /* work */ }
//!     .instrument(spans::cache_fetch(&key))
//!     .await
//! ```

use alloy_primitives::TxHash;
use tracing::{Level, Span};

use crate::types::address::WalletAddress;
use crate::types::cache::CacheKey;

/// Create span for one access check through the gate.
///
/// Parent: None (root span for this operation)
/// Children: cache_fetch span on a miss or stale hit
#[inline]
pub(crate) fn check_access(address: &WalletAddress) -> Span {
    tracing::span!(Level::INFO, "tokengate.check_access", address = %address)
}

/// Create span for one deduplicated cache fetch, covering all retry attempts.
///
/// Parent: None (runs on its own task)
/// Children: backend_call spans (one per attempt)
#[inline]
pub(crate) fn cache_fetch(key: &CacheKey) -> Span {
    tracing::debug_span!("tokengate.cache_fetch", key = %key)
}

/// Create span for one mint operation from `preparing` to a terminal state.
///
/// Parent: None (root span for this operation)
/// Children: backend_call and confirm_receipt spans
#[inline]
pub(crate) fn mint(operation: u64, address: &str) -> Span {
    tracing::span!(
        Level::INFO,
        "tokengate.mint",
        operation = operation,
        address = address,
    )
}

/// Create span for a single backend request.
///
/// Parent: cache_fetch or mint span
#[inline]
pub(crate) fn backend_call(endpoint: &'static str, address: &WalletAddress) -> Span {
    tracing::debug_span!(
        "tokengate.backend_call",
        endpoint = endpoint,
        address = %address,
    )
}

/// Create span for waiting on a mint transaction receipt.
///
/// Parent: mint span
#[inline]
pub(crate) fn confirm_receipt(tx_hash: TxHash) -> Span {
    tracing::debug_span!("tokengate.confirm_receipt", tx_hash = %tx_hash)
}
