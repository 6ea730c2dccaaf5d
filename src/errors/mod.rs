// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for the tokengate library.
//!
//! Each concern has its own error type so callers can match on exactly the
//! failures they care about:
//!
//! - [`FetchError`] - failures talking to the access and mint endpoints, the
//!   wallet, or the receipt poller. Cloneable so a single deduplicated fetch
//!   can hand the same error to every waiter.
//! - [`MintError`] - the classified `{code, message}` payload carried by the
//!   mint flow's `error` state.
//! - [`AddressError`] - local wallet address validation failures.
//! - [`ConfigError`] - invalid configuration values.
//!
//! [`TokenGateError`] wraps all of them for code that does not need to tell
//! the sources apart.

mod address;
mod config;
mod fetch;
mod mint;

pub use address::AddressError;
pub use config::ConfigError;
pub use fetch::FetchError;
pub use mint::{MintError, MintErrorCode};

/// Unified error type for all tokengate operations.
///
/// All module-specific error types convert into `TokenGateError` via `From`,
/// so `?` propagates them naturally.
#[derive(Debug, thiserror::Error)]
pub enum TokenGateError {
    /// Error from a backend, wallet, or receipt call.
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Mint flow ended in the `error` state.
    #[error("Mint error: {0}")]
    Mint(#[from] MintError),

    /// Wallet address failed validation.
    #[error("Address error: {0}")]
    Address(#[from] AddressError),

    /// Configuration could not be loaded or validated.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Output could not be serialized.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
