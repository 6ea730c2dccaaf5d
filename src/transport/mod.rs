// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Backend transport for the access-check and mint endpoints.
//!
//! The backend is an opaque request/response contract:
//!
//! ```text
//! GET  {base}/access-check?address=0x…  -> { hasAccess, balance, address, checkedAt }
//! POST {base}/mint  { address }         -> { success, txHash, tokenId }
//! any non-2xx                           -> { error }
//! ```
//!
//! [`AccessBackend`] is the seam the gate and the mint flow call through.
//! [`HttpBackend`] speaks the contract above over `reqwest`, and
//! [`LoggingBackend`] decorates any backend with `tracing` output.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tokengate::transport::{HttpBackend, LoggingBackend};
//!
//! let backend = LoggingBackend::new(HttpBackend::from_config(&config)?);
//! let record = backend.check_access(&address).await?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::FetchError;
use crate::types::access::AccessRecord;
use crate::types::address::WalletAddress;
use crate::types::mint::MintSubmission;

mod http;
mod logging;

pub use http::HttpBackend;
pub use logging::LoggingBackend;

/// Access-check and mint endpoints
///
/// Implementations perform exactly one request per call; retries belong to
/// the caller's [`crate::RetryExecutor`].
#[async_trait]
pub trait AccessBackend: Send + Sync {
    /// Asks whether `address` currently holds the gating token
    async fn check_access(&self, address: &WalletAddress) -> Result<AccessRecord, FetchError>;

    /// Submits a mint of the gating token to `address`
    ///
    /// Resolves once the backend has accepted the transaction; inclusion is
    /// confirmed separately.
    async fn mint(&self, address: &WalletAddress) -> Result<MintSubmission, FetchError>;

    /// Returns a human-readable name for this backend
    ///
    /// Used for logging and debugging.
    fn name(&self) -> &'static str;
}

#[async_trait]
impl<B> AccessBackend for Arc<B>
where
    B: AccessBackend + ?Sized,
{
    async fn check_access(&self, address: &WalletAddress) -> Result<AccessRecord, FetchError> {
        (**self).check_access(address).await
    }

    async fn mint(&self, address: &WalletAddress) -> Result<MintSubmission, FetchError> {
        (**self).mint(address).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
