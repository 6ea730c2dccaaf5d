// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Logging decorator for [`AccessBackend`] implementations.
//!
//! Records every backend call with `tracing`: timing always, payloads on
//! request, and a warning for each failed call.

use std::fmt::Debug;
use std::future::Future;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, trace, warn};

use super::AccessBackend;
use crate::errors::FetchError;
use crate::types::access::AccessRecord;
use crate::types::address::WalletAddress;
use crate::types::mint::MintSubmission;

/// Wraps a backend and logs each call.
///
/// # Example
///
/// ```rust,ignore
/// use tokengate::transport::{HttpBackend, LoggingBackend};
///
/// let backend = LoggingBackend::new(HttpBackend::from_config(&config)?).verbose();
/// ```
#[derive(Clone, Debug)]
pub struct LoggingBackend<B> {
    inner: B,
    /// Whether to log the address sent with each call
    log_requests: bool,
    /// Whether to log decoded response bodies
    log_responses: bool,
}

impl<B> LoggingBackend<B> {
    /// Wraps `inner`. By default only timing and errors are logged.
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            log_requests: false,
            log_responses: false,
        }
    }

    /// Enables logging of request parameters.
    pub fn with_request_logging(mut self) -> Self {
        self.log_requests = true;
        self
    }

    /// Enables logging of response bodies.
    pub fn with_response_logging(mut self) -> Self {
        self.log_responses = true;
        self
    }

    /// Enables logging of both requests and responses.
    pub fn verbose(mut self) -> Self {
        self.log_requests = true;
        self.log_responses = true;
        self
    }

    /// The wrapped backend
    pub fn inner(&self) -> &B {
        &self.inner
    }

    async fn logged<T, Fut>(
        &self,
        endpoint: &'static str,
        address: &WalletAddress,
        call: Fut,
    ) -> Result<T, FetchError>
    where
        T: Debug,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        if self.log_requests {
            trace!(endpoint, address = %address, "Backend request");
        } else {
            debug!("Backend request: {endpoint}");
        }

        let start = Instant::now();
        let result = call.await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(response) if self.log_responses => {
                trace!(endpoint, response = ?response, duration_ms, "Backend response");
            }
            Ok(_) => {
                debug!(duration_ms, "Backend response: {endpoint}");
            }
            Err(error) if error.is_aborted() => {
                debug!(duration_ms, "Backend call aborted: {endpoint}");
            }
            Err(error) => {
                warn!(error = %error, duration_ms, "Backend error: {endpoint}");
            }
        }

        result
    }
}

#[async_trait]
impl<B> AccessBackend for LoggingBackend<B>
where
    B: AccessBackend,
{
    async fn check_access(&self, address: &WalletAddress) -> Result<AccessRecord, FetchError> {
        self.logged("access-check", address, self.inner.check_access(address))
            .await
    }

    async fn mint(&self, address: &WalletAddress) -> Result<MintSubmission, FetchError> {
        self.logged("mint", address, self.inner.mint(address)).await
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Offline;

    #[async_trait]
    impl AccessBackend for Offline {
        async fn check_access(&self, _: &WalletAddress) -> Result<AccessRecord, FetchError> {
            Err(FetchError::network("offline"))
        }

        async fn mint(&self, _: &WalletAddress) -> Result<MintSubmission, FetchError> {
            Err(FetchError::Timeout)
        }

        fn name(&self) -> &'static str {
            "offline"
        }
    }

    #[test]
    fn test_logging_backend_default() {
        let backend = LoggingBackend::new(Offline);
        assert!(!backend.log_requests);
        assert!(!backend.log_responses);
        assert_eq!(backend.name(), "offline");
    }

    #[test]
    fn test_logging_backend_verbose() {
        let backend = LoggingBackend::new(Offline).verbose();
        assert!(backend.log_requests);
        assert!(backend.log_responses);
    }

    #[tokio::test]
    async fn test_errors_pass_through_unchanged() {
        let backend = LoggingBackend::new(Offline).with_request_logging();
        let address =
            WalletAddress::parse("0x00000000000000000000000000000000000000aa").unwrap();

        assert_eq!(
            backend.check_access(&address).await,
            Err(FetchError::network("offline"))
        );
        assert_eq!(backend.mint(&address).await, Err(FetchError::Timeout));
    }
}
