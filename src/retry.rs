// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Retrying, cancellable execution of async operations.
//!
//! [`RetryExecutor`] runs an operation up to `max_attempts` times. The delay
//! before attempt `n` (`n >= 2`) depends on the [`Backoff`] strategy:
//!
//! ```text
//! Fixed:       base_delay
//! Exponential: base_delay * 2^(n-2)
//! Linear:      base_delay * (n-1)
//! ```
//!
//! Errors classified as non-retryable (see [`Retryable`]) end the loop
//! immediately. Every attempt and every backoff wait is bound to a
//! [`CancellationToken`]; once it fires no further attempt is scheduled and
//! the operation resolves to the error type's "aborted" value.
//!
//! The executor holds no shared mutable state, so concurrent runs do not
//! interfere.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::constants::{
    ACCESS_RETRY_ATTEMPTS, ACCESS_RETRY_DELAY, MINT_RETRY_ATTEMPTS, MINT_RETRY_DELAY,
};
use crate::errors::FetchError;

/// Error classification used by [`RetryExecutor`].
pub trait Retryable {
    /// Returns `true` if the operation may succeed when repeated.
    fn is_retryable(&self) -> bool;

    /// The value produced when the operation is cancelled.
    fn aborted() -> Self;

    /// Whether this value is the cancellation marker.
    fn is_aborted(&self) -> bool;
}

impl Retryable for FetchError {
    fn is_retryable(&self) -> bool {
        FetchError::is_retryable(self)
    }

    fn aborted() -> Self {
        FetchError::Aborted
    }

    fn is_aborted(&self) -> bool {
        FetchError::is_aborted(self)
    }
}

/// How the delay between attempts grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backoff {
    /// Same delay before every retry
    #[default]
    Fixed,
    /// Delay doubles before every retry
    Exponential,
    /// Delay grows by `base_delay` before every retry
    Linear,
}

/// Retry configuration for one call site. Immutable per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first. Values below 1 are
    /// treated as 1.
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub base_delay: Duration,
    /// Growth strategy for subsequent delays
    pub backoff: Backoff,
    /// Upper bound on any single delay, unbounded unless set
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy with no cap on the delay.
    pub const fn new(max_attempts: u32, base_delay: Duration, backoff: Backoff) -> Self {
        Self {
            max_attempts,
            base_delay,
            backoff,
            max_delay: Duration::MAX,
        }
    }

    /// Policy for access checks: a short, bounded retry for a read that is
    /// safe to repeat.
    ///
    /// - 3 attempts
    /// - 500ms fixed delay
    pub const fn access_check() -> Self {
        Self::new(ACCESS_RETRY_ATTEMPTS, ACCESS_RETRY_DELAY, Backoff::Fixed)
    }

    /// Policy for mint submissions: each retry costs gas, so the delay grows
    /// linearly rather than exponentially.
    ///
    /// - 3 attempts
    /// - 1000ms base delay, scaled by attempt count
    pub const fn mint() -> Self {
        Self::new(MINT_RETRY_ATTEMPTS, MINT_RETRY_DELAY, Backoff::Linear)
    }

    /// Policy that never retries.
    pub const fn no_retry() -> Self {
        Self::new(1, Duration::ZERO, Backoff::Fixed)
    }

    /// Sets the upper bound on any single delay.
    pub const fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Effective number of attempts (at least one).
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay before the given 1-based attempt. The first attempt has no delay.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let retry = attempt - 1;
        let multiplier: u128 = match self.backoff {
            Backoff::Fixed => 1,
            Backoff::Exponential => 2u128.saturating_pow(retry - 1),
            Backoff::Linear => retry as u128,
        };
        let delay_ms = self
            .base_delay
            .as_millis()
            .saturating_mul(multiplier)
            .min(self.max_delay.as_millis())
            .min(u128::from(u64::MAX));
        Duration::from_millis(delay_ms as u64)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::access_check()
    }
}

/// Runs async operations under a [`RetryPolicy`].
///
/// # Example
///
/// ```rust,ignore
/// use tokengate::{RetryExecutor, RetryPolicy};
/// use tokio_util::sync::CancellationToken;
///
/// let executor = RetryExecutor::new(RetryPolicy::access_check());
/// let cancel = CancellationToken::new();
/// let record = executor
///     .run(&cancel, |attempt| async move { backend.check_access(&address).await })
///     .await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    /// Creates an executor for the given policy.
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// The policy this executor applies.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable error,
    /// runs out of attempts, or `cancel` fires.
    ///
    /// `operation` receives the 1-based attempt number. An in-flight attempt is
    /// dropped as soon as `cancel` fires.
    pub async fn run<T, E, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<T, E>
    where
        E: Retryable + fmt::Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.policy.attempts();
        let mut attempt = 1u32;

        loop {
            if cancel.is_cancelled() {
                return Err(E::aborted());
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(E::aborted()),
                result = operation(attempt) => result,
            };

            let error = match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            if error.is_aborted() {
                debug!(attempt, "Operation aborted");
                return Err(error);
            }

            if !error.is_retryable() {
                debug!(error = %error, attempt, "Non-retryable error, not retrying");
                return Err(error);
            }

            if attempt >= max_attempts {
                warn!(error = %error, attempts = attempt, "Max attempts exhausted");
                return Err(error);
            }

            attempt += 1;
            let delay = self.policy.delay_before(attempt);
            warn!(
                error = %error,
                next_attempt = attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                "Retryable error, backing off"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(E::aborted()),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
