// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Configuration errors.

use std::time::Duration;

/// Errors raised while building or loading a [`crate::SyncConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `cache_time` must be at least `stale_time`, otherwise entries would be
    /// evicted before they could ever be served stale.
    #[error("cache time {cache_time:?} is shorter than stale time {stale_time:?}")]
    InvalidCacheWindow {
        /// Configured stale time
        stale_time: Duration,
        /// Configured cache time
        cache_time: Duration,
    },

    /// A retry policy was configured with zero attempts.
    #[error("{call_site} retry policy must allow at least one attempt")]
    ZeroAttempts {
        /// Which policy was invalid ("access" or "mint")
        call_site: &'static str,
    },

    /// A URL could not be parsed.
    #[error("invalid URL `{value}`")]
    InvalidUrl {
        /// The rejected value
        value: String,
        /// The underlying parse error
        #[source]
        source: url::ParseError,
    },

    /// An environment variable held a value that could not be parsed.
    #[error("invalid value `{value}` for {var}: {reason}")]
    InvalidEnv {
        /// Variable name
        var: &'static str,
        /// The rejected value
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// A required setting was not provided.
    #[error("missing required setting {var}")]
    Missing {
        /// Variable name
        var: &'static str,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client")]
    HttpClient(#[source] reqwest::Error),
}

impl ConfigError {
    /// Create an `InvalidEnv` error.
    pub fn invalid_env(
        var: &'static str,
        value: impl Into<String>,
        reason: impl std::fmt::Display,
    ) -> Self {
        ConfigError::InvalidEnv {
            var,
            value: value.into(),
            reason: reason.to_string(),
        }
    }
}
