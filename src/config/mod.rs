//! Configuration for tokengate
//!
//! This module controls cache freshness, retry behavior, and backend
//! endpoints.
//!
//! # Example: Using defaults
//!
//! ```rust
//! use tokengate::SyncConfig;
//! use std::time::Duration;
//!
//! let config = SyncConfig::default();
//! assert_eq!(config.stale_time, Duration::from_secs(30));
//! assert_eq!(config.cache_time, Duration::from_secs(300));
//! ```
//!
//! # Example: Custom configuration
//!
//! ```rust
//! use tokengate::SyncConfigBuilder;
//! use std::time::Duration;
//!
//! let config = SyncConfigBuilder::new()
//!     .api_url("https://gate.example.com/api/")
//!     .stale_time(Duration::from_secs(10))
//!     .max_retries(5)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.access_retry.max_attempts, 5);
//! ```
//!
//! # Example: From the environment
//!
//! ```rust,ignore
//! use tokengate::SyncConfig;
//!
//! // Reads TOKENGATE_* variables, loading `.env` first if present
//! let config = SyncConfig::from_env()?;
//! ```

use std::time::Duration;

use url::Url;

use crate::cache::CacheSettings;
use crate::errors::ConfigError;
use crate::retry::{Backoff, RetryPolicy};

pub mod constants;

use constants::{
    env, DEFAULT_API_URL, DEFAULT_CACHE_TIME, DEFAULT_RECEIPT_POLL_INTERVAL,
    DEFAULT_RECEIPT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT, DEFAULT_STALE_TIME,
};

/// Configuration for the synchronization layer
///
/// Use [`SyncConfigBuilder`] for a validated, fluent construction.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Backend base URL (endpoints are resolved relative to it)
    /// Default: `http://localhost:3000/api/`
    pub api_url: String,

    /// JSON-RPC URL for receipt polling. Required only for minting.
    /// Default: None
    pub rpc_url: Option<String>,

    /// How long an entry is served without revalidation
    /// Default: 30 seconds
    pub stale_time: Duration,

    /// How long after its last write an entry is evicted
    /// Default: 5 minutes
    pub cache_time: Duration,

    /// Retry policy for access checks
    /// Default: 3 attempts, 500ms, fixed
    pub access_retry: RetryPolicy,

    /// Retry policy for mint submissions
    /// Default: 3 attempts, 1000ms, linear
    pub mint_retry: RetryPolicy,

    /// HTTP request timeout
    /// Default: 30 seconds
    pub request_timeout: Duration,

    /// Interval between receipt lookups
    /// Default: 2 seconds
    pub receipt_poll_interval: Duration,

    /// How long to wait for a mint to be included
    /// Default: 120 seconds
    pub receipt_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            rpc_url: None,
            stale_time: DEFAULT_STALE_TIME,
            cache_time: DEFAULT_CACHE_TIME,
            access_retry: RetryPolicy::access_check(),
            mint_retry: RetryPolicy::mint(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            receipt_poll_interval: DEFAULT_RECEIPT_POLL_INTERVAL,
            receipt_timeout: DEFAULT_RECEIPT_TIMEOUT,
        }
    }
}

impl SyncConfig {
    /// Load configuration from `TOKENGATE_*` environment variables
    ///
    /// A `.env` file in the working directory is loaded first if present.
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| dotenvy::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// # Example
    ///
    /// ```rust
    /// use tokengate::SyncConfig;
    /// use std::time::Duration;
    ///
    /// let config = SyncConfig::from_lookup(|name| match name {
    ///     "TOKENGATE_STALE_TIME_MS" => Some("1000".to_string()),
    ///     _ => None,
    /// })
    /// .unwrap();
    /// assert_eq!(config.stale_time, Duration::from_secs(1));
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = SyncConfigBuilder::new();

        if let Some(url) = lookup(env::API_URL) {
            builder = builder.api_url(url);
        }
        if let Some(url) = lookup(env::RPC_URL) {
            builder = builder.rpc_url(url);
        }
        if let Some(stale) = parse_millis(&lookup, env::STALE_TIME_MS)? {
            builder = builder.stale_time(stale);
        }
        if let Some(cache) = parse_millis(&lookup, env::CACHE_TIME_MS)? {
            builder = builder.cache_time(cache);
        }
        if let Some(value) = lookup(env::MAX_RETRIES) {
            let attempts = value
                .trim()
                .parse::<u32>()
                .map_err(|e| ConfigError::invalid_env(env::MAX_RETRIES, value.clone(), e))?;
            builder = builder.max_retries(attempts);
        }
        if let Some(delay) = parse_millis(&lookup, env::RETRY_DELAY_MS)? {
            builder = builder.retry_delay(delay);
        }
        if let Some(delay) = parse_millis(&lookup, env::MINT_RETRY_DELAY_MS)? {
            builder = builder.mint_retry_delay(delay);
        }
        if let Some(value) = lookup(env::EXPONENTIAL_BACKOFF) {
            let enabled = parse_bool(&value).ok_or_else(|| {
                ConfigError::invalid_env(
                    env::EXPONENTIAL_BACKOFF,
                    value.clone(),
                    "expected a boolean",
                )
            })?;
            builder = builder.exponential_backoff(enabled);
        }
        if let Some(timeout) = parse_millis(&lookup, env::REQUEST_TIMEOUT_MS)? {
            builder = builder.request_timeout(timeout);
        }

        builder.build()
    }

    /// Parsed backend base URL, with a trailing slash so endpoint paths join
    /// beneath it rather than replacing its last segment
    pub fn api_base(&self) -> Result<Url, ConfigError> {
        let mut raw = self.api_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Url::parse(&raw).map_err(|source| ConfigError::InvalidUrl {
            value: self.api_url.clone(),
            source,
        })
    }

    /// Parsed JSON-RPC URL for receipt polling
    pub fn rpc_endpoint(&self) -> Result<Url, ConfigError> {
        let raw = self.rpc_url.as_deref().ok_or(ConfigError::Missing {
            var: env::RPC_URL,
        })?;
        Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidUrl {
            value: raw.to_string(),
            source,
        })
    }

    /// Cache defaults derived from this configuration
    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            stale_time: self.stale_time,
            cache_time: self.cache_time,
            retry: self.access_retry.clone(),
        }
    }
}

/// Builder for [`SyncConfig`]
///
/// # Example
///
/// ```rust
/// use tokengate::SyncConfigBuilder;
/// use std::time::Duration;
///
/// let err = SyncConfigBuilder::new()
///     .stale_time(Duration::from_secs(60))
///     .cache_time(Duration::from_secs(10))
///     .build();
/// assert!(err.is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct SyncConfigBuilder {
    config: SyncConfig,
}

impl SyncConfigBuilder {
    /// Create a builder starting from the defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the backend base URL
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_url = url.into();
        self
    }

    /// Set the JSON-RPC URL for receipt polling
    pub fn rpc_url(mut self, url: impl Into<String>) -> Self {
        self.config.rpc_url = Some(url.into());
        self
    }

    /// Set the stale time
    pub fn stale_time(mut self, stale_time: Duration) -> Self {
        self.config.stale_time = stale_time;
        self
    }

    /// Set the cache (eviction) time
    pub fn cache_time(mut self, cache_time: Duration) -> Self {
        self.config.cache_time = cache_time;
        self
    }

    /// Set the attempt count for both access checks and mints
    pub fn max_retries(mut self, attempts: u32) -> Self {
        self.config.access_retry.max_attempts = attempts;
        self.config.mint_retry.max_attempts = attempts;
        self
    }

    /// Set the base delay for access-check retries
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.access_retry.base_delay = delay;
        self
    }

    /// Set the base delay for mint retries
    pub fn mint_retry_delay(mut self, delay: Duration) -> Self {
        self.config.mint_retry.base_delay = delay;
        self
    }

    /// Toggle exponential backoff for access-check retries
    ///
    /// Mint retries always scale linearly.
    pub fn exponential_backoff(mut self, enabled: bool) -> Self {
        self.config.access_retry.backoff = if enabled {
            Backoff::Exponential
        } else {
            Backoff::Fixed
        };
        self
    }

    /// Replace the access-check retry policy
    pub fn access_retry(mut self, policy: RetryPolicy) -> Self {
        self.config.access_retry = policy;
        self
    }

    /// Replace the mint retry policy
    pub fn mint_retry(mut self, policy: RetryPolicy) -> Self {
        self.config.mint_retry = policy;
        self
    }

    /// Set the HTTP request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set the receipt poll interval and overall confirmation timeout
    pub fn receipt_polling(mut self, interval: Duration, timeout: Duration) -> Self {
        self.config.receipt_poll_interval = interval;
        self.config.receipt_timeout = timeout;
        self
    }

    /// Validate and build the configuration
    pub fn build(self) -> Result<SyncConfig, ConfigError> {
        let config = self.config;

        if config.cache_time < config.stale_time {
            return Err(ConfigError::InvalidCacheWindow {
                stale_time: config.stale_time,
                cache_time: config.cache_time,
            });
        }
        if config.access_retry.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts { call_site: "access" });
        }
        if config.mint_retry.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts { call_site: "mint" });
        }
        config.api_base()?;

        Ok(config)
    }
}

fn parse_millis<F>(lookup: &F, var: &'static str) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var)
        .map(|value| {
            value
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|e| ConfigError::invalid_env(var, value.clone(), e))
        })
        .transpose()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
