//! Defaults and well-known names
//!
//! This module centralizes the default timings, retry settings, endpoint
//! paths, and environment variable names used throughout the tokengate crate.

use std::time::Duration;

/// How long a cached access answer is served without revalidation
pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(30);

/// How long after its last write an entry is evicted
pub const DEFAULT_CACHE_TIME: Duration = Duration::from_secs(5 * 60);

/// Attempts for access checks
pub const ACCESS_RETRY_ATTEMPTS: u32 = 3;

/// Base delay between access-check attempts
pub const ACCESS_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Attempts for mint submissions
pub const MINT_RETRY_ATTEMPTS: u32 = 3;

/// Base delay between mint attempts (scaled linearly by attempt count)
pub const MINT_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// HTTP request timeout for backend calls
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Interval between receipt lookups while confirming a mint
pub const DEFAULT_RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// How long to wait for a mint transaction to be included
pub const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(120);

/// Backend base URL used when none is configured
pub const DEFAULT_API_URL: &str = "http://localhost:3000/api/";

/// Cache namespace for access-check entries
pub const ACCESS_NAMESPACE: &str = "access";

/// Endpoint paths, relative to the API base URL
pub mod endpoints {
    /// `GET /access-check?address=…`
    pub const ACCESS_CHECK: &str = "access-check";

    /// `POST /mint`
    pub const MINT: &str = "mint";
}

/// Environment variables read by [`crate::SyncConfig::from_env`]
pub mod env {
    /// Backend base URL
    pub const API_URL: &str = "TOKENGATE_API_URL";
    /// JSON-RPC URL used to poll mint receipts
    pub const RPC_URL: &str = "TOKENGATE_RPC_URL";
    /// Stale time in milliseconds
    pub const STALE_TIME_MS: &str = "TOKENGATE_STALE_TIME_MS";
    /// Cache time in milliseconds
    pub const CACHE_TIME_MS: &str = "TOKENGATE_CACHE_TIME_MS";
    /// Maximum attempts for both call sites
    pub const MAX_RETRIES: &str = "TOKENGATE_MAX_RETRIES";
    /// Base delay for access-check retries in milliseconds
    pub const RETRY_DELAY_MS: &str = "TOKENGATE_RETRY_DELAY_MS";
    /// Base delay for mint retries in milliseconds
    pub const MINT_RETRY_DELAY_MS: &str = "TOKENGATE_MINT_RETRY_DELAY_MS";
    /// Use exponential backoff for access-check retries
    pub const EXPONENTIAL_BACKOFF: &str = "TOKENGATE_EXPONENTIAL_BACKOFF";
    /// HTTP request timeout in milliseconds
    pub const REQUEST_TIMEOUT_MS: &str = "TOKENGATE_REQUEST_TIMEOUT_MS";
}
