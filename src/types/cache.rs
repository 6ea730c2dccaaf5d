// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Strong types for cache identity and observable query state
//!
//! - [`CacheKey`]: opaque string identifying one query
//! - [`Generation`]: monotonic write counter used to discard superseded fetches
//! - [`QueryState`]: the `(data, error, isLoading)` tuple delivered to subscribers

use std::fmt;
use std::sync::Arc;

use crate::errors::FetchError;
use crate::types::address::WalletAddress;

/// Key identifying one cached query
///
/// Keys are namespaced (`"access:0x…"`). Address keys are built from
/// [`WalletAddress`], which is always lower case, so two case variants of the
/// same address share one entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(Arc<str>);

impl CacheKey {
    /// Creates a key from a namespace and an identifier
    pub fn new(namespace: &str, id: impl fmt::Display) -> Self {
        Self(Arc::from(format!("{namespace}:{id}")))
    }

    /// Creates a key for a wallet address within a namespace
    pub fn for_address(namespace: &str, address: &WalletAddress) -> Self {
        Self::new(namespace, address.to_lower_hex())
    }

    /// The key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Monotonic write counter for cache entries
///
/// Every write (fetch result or `mutate`) takes a new generation. A fetch
/// remembers the generation it started from and its result is discarded if
/// the entry moved on while the request was in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    /// Returns the next generation
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Raw counter value
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Observable state of one query, as delivered to subscribers
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState<T> {
    /// Latest known data (possibly stale)
    pub data: Option<T>,
    /// Error from the most recent failed fetch
    pub error: Option<FetchError>,
    /// Whether a fetch is in flight
    pub is_loading: bool,
}

impl<T> QueryState<T> {
    /// State announced when a fetch starts
    pub fn loading(data: Option<T>) -> Self {
        Self {
            data,
            error: None,
            is_loading: true,
        }
    }

    /// State announced after a successful write
    pub fn ready(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            is_loading: false,
        }
    }

    /// State announced after a failed fetch
    pub fn failed(data: Option<T>, error: FetchError) -> Self {
        Self {
            data,
            error: Some(error),
            is_loading: false,
        }
    }
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            is_loading: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_keys_ignore_case() {
        let upper = WalletAddress::parse("0xABCDEF0123456789ABCDEF0123456789ABCDEF01").unwrap();
        let lower = WalletAddress::parse("0xabcdef0123456789abcdef0123456789abcdef01").unwrap();
        assert_eq!(
            CacheKey::for_address("access", &upper),
            CacheKey::for_address("access", &lower)
        );
        assert_eq!(
            CacheKey::for_address("access", &upper).as_str(),
            "access:0xabcdef0123456789abcdef0123456789abcdef01"
        );
    }

    #[test]
    fn test_generation_is_monotonic() {
        let first = Generation::default();
        let second = first.next();
        assert!(first < second);
        assert_eq!(second.get(), 1);
    }
}
