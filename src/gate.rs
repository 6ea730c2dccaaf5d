// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Token-gated access checks
//!
//! [`AccessGate`] answers "does address X currently have access" from the
//! access cache, fetching through the backend on a miss or a stale entry.
//! It never fails: a verification error degrades to "access denied" and is
//! reported alongside the answer and to subscribers.

use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn, Instrument};

use crate::cache::{lock, CacheStore, QueryOptions, Subscription};
use crate::config::constants::ACCESS_NAMESPACE;
use crate::config::SyncConfig;
use crate::errors::{AddressError, FetchError};
use crate::retry::RetryPolicy;
use crate::spans;
use crate::transport::AccessBackend;
use crate::types::access::AccessRecord;
use crate::types::address::WalletAddress;
use crate::types::cache::{CacheKey, QueryState};

/// Cache key of the access record for `address`
pub fn access_key(address: &WalletAddress) -> CacheKey {
    CacheKey::for_address(ACCESS_NAMESPACE, address)
}

/// Answer to one access check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessCheck {
    /// Whether access is granted. `false` whenever `error` is set.
    pub has_access: bool,
    /// The record the answer came from, if one was available
    pub record: Option<AccessRecord>,
    /// Why the check could not be completed
    pub error: Option<FetchError>,
}

impl AccessCheck {
    fn from_record(record: AccessRecord) -> Self {
        Self {
            has_access: record.has_access,
            record: Some(record),
            error: None,
        }
    }

    fn denied(error: FetchError) -> Self {
        Self {
            has_access: false,
            record: None,
            error: Some(error),
        }
    }
}

/// Access checks backed by the shared access cache
pub struct AccessGate<B> {
    store: CacheStore<AccessRecord>,
    backend: Arc<B>,
    options: QueryOptions,
    active: Mutex<Option<WalletAddress>>,
}

impl<B> AccessGate<B>
where
    B: AccessBackend + 'static,
{
    /// Creates a gate over `store`, checking through `backend` with the
    /// access-check retry policy (3 attempts, 500ms fixed delay).
    pub fn new(store: CacheStore<AccessRecord>, backend: B) -> Self {
        Self {
            store,
            backend: Arc::new(backend),
            options: QueryOptions::default().with_retry(RetryPolicy::access_check()),
            active: Mutex::new(None),
        }
    }

    /// Creates a gate with a new store using the freshness windows and
    /// access retry policy from `config`
    pub fn from_config(config: &SyncConfig, backend: B) -> Self {
        Self::new(CacheStore::new(config.cache_settings()), backend)
            .with_options(QueryOptions::default().with_retry(config.access_retry.clone()))
    }

    /// Overrides the per-query options used for every check
    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    /// The access cache. Share it with the mint flow so a successful mint is
    /// visible here immediately.
    pub fn store(&self) -> &CacheStore<AccessRecord> {
        &self.store
    }

    /// Returns whether `address` currently has access.
    ///
    /// Invalid addresses and failed checks return `false`.
    pub async fn check_access(&self, address: &str) -> bool {
        self.check_access_detailed(address).await.has_access
    }

    /// Like [`Self::check_access`], also returning the record and any error.
    ///
    /// 1. Invalid address: denied without a network call.
    /// 2. Fresh cache entry: answered from memory.
    /// 3. Otherwise: answered through the cache, which serves a stale entry
    ///    while revalidating or awaits the (deduplicated, retried) fetch.
    pub async fn check_access_detailed(&self, address: &str) -> AccessCheck {
        let address = match WalletAddress::parse(address) {
            Ok(address) => address,
            Err(err) => {
                debug!(error = %err, "Rejecting access check for invalid address");
                return AccessCheck::denied(err.into());
            }
        };

        self.check(address)
            .instrument(spans::check_access(&address))
            .await
    }

    async fn check(&self, address: WalletAddress) -> AccessCheck {
        let key = access_key(&address);

        if let Some(record) = self.store.peek(&key) {
            debug!(has_access = record.has_access, "Access answered from cache");
            return AccessCheck::from_record(record);
        }

        let backend = Arc::clone(&self.backend);
        let fetcher = move |_: CancellationToken| {
            let backend = Arc::clone(&backend);
            async move {
                let record = backend.check_access(&address).await?;
                if record.address != address {
                    return Err(FetchError::malformed(format!(
                        "access check for {address} answered for {}",
                        record.address
                    )));
                }
                Ok(record)
            }
        };

        match self.store.get(&key, fetcher, &self.options).await {
            Ok(record) => AccessCheck::from_record(record),
            Err(error) => {
                if !error.is_aborted() {
                    warn!(error = %error, "Access check failed, denying access");
                }
                AccessCheck::denied(error)
            }
        }
    }

    /// Sets the address being gated. When it changes, the previous address's
    /// entry is deleted; its subscriptions stay registered under the old key.
    pub fn set_active_address(&self, address: Option<&str>) -> Result<(), AddressError> {
        let next = address.map(WalletAddress::parse).transpose()?;
        let previous = std::mem::replace(&mut *lock(&self.active), next);

        if let Some(previous) = previous.filter(|previous| Some(*previous) != next) {
            debug!(previous = %previous, "Active address changed, dropping cached access");
            self.store.delete(&access_key(&previous));
        }
        Ok(())
    }

    /// The address most recently passed to [`Self::set_active_address`]
    pub fn active_address(&self) -> Option<WalletAddress> {
        *lock(&self.active)
    }

    /// Registers a listener for `(record, error, isLoading)` updates on
    /// `address`
    pub fn subscribe<F>(&self, address: &WalletAddress, listener: F) -> Subscription
    where
        F: Fn(&QueryState<AccessRecord>) + Send + Sync + 'static,
    {
        self.store.subscribe(&access_key(address), listener)
    }

    /// Removes a listener registered with [`Self::subscribe`]
    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        self.store.unsubscribe(subscription)
    }

    /// Records that `address` was just granted access (a successful mint),
    /// without waiting for the backend to observe it
    pub fn grant_access(&self, address: &WalletAddress) {
        self.store
            .mutate(&access_key(address), AccessRecord::granted_by_mint(*address));
    }

    /// Marks the cached answer for `address` stale
    pub fn invalidate(&self, address: &WalletAddress) -> bool {
        self.store.invalidate(&access_key(address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::mint::MintSubmission;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AccessBackend for Counting {
        async fn check_access(&self, address: &WalletAddress) -> Result<AccessRecord, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(AccessRecord::granted_by_mint(*address))
        }

        async fn mint(&self, _: &WalletAddress) -> Result<MintSubmission, FetchError> {
            Err(FetchError::Timeout)
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    const ADDRESS: &str = "0x00000000000000000000000000000000000000aa";

    #[test]
    fn test_access_key_is_namespaced() {
        let address = WalletAddress::parse(ADDRESS).unwrap();
        assert_eq!(access_key(&address).as_str(), format!("access:{ADDRESS}"));
    }

    #[tokio::test]
    async fn test_invalid_address_denied_without_call() {
        let gate = AccessGate::new(CacheStore::with_defaults(), Counting::default());

        let check = gate.check_access_detailed("0x1234").await;
        assert!(!check.has_access);
        assert!(matches!(check.error, Some(FetchError::InvalidAddress(_))));
        assert_eq!(gate.backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_second_check_served_from_cache() {
        let gate = AccessGate::new(CacheStore::with_defaults(), Counting::default());

        assert!(gate.check_access(ADDRESS).await);
        assert!(gate.check_access(ADDRESS).await);
        assert_eq!(gate.backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_changing_active_address_drops_previous_entry() {
        let gate = AccessGate::new(CacheStore::with_defaults(), Counting::default());
        let first = WalletAddress::parse(ADDRESS).unwrap();

        gate.set_active_address(Some(ADDRESS)).unwrap();
        gate.grant_access(&first);
        assert!(gate.store().peek(&access_key(&first)).is_some());

        // Same address in another case: not a change
        gate.set_active_address(Some(&ADDRESS.to_uppercase().replace("0X", "0x")))
            .unwrap();
        assert!(gate.store().peek(&access_key(&first)).is_some());

        gate.set_active_address(Some("0x00000000000000000000000000000000000000bb"))
            .unwrap();
        assert!(gate.store().peek(&access_key(&first)).is_none());
    }
}
