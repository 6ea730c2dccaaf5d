// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Property-based tests for retry backoff, address normalization and the
//! cache window
//!
//! These tests use proptest to validate invariants across a wide range of
//! policies, addresses and configurations.

use proptest::prelude::*;
use std::time::Duration;
use tokengate::{
    access_key, Backoff, ConfigError, RetryPolicy, SyncConfigBuilder, WalletAddress,
};

// Helper to generate arbitrary backoff strategies
fn arb_backoff() -> impl Strategy<Value = Backoff> {
    prop_oneof![
        Just(Backoff::Fixed),
        Just(Backoff::Exponential),
        Just(Backoff::Linear),
    ]
}

// Helper to generate arbitrary base delays (0-5000ms)
fn arb_delay() -> impl Strategy<Value = Duration> {
    (0u64..=5000).prop_map(Duration::from_millis)
}

proptest! {
    /// Property: No delay ever exceeds the cap, and the first attempt never waits
    #[test]
    fn prop_delay_respects_cap(
        base in arb_delay(),
        cap_ms in 0u64..=60_000,
        backoff in arb_backoff(),
        attempt in 1u32..=40,
    ) {
        let cap = Duration::from_millis(cap_ms);
        let policy = RetryPolicy::new(10, base, backoff).with_max_delay(cap);

        prop_assert_eq!(policy.delay_before(1), Duration::ZERO);
        prop_assert!(policy.delay_before(attempt) <= cap);
    }

    /// Property: Delays never shrink from one attempt to the next
    #[test]
    fn prop_delay_is_monotonic(
        base in arb_delay(),
        backoff in arb_backoff(),
        attempt in 1u32..=40,
    ) {
        let policy = RetryPolicy::new(10, base, backoff);
        prop_assert!(policy.delay_before(attempt) <= policy.delay_before(attempt + 1));
    }

    /// Property: Linear backoff waits `base * retries`, fixed waits `base`
    #[test]
    fn prop_linear_and_fixed_delays(
        base_ms in 0u64..=1000,
        attempt in 2u32..=20,
    ) {
        let base = Duration::from_millis(base_ms);
        let uncapped = Duration::from_secs(3600);

        let linear = RetryPolicy::new(3, base, Backoff::Linear).with_max_delay(uncapped);
        prop_assert_eq!(
            linear.delay_before(attempt),
            Duration::from_millis(base_ms * u64::from(attempt - 1))
        );

        let fixed = RetryPolicy::new(3, base, Backoff::Fixed).with_max_delay(uncapped);
        prop_assert_eq!(fixed.delay_before(attempt), base);
    }

    /// Property: Exponential backoff doubles until it reaches the cap
    #[test]
    fn prop_exponential_doubles(
        base_ms in 1u64..=1000,
        attempt in 2u32..=10,
    ) {
        let policy = RetryPolicy::new(10, Duration::from_millis(base_ms), Backoff::Exponential)
            .with_max_delay(Duration::from_secs(3600));

        prop_assert_eq!(
            policy.delay_before(attempt + 1),
            policy.delay_before(attempt) * 2
        );
    }

    /// Property: Case variants of an address parse to the same value and
    /// share one cache key
    #[test]
    fn prop_address_case_is_normalized(bytes in prop::array::uniform20(any::<u8>())) {
        let lower = format!("0x{}", alloy_primitives::hex::encode(bytes));
        let upper = format!("0x{}", lower[2..].to_uppercase());

        let a = WalletAddress::parse(&lower).unwrap();
        let b = WalletAddress::parse(&upper).unwrap();

        prop_assert_eq!(a, b);
        prop_assert_eq!(a.to_string(), lower);
        prop_assert_eq!(access_key(&a), access_key(&b));
    }

    /// Property: Any string of the wrong length is rejected
    #[test]
    fn prop_short_addresses_rejected(digits in "[0-9a-f]{0,39}") {
        let input = format!("0x{digits}");
        prop_assert!(WalletAddress::parse(&input).is_err());
    }

    /// Property: The builder accepts a cache window exactly when
    /// cache time >= stale time
    #[test]
    fn prop_cache_window_validation(
        stale_ms in 0u64..=600_000,
        cache_ms in 0u64..=600_000,
    ) {
        let result = SyncConfigBuilder::new()
            .stale_time(Duration::from_millis(stale_ms))
            .cache_time(Duration::from_millis(cache_ms))
            .build();

        if cache_ms >= stale_ms {
            prop_assert!(result.is_ok());
        } else {
            let is_window_error = matches!(result, Err(ConfigError::InvalidCacheWindow { .. }));
            prop_assert!(is_window_error);
        }
    }
}

#[test]
fn test_default_policies() {
    let access = RetryPolicy::access_check();
    assert_eq!(access.attempts(), 3);
    assert_eq!(access.delay_before(2), Duration::from_millis(500));
    assert_eq!(access.delay_before(3), Duration::from_millis(500));

    let mint = RetryPolicy::mint();
    assert_eq!(mint.attempts(), 3);
    assert_eq!(mint.delay_before(2), Duration::from_millis(1000));
    assert_eq!(mint.delay_before(3), Duration::from_millis(2000));

    assert_eq!(RetryPolicy::new(0, Duration::ZERO, Backoff::Fixed).attempts(), 1);
}
