// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Strong types shared across tokengate.
//!
//! - Wallet addresses (validated and case-normalized)
//! - Cache keys, generations, and the `(data, error, isLoading)` query state
//! - Access-check records and their wire format
//! - Mint states, results, and their wire format

pub mod access;
pub mod address;
pub mod cache;
pub mod mint;

// Note: Public types are re-exported from lib.rs, not here
