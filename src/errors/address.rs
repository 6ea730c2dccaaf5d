// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Wallet address validation errors.

/// Errors produced when a string does not match `^0x[0-9a-fA-F]{40}$`.
///
/// Validation always runs locally, before any network call is issued.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    /// The address does not start with `0x`.
    #[error("address must start with 0x: {input}")]
    MissingPrefix {
        /// The rejected input
        input: String,
    },

    /// The address does not have exactly 40 hex digits after the prefix.
    #[error("address must have 40 hex digits after 0x, got {digits}")]
    InvalidLength {
        /// Number of characters found after the prefix
        digits: usize,
    },

    /// The address contains characters outside `[0-9a-fA-F]`.
    #[error("address contains non-hex characters: {input}")]
    InvalidHex {
        /// The rejected input
        input: String,
    },
}
