// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Classified mint failures.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable error codes surfaced by the mint flow.
///
/// Consumers branch on these to guide the user: retry later, top up funds,
/// or approve again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MintErrorCode {
    /// The wallet owner declined to sign
    UserRejected,
    /// Not enough balance for value plus gas
    InsufficientFunds,
    /// The contract reverted
    ContractError,
    /// Transient failure that persisted through every retry
    NetworkError,
    /// The address failed local validation
    InvalidAddress,
    /// Anything else, including malformed responses
    Unknown,
}

impl MintErrorCode {
    /// The wire representation of the code.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MintErrorCode::UserRejected => "USER_REJECTED",
            MintErrorCode::InsufficientFunds => "INSUFFICIENT_FUNDS",
            MintErrorCode::ContractError => "CONTRACT_ERROR",
            MintErrorCode::NetworkError => "NETWORK_ERROR",
            MintErrorCode::InvalidAddress => "INVALID_ADDRESS",
            MintErrorCode::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for MintErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The payload stored by the mint flow when it enters the `error` state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct MintError {
    /// Stable, machine-readable code
    pub code: MintErrorCode,
    /// Human-readable message
    pub message: String,
    /// Raw detail (e.g. revert reason), when available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl MintError {
    /// Create a new error without detail.
    pub fn new(code: MintErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            detail: None,
        }
    }

    /// Attach raw detail.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
