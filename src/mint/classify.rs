// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Mapping of fetch failures to user-facing mint errors

use crate::errors::{FetchError, MintError, MintErrorCode};

/// Classifies the error that ended a mint operation.
///
/// Transient failures only reach this point once retries are exhausted, so
/// they become `NETWORK_ERROR`. Non-retryable HTTP statuses and malformed
/// responses carry no actionable meaning for the user and become `UNKNOWN`.
pub(crate) fn classify(error: &FetchError) -> MintError {
    match error {
        FetchError::UserRejected { message } => {
            MintError::new(MintErrorCode::UserRejected, "Transaction was rejected in the wallet")
                .with_detail(message.clone())
        }
        FetchError::InsufficientFunds { message } => MintError::new(
            MintErrorCode::InsufficientFunds,
            "Insufficient funds to cover the mint",
        )
        .with_detail(message.clone()),
        FetchError::ContractReverted { message, detail } => {
            let error = MintError::new(MintErrorCode::ContractError, message.clone());
            match detail {
                Some(detail) => error.with_detail(detail.clone()),
                None => error,
            }
        }
        FetchError::Network { .. } | FetchError::Timeout => {
            MintError::new(MintErrorCode::NetworkError, error.to_string())
        }
        FetchError::Http { .. } if error.is_retryable() => {
            MintError::new(MintErrorCode::NetworkError, error.to_string())
        }
        FetchError::InvalidAddress(source) => {
            MintError::new(MintErrorCode::InvalidAddress, source.to_string())
        }
        FetchError::Http { .. } | FetchError::Malformed { .. } | FetchError::Aborted => {
            MintError::new(MintErrorCode::Unknown, error.to_string())
        }
    }
}
