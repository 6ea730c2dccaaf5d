// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Errors from the access-check endpoint, the mint endpoint, the wallet, and
//! the receipt poller.
//!
//! The variants follow the error taxonomy the retry executor and the mint
//! classifier act on:
//!
//! | Variant | Retried | Surfaced |
//! |---|---|---|
//! | `Network`, `Timeout` | yes | after retries are exhausted |
//! | `Http` 5xx / 408 / 429 | yes | after retries are exhausted |
//! | `Http` other 4xx | no | immediately |
//! | `Aborted` | no | never (silent) |
//! | `UserRejected` | no | immediately |
//! | `InsufficientFunds` | no | immediately |
//! | `ContractReverted` | no | immediately, with raw detail |
//! | `Malformed` | no | immediately |
//! | `InvalidAddress` | no | immediately, no network call made |

use super::AddressError;

/// Errors that can occur while fetching or submitting data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Connection failure, reset, or other transport-level problem.
    #[error("network error: {message}")]
    Network {
        /// Description of the failure
        message: String,
    },

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The operation was cancelled by its owner.
    ///
    /// Never retried and never shown to the user.
    #[error("request aborted")]
    Aborted,

    /// The wallet owner declined to sign.
    #[error("user rejected the request: {message}")]
    UserRejected {
        /// Message reported by the wallet or backend
        message: String,
    },

    /// The minting account cannot cover value plus gas.
    #[error("insufficient funds: {message}")]
    InsufficientFunds {
        /// Message reported by the backend
        message: String,
    },

    /// The contract call reverted. Repeating it would fail identically.
    #[error("contract execution reverted: {message}")]
    ContractReverted {
        /// Short description
        message: String,
        /// Raw detail from the node or backend, when available
        detail: Option<String>,
    },

    /// The response body could not be decoded or was missing fields.
    #[error("malformed response: {message}")]
    Malformed {
        /// Description of what was wrong with the response
        message: String,
    },

    /// The endpoint answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// The `error` field of the response body, or the raw body
        message: String,
    },

    /// The wallet address failed local validation.
    #[error("invalid address: {0}")]
    InvalidAddress(#[from] AddressError),
}

impl FetchError {
    /// Create a `Network` error from any displayable cause.
    pub fn network(message: impl std::fmt::Display) -> Self {
        FetchError::Network {
            message: message.to_string(),
        }
    }

    /// Create a `Malformed` error from any displayable cause.
    pub fn malformed(message: impl std::fmt::Display) -> Self {
        FetchError::Malformed {
            message: message.to_string(),
        }
    }

    /// Returns `true` if repeating the request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network { .. } | FetchError::Timeout => true,
            FetchError::Http { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            FetchError::Aborted
            | FetchError::UserRejected { .. }
            | FetchError::InsufficientFunds { .. }
            | FetchError::ContractReverted { .. }
            | FetchError::Malformed { .. }
            | FetchError::InvalidAddress(_) => false,
        }
    }

    /// Returns `true` for cancellation, which callers treat as a silent no-op.
    pub fn is_aborted(&self) -> bool {
        matches!(self, FetchError::Aborted)
    }

    /// Map an `{ error: string }` body from the backend to a typed error.
    ///
    /// The backend only reports free-form messages, so wallet rejections,
    /// insufficient funds, and reverts are recognised by substring. This is
    /// provider- and locale-dependent; sources that can report a structured
    /// reason (the wallet approval seam, receipt status) construct the typed
    /// variant directly instead of going through here.
    pub fn from_backend_message(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        let lowered = message.to_lowercase();

        if lowered.contains("user rejected")
            || lowered.contains("user denied")
            || lowered.contains("rejected the request")
        {
            FetchError::UserRejected { message }
        } else if lowered.contains("insufficient funds") {
            FetchError::InsufficientFunds { message }
        } else if lowered.contains("revert") || lowered.contains("execution failed") {
            FetchError::ContractReverted {
                message: "contract execution reverted".to_string(),
                detail: Some(message),
            }
        } else {
            FetchError::Http { status, message }
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            FetchError::Timeout
        } else if error.is_decode() {
            FetchError::malformed(error)
        } else if let Some(status) = error.status() {
            FetchError::Http {
                status: status.as_u16(),
                message: error.to_string(),
            }
        } else {
            FetchError::network(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors_are_retryable() {
        assert!(FetchError::network("connection reset").is_retryable());
        assert!(FetchError::Timeout.is_retryable());
        assert!(FetchError::Http {
            status: 503,
            message: "unavailable".into()
        }
        .is_retryable());
        assert!(FetchError::Http {
            status: 429,
            message: "slow down".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_terminal_errors_are_not_retryable() {
        assert!(!FetchError::Aborted.is_retryable());
        assert!(!FetchError::UserRejected {
            message: "no".into()
        }
        .is_retryable());
        assert!(!FetchError::InsufficientFunds {
            message: "broke".into()
        }
        .is_retryable());
        assert!(!FetchError::malformed("bad json").is_retryable());
        assert!(!FetchError::Http {
            status: 400,
            message: "Invalid address".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_backend_message_classification() {
        assert!(matches!(
            FetchError::from_backend_message(500, "MetaMask Tx Signature: User denied transaction"),
            FetchError::UserRejected { .. }
        ));
        assert!(matches!(
            FetchError::from_backend_message(500, "insufficient funds for gas * price + value"),
            FetchError::InsufficientFunds { .. }
        ));

        let reverted = FetchError::from_backend_message(500, "execution reverted: already minted");
        match reverted {
            FetchError::ContractReverted { detail, .. } => {
                assert_eq!(detail.as_deref(), Some("execution reverted: already minted"));
            }
            other => panic!("expected ContractReverted, got {other:?}"),
        }

        assert_eq!(
            FetchError::from_backend_message(502, "Bad gateway"),
            FetchError::Http {
                status: 502,
                message: "Bad gateway".into()
            }
        );
    }
}
