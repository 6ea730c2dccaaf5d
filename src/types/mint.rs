// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Mint operation states, results, and the `/mint` wire format

use std::fmt;
use std::str::FromStr;

use alloy_primitives::{TxHash, U256};
use serde::{Deserialize, Serialize};

use crate::errors::{FetchError, MintError};

/// Lifecycle of one mint operation
///
/// ```text
/// idle -> preparing -> awaiting_approval -> minting -> confirming -> success
///                   \___________________\__________\___________\--> error
/// ```
///
/// Forward transitions advance exactly one step. `error` is reachable from any
/// state except `idle` and `success`. `idle` is only entered through reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MintState {
    /// No operation running
    #[default]
    Idle,
    /// Validating input locally
    Preparing,
    /// Waiting for the wallet owner to approve
    AwaitingApproval,
    /// Submitting to the mint endpoint
    Minting,
    /// Waiting for the transaction to be included
    Confirming,
    /// Confirmed; a result is available
    Success,
    /// Failed; a classified error is available
    Error,
}

impl MintState {
    const fn position(self) -> u8 {
        match self {
            MintState::Idle => 0,
            MintState::Preparing => 1,
            MintState::AwaitingApproval => 2,
            MintState::Minting => 3,
            MintState::Confirming => 4,
            MintState::Success => 5,
            MintState::Error => 6,
        }
    }

    /// Whether the operation has finished
    pub const fn is_terminal(self) -> bool {
        matches!(self, MintState::Success | MintState::Error)
    }

    /// Whether an operation is currently running
    pub const fn is_in_progress(self) -> bool {
        !self.is_terminal() && !matches!(self, MintState::Idle)
    }

    /// Whether `self -> next` is a legal transition
    pub const fn can_transition_to(self, next: MintState) -> bool {
        match next {
            MintState::Idle => true,
            MintState::Error => self.is_in_progress(),
            _ => !self.is_terminal() && next.position() == self.position() + 1,
        }
    }
}

impl fmt::Display for MintState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MintState::Idle => "idle",
            MintState::Preparing => "preparing",
            MintState::AwaitingApproval => "awaiting_approval",
            MintState::Minting => "minting",
            MintState::Confirming => "confirming",
            MintState::Success => "success",
            MintState::Error => "error",
        };
        f.write_str(name)
    }
}

/// Request body of `POST /mint`
#[derive(Debug, Clone, Serialize)]
pub struct MintRequest {
    /// Lower-case recipient address
    pub address: String,
}

/// Successful response body of `POST /mint`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintResponse {
    /// Always `true` on success
    #[serde(default)]
    pub success: bool,
    /// Hash of the submitted transaction
    pub tx_hash: Option<String>,
    /// Identifier of the minted token
    pub token_id: Option<String>,
}

/// A mint transaction accepted by the backend, not yet confirmed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintSubmission {
    /// Hash of the submitted transaction
    pub tx_hash: TxHash,
    /// Identifier of the minted token
    pub token_id: U256,
}

impl TryFrom<MintResponse> for MintSubmission {
    type Error = FetchError;

    fn try_from(response: MintResponse) -> Result<Self, Self::Error> {
        if !response.success {
            return Err(FetchError::malformed("mint response did not report success"));
        }
        let tx_hash = response
            .tx_hash
            .ok_or_else(|| FetchError::malformed("mint response missing txHash"))?;
        let token_id = response
            .token_id
            .ok_or_else(|| FetchError::malformed("mint response missing tokenId"))?;

        Ok(Self {
            tx_hash: TxHash::from_str(&tx_hash)
                .map_err(|e| FetchError::malformed(format!("txHash `{tx_hash}`: {e}")))?,
            token_id: U256::from_str(&token_id)
                .map_err(|e| FetchError::malformed(format!("tokenId `{token_id}`: {e}")))?,
        })
    }
}

/// Outcome of a confirmed mint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MintResult {
    /// Identifier of the minted token
    pub token_id: U256,
    /// Hash of the confirmed transaction
    pub transaction_hash: TxHash,
    /// Block the transaction was included in
    pub block_number: u64,
}

/// Observable state of the mint flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MintSnapshot {
    /// Identifier of the operation this snapshot belongs to
    pub operation: u64,
    /// Current state
    pub state: MintState,
    /// Transaction hash, once the backend accepted the mint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<TxHash>,
    /// Result, only present in `success`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<MintResult>,
    /// Classified error, only present in `error`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<MintError>,
}

impl MintSnapshot {
    /// Fresh idle snapshot for an operation
    pub fn idle(operation: u64) -> Self {
        Self {
            operation,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDER: [MintState; 6] = [
        MintState::Idle,
        MintState::Preparing,
        MintState::AwaitingApproval,
        MintState::Minting,
        MintState::Confirming,
        MintState::Success,
    ];

    #[test]
    fn test_forward_transitions_advance_one_step() {
        for pair in ORDER.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
        assert!(!MintState::Preparing.can_transition_to(MintState::Minting));
        assert!(!MintState::Confirming.can_transition_to(MintState::Minting));
        assert!(!MintState::Idle.can_transition_to(MintState::Success));
    }

    #[test]
    fn test_error_reachable_only_from_running_states() {
        assert!(!MintState::Idle.can_transition_to(MintState::Error));
        assert!(!MintState::Success.can_transition_to(MintState::Error));
        assert!(!MintState::Error.can_transition_to(MintState::Error));
        for state in &ORDER[1..5] {
            assert!(state.can_transition_to(MintState::Error), "{state} -> error");
        }
    }

    #[test]
    fn test_terminal_states_only_leave_through_reset() {
        for terminal in [MintState::Success, MintState::Error] {
            assert!(terminal.can_transition_to(MintState::Idle));
            assert!(!terminal.can_transition_to(MintState::Preparing));
        }
    }

    #[test]
    fn test_submission_from_response() {
        let response: MintResponse = serde_json::from_str(
            r#"{
                "success": true,
                "txHash": "0x1111111111111111111111111111111111111111111111111111111111111111",
                "tokenId": "42"
            }"#,
        )
        .unwrap();
        let submission = MintSubmission::try_from(response).unwrap();
        assert_eq!(submission.token_id, U256::from(42));
    }

    #[test]
    fn test_submission_missing_hash_is_malformed() {
        let response = MintResponse {
            success: true,
            tx_hash: None,
            token_id: Some("1".into()),
        };
        assert!(matches!(
            MintSubmission::try_from(response),
            Err(FetchError::Malformed { .. })
        ));
    }

    #[test]
    fn test_state_serializes_snake_case() {
        let json = serde_json::to_string(&MintState::AwaitingApproval).unwrap();
        assert_eq!(json, "\"awaiting_approval\"");
    }
}
