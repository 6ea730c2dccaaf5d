// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Access-check records and the `/access-check` wire format

use alloy_primitives::U256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::FetchError;
use crate::types::address::WalletAddress;

/// Successful response body of `GET /access-check?address=…`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessCheckResponse {
    /// Whether the address holds the gating token
    pub has_access: bool,
    /// Token balance as a decimal string
    pub balance: String,
    /// The address that was checked
    pub address: String,
    /// When the backend performed the check (epoch milliseconds)
    pub checked_at: i64,
}

/// Error body returned by both endpoints with a non-2xx status
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    /// Free-form error message
    pub error: String,
}

/// Cached answer to "does this address currently have access"
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRecord {
    /// The address this record belongs to
    pub address: WalletAddress,
    /// Whether the address holds the gating token
    pub has_access: bool,
    /// Token balance, when known. Records written after a mint have no
    /// balance until the next backend check.
    pub balance: Option<U256>,
    /// When the answer was produced
    pub checked_at: DateTime<Utc>,
}

impl AccessRecord {
    /// Record written immediately after a successful mint, before the backend
    /// has had a chance to observe the new token.
    pub fn granted_by_mint(address: WalletAddress) -> Self {
        Self {
            address,
            has_access: true,
            balance: None,
            checked_at: Utc::now(),
        }
    }
}

impl TryFrom<AccessCheckResponse> for AccessRecord {
    type Error = FetchError;

    fn try_from(response: AccessCheckResponse) -> Result<Self, Self::Error> {
        let address = WalletAddress::parse(&response.address)
            .map_err(|e| FetchError::malformed(format!("address field: {e}")))?;
        let balance = U256::from_str_radix(&response.balance, 10).map_err(|e| {
            FetchError::malformed(format!("balance `{}`: {e}", response.balance))
        })?;
        let checked_at = DateTime::<Utc>::from_timestamp_millis(response.checked_at)
            .ok_or_else(|| {
                FetchError::malformed(format!("checkedAt out of range: {}", response.checked_at))
            })?;

        Ok(Self {
            address,
            has_access: response.has_access,
            balance: Some(balance),
            checked_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(balance: &str) -> AccessCheckResponse {
        AccessCheckResponse {
            has_access: true,
            balance: balance.to_string(),
            address: "0xAbCdEf0123456789aBcDeF0123456789AbCdEf01".to_string(),
            checked_at: 1_735_689_600_000,
        }
    }

    #[test]
    fn test_deserialize_camel_case_body() {
        let body = r#"{
            "hasAccess": false,
            "balance": "0",
            "address": "0xabcdef0123456789abcdef0123456789abcdef01",
            "checkedAt": 1735689600000
        }"#;
        let parsed: AccessCheckResponse = serde_json::from_str(body).unwrap();
        assert!(!parsed.has_access);
        assert_eq!(parsed.checked_at, 1_735_689_600_000);
    }

    #[test]
    fn test_record_from_response() {
        let record = AccessRecord::try_from(response("2")).unwrap();
        assert!(record.has_access);
        assert_eq!(record.balance, Some(U256::from(2)));
        assert_eq!(
            record.address.to_string(),
            "0xabcdef0123456789abcdef0123456789abcdef01"
        );
        assert_eq!(record.checked_at.timestamp_millis(), 1_735_689_600_000);
    }

    #[test]
    fn test_non_decimal_balance_is_malformed() {
        let err = AccessRecord::try_from(response("two")).unwrap_err();
        assert!(matches!(err, FetchError::Malformed { .. }));
    }

    #[test]
    fn test_missing_field_fails_to_decode() {
        let body = r#"{ "hasAccess": true, "address": "0x00" }"#;
        assert!(serde_json::from_str::<AccessCheckResponse>(body).is_err());
    }
}
