// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Validated, case-normalized wallet addresses
//!
//! Two case variants of the same address must map to the same cache entry,
//! so every address entering the system is parsed into [`WalletAddress`],
//! which always renders in lower case.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::{hex, Address};
use serde::{Deserialize, Serialize};

use crate::errors::AddressError;

/// Number of hex digits in an address, excluding the `0x` prefix
const ADDRESS_HEX_DIGITS: usize = 40;

/// A wallet address matching `^0x[0-9a-fA-F]{40}$`
///
/// Parsing is strict: the `0x` prefix is required and checksum casing is not
/// enforced. Display and serialization always use lower case.
///
/// # Examples
///
/// ```
/// use tokengate::WalletAddress;
///
/// let upper = WalletAddress::parse("0xABCDEF0123456789ABCDEF0123456789ABCDEF01").unwrap();
/// let lower = WalletAddress::parse("0xabcdef0123456789abcdef0123456789abcdef01").unwrap();
/// assert_eq!(upper, lower);
/// assert_eq!(upper.to_string(), "0xabcdef0123456789abcdef0123456789abcdef01");
///
/// assert!(WalletAddress::parse("abcdef0123456789abcdef0123456789abcdef01").is_err());
/// assert!(WalletAddress::parse("0x1234").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WalletAddress(Address);

impl WalletAddress {
    /// Validate and parse an address string
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        let digits = input
            .strip_prefix("0x")
            .ok_or_else(|| AddressError::MissingPrefix {
                input: input.to_string(),
            })?;

        if digits.len() != ADDRESS_HEX_DIGITS {
            return Err(AddressError::InvalidLength {
                digits: digits.len(),
            });
        }

        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(AddressError::InvalidHex {
                input: input.to_string(),
            });
        }

        let bytes = hex::decode(digits).map_err(|_| AddressError::InvalidHex {
            input: input.to_string(),
        })?;
        Ok(Self(Address::from_slice(&bytes)))
    }

    /// Get the underlying alloy address
    pub const fn as_address(&self) -> Address {
        self.0
    }

    /// Lower-case `0x`-prefixed representation
    pub fn to_lower_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0.as_slice()))
    }
}

impl From<Address> for WalletAddress {
    fn from(address: Address) -> Self {
        Self(address)
    }
}

impl From<WalletAddress> for Address {
    fn from(address: WalletAddress) -> Self {
        address.0
    }
}

impl FromStr for WalletAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for WalletAddress {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<WalletAddress> for String {
    fn from(address: WalletAddress) -> Self {
        address.to_lower_hex()
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_lower_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIXED: &str = "0xAbCdEf0123456789aBcDeF0123456789AbCdEf01";

    #[test]
    fn test_parse_normalizes_case() {
        let address = WalletAddress::parse(MIXED).unwrap();
        assert_eq!(
            address.to_string(),
            "0xabcdef0123456789abcdef0123456789abcdef01"
        );
    }

    #[test]
    fn test_parse_rejects_missing_prefix() {
        let err = WalletAddress::parse(&MIXED[2..]).unwrap_err();
        assert!(matches!(err, AddressError::MissingPrefix { .. }));
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        let err = WalletAddress::parse("0xabc").unwrap_err();
        assert_eq!(err, AddressError::InvalidLength { digits: 3 });

        let too_long = format!("{MIXED}00");
        assert!(matches!(
            WalletAddress::parse(&too_long),
            Err(AddressError::InvalidLength { digits: 42 })
        ));
    }

    #[test]
    fn test_parse_rejects_non_hex() {
        let bad = "0xzzcdef0123456789abcdef0123456789abcdef01";
        assert!(matches!(
            WalletAddress::parse(bad),
            Err(AddressError::InvalidHex { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_surrounding_whitespace() {
        let padded = format!(" {MIXED}");
        assert!(WalletAddress::parse(&padded).is_err());
    }

    #[test]
    fn test_serde_round_trip_is_lower_case() {
        let address = WalletAddress::parse(MIXED).unwrap();
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, "\"0xabcdef0123456789abcdef0123456789abcdef01\"");

        let parsed: WalletAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, address);
        assert!(serde_json::from_str::<WalletAddress>("\"0x12\"").is_err());
    }
}
