//! Core type definitions for the carbon-credit registry
//!
//! Identifiers and quantities as the registry contract exposes them.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use alloy::primitives::{Address, B256, U256};

/// Token quantity (tons CO2e). Always an exact 256-bit integer.
pub type Amount = U256;

/// 32-byte transaction hash
pub type TxHash = B256;

/// Sequential batch identifier assigned by the registry contract.
///
/// Ids start at 1 and are never reused; `nextBatchId` is the exclusive
/// upper bound of the assigned range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(pub u64);

impl BatchId {
    /// First id the contract ever assigns
    pub const FIRST: BatchId = BatchId(1);

    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Token id on the contract side
    pub fn to_u256(&self) -> U256 {
        U256::from(self.0)
    }

    /// Ids in `[1, bound)`, ascending.
    pub fn range_below(bound: BatchId) -> impl Iterator<Item = BatchId> {
        (Self::FIRST.0..bound.0.max(Self::FIRST.0)).map(BatchId)
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for BatchId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(BatchId)
    }
}

impl From<u64> for BatchId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Expiry of a batch. The contract stores `0` for batches that never expire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    Never,
    At(DateTime<Utc>),
}

impl Expiry {
    pub fn from_unix(seconds: u64) -> Self {
        if seconds == 0 {
            return Expiry::Never;
        }
        match i64::try_from(seconds)
            .ok()
            .and_then(|s| Utc.timestamp_opt(s, 0).single())
        {
            Some(at) => Expiry::At(at),
            // Beyond chrono's range: for all practical purposes never
            None => Expiry::Never,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self {
            Expiry::Never => false,
            Expiry::At(at) => now > *at,
        }
    }
}

impl fmt::Display for Expiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expiry::Never => f.write_str("permanent"),
            Expiry::At(at) => write!(f, "{}", at.to_rfc3339()),
        }
    }
}

/// Shorten an address for display: `0x1234...abcd`
pub fn short_address(address: &Address) -> String {
    let full = format!("0x{}", hex::encode(address.as_slice()));
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}

/// Serde module for serializing U256 amounts as decimal strings
pub mod u256_dec {
    use alloy::primitives::U256;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<U256, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        U256::from_str_radix(&s, 10).map_err(serde::de::Error::custom)
    }
}

/// Parse a whole-ton amount the way the contract expects it (no decimals).
pub fn parse_amount(raw: &str) -> Option<Amount> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    U256::from_str_radix(raw, 10).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_below_is_exclusive_and_starts_at_one() {
        let ids: Vec<u64> = BatchId::range_below(BatchId(4)).map(|id| id.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(BatchId::range_below(BatchId(1)).count(), 0);
        assert_eq!(BatchId::range_below(BatchId(0)).count(), 0);
    }

    #[test]
    fn test_expiry_zero_means_never() {
        assert_eq!(Expiry::from_unix(0), Expiry::Never);
        assert!(!Expiry::Never.is_expired_at(Utc::now()));
        assert_eq!(Expiry::Never.to_string(), "permanent");
    }

    #[test]
    fn test_expiry_in_the_past() {
        let expiry = Expiry::from_unix(1_600_000_000);
        assert!(expiry.is_expired_at(Utc::now()));
        let before = Utc.timestamp_opt(1_500_000_000, 0).unwrap();
        assert!(!expiry.is_expired_at(before));
    }

    #[test]
    fn test_short_address() {
        let address: Address = "0xBd214514bdDf69395f6cB69A26557c8C5F0612F5".parse().unwrap();
        assert_eq!(short_address(&address), "0xbd21...12f5");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1500"), Some(U256::from(1500u64)));
        assert_eq!(parse_amount(" 7 "), Some(U256::from(7u64)));
        assert_eq!(parse_amount("1.5"), None);
        assert_eq!(parse_amount("-3"), None);
        assert_eq!(parse_amount(""), None);
        let huge = "115792089237316195423570985008687907853269984665640564039457584007913129639935";
        assert_eq!(parse_amount(huge), Some(U256::MAX));
    }

    #[test]
    fn test_u256_dec_serde() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            #[serde(with = "u256_dec")]
            amount: U256,
        }

        let json = serde_json::to_string(&Wrapper {
            amount: U256::from(42u64),
        })
        .unwrap();
        assert_eq!(json, r#"{"amount":"42"}"#);
        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(back.amount, U256::from(42u64));
    }
}
