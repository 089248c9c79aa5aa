//! Domain primitives: Address, TxHash, BlockRef, EventContext.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when an address string is not 20 hex-encoded bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressParseError {
    #[error("address must be 0x-prefixed, got {0:?}")]
    MissingPrefix(String),
    #[error("address must be 20 bytes, got {0}")]
    BadLength(usize),
    #[error("address is not valid hex: {0}")]
    BadHex(String),
}

/// 20-byte account or contract address.
///
/// Sharding and batch partitioning read the raw bytes, so the address is
/// kept in binary form and only rendered as lowercase hex at the edges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; 20]);

impl Address {
    /// The zero address (native token / unset marker).
    pub const ZERO: Address = Address([0u8; 20]);

    /// Create an Address from raw bytes.
    pub fn new(bytes: [u8; 20]) -> Self {
        Address(bytes)
    }

    /// Parse a `0x`-prefixed hex address (case-insensitive).
    pub fn parse(s: &str) -> Result<Self, AddressParseError> {
        let hex_part = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| AddressParseError::MissingPrefix(s.to_string()))?;
        let bytes = hex::decode(hex_part).map_err(|e| AddressParseError::BadHex(e.to_string()))?;
        let bytes: [u8; 20] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| AddressParseError::BadLength(bytes.len()))?;
        Ok(Address(bytes))
    }

    /// Borrow the raw address bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Transaction hash, normalized to lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct TxHash(String);

impl TxHash {
    pub fn new(hash: impl Into<String>) -> Self {
        TxHash(hash.into().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TxHash {
    fn from(value: String) -> Self {
        TxHash::new(value)
    }
}

impl From<TxHash> for String {
    fn from(value: TxHash) -> Self {
        value.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Block boundary delivered by the host: number and unix timestamp (seconds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockRef {
    pub number: u64,
    pub timestamp: u64,
}

impl BlockRef {
    pub fn new(number: u64, timestamp: u64) -> Self {
        BlockRef { number, timestamp }
    }
}

/// Position of a single log inside the canonical chain order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventContext {
    pub block: BlockRef,
    pub tx_hash: TxHash,
    pub log_index: u32,
}

impl EventContext {
    pub fn new(block: BlockRef, tx_hash: TxHash, log_index: u32) -> Self {
        EventContext {
            block,
            tx_hash,
            log_index,
        }
    }
}
