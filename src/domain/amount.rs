//! Signed 256-bit token amount backed by ethnum.
//!
//! On-chain balances are uint256 and deltas can be negative, so amounts are
//! carried as I256 and rendered as canonical base-10 strings (no exponent,
//! no leading `+`).

use crate::error::MathError;
use ethnum::{AsI256, I256, U256};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Integer token amount in base units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(I256);

impl Amount {
    pub const ZERO: Amount = Amount(I256::ZERO);

    /// Wrap a raw I256.
    pub fn new(value: I256) -> Self {
        Amount(value)
    }

    /// The additive identity (0).
    pub fn zero() -> Self {
        Amount::ZERO
    }

    /// Build from an unsigned on-chain quantity.
    ///
    /// # Errors
    /// Returns `MathError::Overflow` when the value does not fit in 255 bits.
    pub fn from_unsigned(value: U256) -> Result<Self, MathError> {
        if value.leading_zeros() == 0 {
            return Err(MathError::Overflow);
        }
        Ok(Amount(value.as_i256()))
    }

    /// Unsigned view of a non-negative amount, `None` when negative.
    pub fn to_unsigned(&self) -> Option<U256> {
        if self.is_negative() {
            None
        } else {
            Some(self.0.as_u256())
        }
    }

    /// Parse a base-10 integer string.
    ///
    /// # Errors
    /// Returns an error if the string is not a valid integer in range.
    pub fn from_str_canonical(s: &str) -> Result<Self, std::num::ParseIntError> {
        I256::from_str_radix(s.trim(), 10).map(Amount)
    }

    pub fn to_canonical_string(&self) -> String {
        self.0.to_string()
    }

    /// Get the underlying I256.
    pub fn inner(&self) -> I256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == I256::ZERO
    }

    pub fn is_positive(&self) -> bool {
        self.0 > I256::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.0 < I256::ZERO
    }

    pub fn checked_add(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_add(rhs.0).map(Amount)
    }

    pub fn checked_sub(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_sub(rhs.0).map(Amount)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_canonical(s)
    }
}

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Amount(I256::from(value))
    }
}

impl From<i128> for Amount {
    fn from(value: i128) -> Self {
        Amount(I256::from(value))
    }
}

impl From<u128> for Amount {
    fn from(value: u128) -> Self {
        Amount(value.as_i256())
    }
}

// Strings keep full 256-bit precision through JSON.
impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_canonical_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Amount::from_str_canonical(&s).map_err(serde::de::Error::custom)
    }
}

impl std::ops::Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Amount) -> Amount {
        Amount(self.0 - rhs.0)
    }
}

impl std::ops::Neg for Amount {
    type Output = Amount;

    fn neg(self) -> Amount {
        Amount(-self.0)
    }
}

/// Serde adapter rendering a U256 as a base-10 string.
pub mod u256_string {
    use ethnum::U256;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let s = String::deserialize(deserializer)?;
        U256::from_str_radix(s.trim(), 10).map_err(serde::de::Error::custom)
    }
}

/// Concatenate input and reward amounts in ledger order.
pub fn concat_amounts(inputs: &[Amount], rewards: &[Amount]) -> Vec<Amount> {
    let mut out = Vec::with_capacity(inputs.len() + rewards.len());
    out.extend_from_slice(inputs);
    out.extend_from_slice(rewards);
    out
}
