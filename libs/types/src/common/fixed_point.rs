//! Integer base-unit amounts
//!
//! A [`BaseUnitAmount`] is the smallest indivisible unit of an asset, the
//! same integer the ledger stores. It is unsigned, so the `>= 0` invariant
//! holds by construction, and all arithmetic on it is checked.

use crate::common::errors::{LiquidityError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Amount of an asset in base units (e.g. `1 USDC = BaseUnitAmount(1_000_000)`)
///
/// Serialized as a decimal string so values above `u64::MAX` survive JSON
/// round trips through tools that read numbers as doubles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BaseUnitAmount(pub u128);

impl BaseUnitAmount {
    pub const ZERO: Self = Self(0);

    pub const fn new(raw: u128) -> Self {
        Self(raw)
    }

    /// Get the raw integer value
    pub const fn raw(self) -> u128 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Result<Self> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or_else(|| LiquidityError::overflow(format!("{} + {}", self, other)))
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// Subtraction clamped at zero
    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Unsigned distance between two balances, used for before/after deltas
    pub fn abs_diff(self, other: Self) -> Self {
        Self(self.0.abs_diff(other.0))
    }

    /// Narrow to `u64`, the width most ledgers use for token amounts
    pub fn to_u64(self) -> Result<u64> {
        u64::try_from(self.0)
            .map_err(|_| LiquidityError::overflow(format!("{} does not fit in u64", self)))
    }
}

impl fmt::Display for BaseUnitAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for BaseUnitAmount {
    fn from(raw: u64) -> Self {
        Self(raw as u128)
    }
}

impl From<u128> for BaseUnitAmount {
    fn from(raw: u128) -> Self {
        Self(raw)
    }
}

impl FromStr for BaseUnitAmount {
    type Err = LiquidityError;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .replace('_', "")
            .parse::<u128>()
            .map(Self)
            .map_err(|_| LiquidityError::InvalidDecimal {
                input: s.to_string(),
            })
    }
}

impl Serialize for BaseUnitAmount {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for BaseUnitAmount {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
            Raw::Number(n) => Ok(Self::from(n)),
        }
    }
}
