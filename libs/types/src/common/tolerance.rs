//! Slippage tolerance as an exact rational fraction

use crate::common::errors::{LiquidityError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum acceptable adverse deviation, `numerator / denominator`
///
/// Kept as integers so bounds derived from it are exact floor/ceil
/// operations. `1/100` is 1%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlippageTolerance {
    pub numerator: u64,
    pub denominator: u64,
}

impl SlippageTolerance {
    /// Zero slippage (`0/1`)
    pub const ZERO: Self = Self {
        numerator: 0,
        denominator: 1,
    };

    /// Create a validated tolerance
    ///
    /// Tolerances above 100% are rejected instead of clamped; they indicate
    /// a caller bug.
    pub fn new(numerator: u64, denominator: u64) -> Result<Self> {
        let tolerance = Self {
            numerator,
            denominator,
        };
        tolerance.validate()?;
        Ok(tolerance)
    }

    /// Tolerance in percent, e.g. `from_percent(1)` = 1/100
    pub fn from_percent(percent: u64) -> Result<Self> {
        Self::new(percent, 100)
    }

    /// Tolerance in basis points, e.g. `from_bps(50)` = 0.5%
    pub fn from_bps(bps: u64) -> Result<Self> {
        Self::new(bps, 10_000)
    }

    /// Check `denominator > 0` and `numerator <= denominator`
    ///
    /// Values deserialized from configuration bypass [`SlippageTolerance::new`],
    /// so consumers call this before using them.
    pub fn validate(&self) -> Result<()> {
        if self.denominator == 0 || self.numerator > self.denominator {
            return Err(LiquidityError::InvalidTolerance {
                numerator: self.numerator,
                denominator: self.denominator,
            });
        }
        Ok(())
    }

    pub fn is_zero(&self) -> bool {
        self.numerator == 0
    }
}

impl Default for SlippageTolerance {
    fn default() -> Self {
        // 1%, the harness default for deposits
        Self {
            numerator: 1,
            denominator: 100,
        }
    }
}

impl fmt::Display for SlippageTolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}
