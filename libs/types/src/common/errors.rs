//! Error types for fixed-point liquidity arithmetic
//!
//! Every variant here is raised before any external call is issued, so an
//! invalid request never leaves partial on-chain state behind.

use thiserror::Error;

/// Errors raised by amount conversion, slippage bounds and pool ratio math
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LiquidityError {
    /// Decimal places outside the representable range
    #[error("Invalid precision: {decimals} decimal places (supported range 0..={max})")]
    InvalidPrecision { decimals: i64, max: u32 },

    /// Slippage fraction above 100% or with a zero denominator
    #[error("Invalid slippage tolerance {numerator}/{denominator}: must be a fraction in [0, 1]")]
    InvalidTolerance { numerator: u64, denominator: u64 },

    /// A computed amount exceeds what the pool currently holds
    #[error("Insufficient liquidity: {context} requires {required} but only {available} available")]
    InsufficientLiquidity {
        context: String,
        required: String,
        available: String,
    },

    /// Liquidity operation requested with a zero amount
    #[error("Amount must be greater than zero")]
    ZeroAmount,

    /// Negative human amount where a non-negative quantity is required
    #[error("Invalid amount {value}: must be non-negative")]
    InvalidAmount { value: String },

    /// Input string does not parse as a decimal number
    #[error("Invalid decimal string: '{input}' - expected numeric format")]
    InvalidDecimal { input: String },

    /// Result is not representable in the integer or decimal range
    #[error("Overflow: {context}")]
    Overflow { context: String },
}

impl LiquidityError {
    pub fn overflow(context: impl Into<String>) -> Self {
        Self::Overflow {
            context: context.into(),
        }
    }

    pub fn insufficient(
        context: impl Into<String>,
        required: impl ToString,
        available: impl ToString,
    ) -> Self {
        Self::InsufficientLiquidity {
            context: context.into(),
            required: required.to_string(),
            available: available.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LiquidityError>;
