//! Precision Handling for Asset Amounts
//!
//! Converts between human-facing decimal quantities and the integer base
//! units the ledger actually stores.
//!
//! ## Precision by Asset
//!
//! - **SOL**: 9 decimal places (`1 SOL = 1_000_000_000 lamports`)
//! - **USDC**: 6 decimal places (`1 USDC = 1_000_000 units`)
//! - **Test mints**: 6 decimal places
//!
//! ## Critical Rules
//!
//! 1. **NO FLOATING POINT**: amounts never pass through f32/f64
//! 2. **Truncate toward zero**: never submit more than was authorized
//! 3. **Exact inverse**: base units → decimal loses nothing, the factor is a power of ten
//!
//! ## Example Usage
//!
//! ```rust
//! use types::precision::{parse_decimal, AmountConverter};
//! use types::BaseUnitAmount;
//!
//! let one = parse_decimal("1.5").unwrap();
//! let units = AmountConverter::to_base_units(one, 6u8).unwrap();
//! assert_eq!(units, BaseUnitAmount(1_500_000));
//!
//! let back = AmountConverter::to_decimal(units, 6u8).unwrap();
//! assert_eq!(back, one);
//! ```

use crate::common::errors::{LiquidityError, Result};
use crate::common::fixed_point::BaseUnitAmount;
use rust_decimal::{Decimal, RoundingStrategy};

/// Largest decimal-places count a [`Decimal`] can carry
pub const MAX_DECIMALS: u32 = 28;

/// Parse user or test input into an exact decimal
///
/// Inputs with more significant digits than a [`Decimal`] holds are
/// rejected rather than silently rounded.
pub fn parse_decimal(input: &str) -> Result<Decimal> {
    Decimal::from_str_exact(input.trim()).map_err(|_| LiquidityError::InvalidDecimal {
        input: input.to_string(),
    })
}

/// Scales amounts between decimal and base-unit representations
pub struct AmountConverter;

impl AmountConverter {
    /// `round_toward_zero(amount × 10^decimals)`
    ///
    /// Works on the decimal's integer mantissa directly, so the scaling
    /// never rounds and large amounts at 18 decimals don't overflow the
    /// 96-bit decimal range.
    pub fn to_base_units(amount: Decimal, decimals: impl Into<i64>) -> Result<BaseUnitAmount> {
        let decimals = validate_decimals(decimals.into())?;

        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(LiquidityError::InvalidAmount {
                value: amount.to_string(),
            });
        }

        let mantissa = amount.mantissa().unsigned_abs();
        let scale = amount.scale();

        let raw = if decimals >= scale {
            mantissa
                .checked_mul(pow10(decimals - scale))
                .ok_or_else(|| {
                    LiquidityError::overflow(format!(
                        "{} at {} decimals exceeds base-unit range",
                        amount, decimals
                    ))
                })?
        } else {
            // Dropping fractional digits below the asset's precision
            mantissa / pow10(scale - decimals)
        };

        Ok(BaseUnitAmount(raw))
    }

    /// `amount / 10^decimals`, exact
    pub fn to_decimal(amount: BaseUnitAmount, decimals: impl Into<i64>) -> Result<Decimal> {
        let decimals = validate_decimals(decimals.into())?;

        let mantissa = i128::try_from(amount.raw())
            .map_err(|_| LiquidityError::overflow(format!("{} exceeds decimal range", amount)))?;

        Decimal::try_from_i128_with_scale(mantissa, decimals).map_err(|_| {
            LiquidityError::overflow(format!(
                "{} at {} decimals exceeds decimal range",
                amount, decimals
            ))
        })
    }

    /// Drop digits beyond `decimals` fractional places (toward zero)
    pub fn truncate(amount: Decimal, decimals: impl Into<i64>) -> Result<Decimal> {
        let decimals = validate_decimals(decimals.into())?;
        Ok(amount.round_dp_with_strategy(decimals, RoundingStrategy::ToZero))
    }

    /// One whole unit of an asset in base units (`10^decimals`)
    pub fn one_unit(decimals: impl Into<i64>) -> Result<BaseUnitAmount> {
        let decimals = validate_decimals(decimals.into())?;
        Ok(BaseUnitAmount(pow10(decimals)))
    }
}

fn validate_decimals(decimals: i64) -> Result<u32> {
    if !(0..=MAX_DECIMALS as i64).contains(&decimals) {
        return Err(LiquidityError::InvalidPrecision {
            decimals,
            max: MAX_DECIMALS,
        });
    }
    Ok(decimals as u32)
}

/// `10^exp` for `exp <= 28`, well inside `u128`
fn pow10(exp: u32) -> u128 {
    10u128.pow(exp)
}
