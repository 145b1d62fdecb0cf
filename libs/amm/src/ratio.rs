//! Proportional pool math for share redemption and paired deposits
//!
//! Ratios are taken in decimal space (each reserve scaled by its own
//! asset's decimals) and only the final amounts are truncated back to base
//! units. Where possible the product is formed before the division, so
//! ratios that divide exactly stay exact.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;
use types::{
    AmountConverter, BaseUnitAmount, LiquidityError, PoolSide, PoolState, Result,
    SlippageTolerance,
};

use crate::slippage::SlippageBound;

/// Reserve per unit of share token, in decimal space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShareRatios {
    pub base: Decimal,
    pub quote: Decimal,
}

/// Amounts a share redemption is expected to pay out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalProjection {
    pub base_amount: BaseUnitAmount,
    pub quote_amount: BaseUnitAmount,
}

impl WithdrawalProjection {
    pub fn amount(&self, side: PoolSide) -> BaseUnitAmount {
        match side {
            PoolSide::Base => self.base_amount,
            PoolSide::Quote => self.quote_amount,
        }
    }
}

/// Matching amount of the second asset for a fixed deposit of the first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairAmount {
    pub fixed_side: PoolSide,
    /// Exact amount paid on the fixed side
    pub fixed_amount: BaseUnitAmount,
    /// Other-side amount at the snapshot price, before slippage
    pub another_amount: BaseUnitAmount,
    pub min_another_amount: BaseUnitAmount,
    pub max_another_amount: BaseUnitAmount,
}

/// Pool ratio calculations on a single, freshly fetched [`PoolState`]
pub struct PoolRatioCalculator;

impl PoolRatioCalculator {
    /// `reserve / share_supply` for each side
    ///
    /// An empty pool (no shares outstanding) is defined as 1:1 for both
    /// sides rather than a division error.
    pub fn share_ratios(pool: &PoolState) -> Result<ShareRatios> {
        if pool.is_empty() {
            return Ok(ShareRatios {
                base: Decimal::ONE,
                quote: Decimal::ONE,
            });
        }

        let supply = AmountConverter::to_decimal(pool.share_supply, pool.share.decimals)?;
        let ratio = |side: PoolSide| -> Result<Decimal> {
            let reserve = AmountConverter::to_decimal(pool.reserve(side), pool.asset(side).decimals)?;
            reserve
                .checked_div(supply)
                .ok_or_else(|| LiquidityError::overflow(format!("{} reserve / share supply", side)))
        };

        Ok(ShareRatios {
            base: ratio(PoolSide::Base)?,
            quote: ratio(PoolSide::Quote)?,
        })
    }

    /// Amounts redeemed by burning `share_amount` share tokens
    ///
    /// Withdrawing fraction `f` of outstanding shares yields fraction `f` of
    /// each reserve, truncated to base units. Callers must pass a snapshot
    /// fetched immediately before submission.
    pub fn project_withdrawal(
        pool: &PoolState,
        share_amount: BaseUnitAmount,
    ) -> Result<WithdrawalProjection> {
        let shares = AmountConverter::to_decimal(share_amount, pool.share.decimals)?;

        let projection = WithdrawalProjection {
            base_amount: Self::redeemed(pool, shares, PoolSide::Base)?,
            quote_amount: Self::redeemed(pool, shares, PoolSide::Quote)?,
        };

        debug!(
            pool = %pool.pool_id,
            shares = %share_amount,
            base = %projection.base_amount,
            quote = %projection.quote_amount,
            empty = pool.is_empty(),
            "Projected withdrawal"
        );

        Ok(projection)
    }

    fn redeemed(pool: &PoolState, shares: Decimal, side: PoolSide) -> Result<BaseUnitAmount> {
        let decimals = pool.asset(side).decimals;

        if pool.is_empty() {
            return AmountConverter::to_base_units(shares, decimals);
        }

        let reserve = AmountConverter::to_decimal(pool.reserve(side), decimals)?;
        let supply = AmountConverter::to_decimal(pool.share_supply, pool.share.decimals)?;
        let amount = mul_div(shares, reserve, supply).ok_or_else(|| {
            LiquidityError::overflow(format!("{} shares of {} reserve {}", shares, side, reserve))
        })?;

        AmountConverter::to_base_units(amount, decimals)
    }

    /// Other-side amount keeping the pool price for a fixed deposit
    ///
    /// `other = fixed × other_reserve / fixed_reserve`, with the fixed side
    /// paid exactly and the other side bounded by `tolerance` both ways.
    pub fn compute_pair_amount(
        pool: &PoolState,
        fixed_side: PoolSide,
        fixed_amount: Decimal,
        tolerance: SlippageTolerance,
    ) -> Result<PairAmount> {
        tolerance.validate()?;

        let fixed_asset = pool.asset(fixed_side);
        let other_asset = pool.asset(fixed_side.other());

        let fixed_units = AmountConverter::to_base_units(fixed_amount, fixed_asset.decimals)?;
        if fixed_units.is_zero() {
            return Err(LiquidityError::ZeroAmount);
        }

        let fixed_reserve = pool.reserve(fixed_side);
        if fixed_reserve.is_zero() {
            return Err(LiquidityError::insufficient(
                format!("pricing deposit against empty {} reserve", fixed_side),
                fixed_units,
                fixed_reserve,
            ));
        }

        // Price what is actually paid, not digits below the asset's precision
        let fixed = AmountConverter::to_decimal(fixed_units, fixed_asset.decimals)?;
        let fixed_reserve = AmountConverter::to_decimal(fixed_reserve, fixed_asset.decimals)?;
        let other_reserve =
            AmountConverter::to_decimal(pool.reserve(fixed_side.other()), other_asset.decimals)?;

        let other = mul_div(fixed, other_reserve, fixed_reserve).ok_or_else(|| {
            LiquidityError::overflow(format!("pair amount for {} {}", fixed, fixed_side))
        })?;
        let another_amount = AmountConverter::to_base_units(other, other_asset.decimals)?;

        let pair = PairAmount {
            fixed_side,
            fixed_amount: fixed_units,
            another_amount,
            min_another_amount: SlippageBound::minimum_acceptable(another_amount, tolerance)?,
            max_another_amount: SlippageBound::maximum_acceptable(another_amount, tolerance)?,
        };

        debug!(
            pool = %pool.pool_id,
            fixed_side = %fixed_side,
            fixed = %pair.fixed_amount,
            other = %pair.another_amount,
            min = %pair.min_another_amount,
            max = %pair.max_another_amount,
            "Computed pair amount"
        );

        Ok(pair)
    }
}

/// `a × b / c`, multiplying first and dividing first only if the product
/// leaves the decimal range
fn mul_div(a: Decimal, b: Decimal, c: Decimal) -> Option<Decimal> {
    a.checked_mul(b)
        .and_then(|product| product.checked_div(c))
        .or_else(|| b.checked_div(c).and_then(|ratio| a.checked_mul(ratio)))
}
