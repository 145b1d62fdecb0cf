//! Deposit and withdrawal instruction parameters
//!
//! A plan is everything the execution collaborator needs to submit an add
//! or remove instruction. Building one performs every validation up front,
//! so a request that fails here never reaches the ledger.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;
use types::{
    AmountConverter, BaseUnitAmount, LiquidityError, PoolId, PoolSide, PoolState, Result,
    SlippageTolerance,
};

use crate::ratio::{PoolRatioCalculator, WithdrawalProjection};
use crate::slippage::SlippageBound;

/// Parameters for a paired deposit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddLiquidityPlan {
    pub pool_id: PoolId,
    pub fixed_side: PoolSide,
    /// Paid exactly on the fixed side
    pub fixed_amount: BaseUnitAmount,
    /// Smallest other-side amount the deposit may take
    pub other_amount_min: BaseUnitAmount,
    /// Largest other-side amount the deposit may take
    pub other_amount_max: BaseUnitAmount,
}

impl AddLiquidityPlan {
    /// Most the deposit can debit from `side`
    pub fn max_debit(&self, side: PoolSide) -> BaseUnitAmount {
        if side == self.fixed_side {
            self.fixed_amount
        } else {
            self.other_amount_max
        }
    }
}

/// Parameters for a share redemption
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveLiquidityPlan {
    pub pool_id: PoolId,
    pub share_amount: BaseUnitAmount,
    pub base_amount_min: BaseUnitAmount,
    pub quote_amount_min: BaseUnitAmount,
    /// Expected payout before slippage
    pub projection: WithdrawalProjection,
}

/// Build a deposit of `fixed_amount` (human units) on `fixed_side`
pub fn plan_add_liquidity(
    pool: &PoolState,
    fixed_side: PoolSide,
    fixed_amount: Decimal,
    tolerance: SlippageTolerance,
) -> Result<AddLiquidityPlan> {
    let pair = PoolRatioCalculator::compute_pair_amount(pool, fixed_side, fixed_amount, tolerance)?;

    Ok(AddLiquidityPlan {
        pool_id: pool.pool_id.clone(),
        fixed_side,
        fixed_amount: pair.fixed_amount,
        other_amount_min: pair.min_another_amount,
        other_amount_max: pair.max_another_amount,
    })
}

/// Build a withdrawal of `share_amount` human-unit share tokens
pub fn plan_remove_liquidity(
    pool: &PoolState,
    share_amount: Decimal,
    tolerance: SlippageTolerance,
) -> Result<RemoveLiquidityPlan> {
    let shares = AmountConverter::to_base_units(share_amount, pool.share.decimals)?;
    plan_remove_liquidity_units(pool, shares, tolerance)
}

/// Build a withdrawal of `share_amount` base-unit share tokens
///
/// Rejects a share amount above the outstanding supply, and any per-asset
/// minimum above what the pool currently holds.
pub fn plan_remove_liquidity_units(
    pool: &PoolState,
    share_amount: BaseUnitAmount,
    tolerance: SlippageTolerance,
) -> Result<RemoveLiquidityPlan> {
    tolerance.validate()?;

    if share_amount.is_zero() {
        return Err(LiquidityError::ZeroAmount);
    }
    if !pool.is_empty() && share_amount > pool.share_supply {
        return Err(LiquidityError::insufficient(
            "share redemption",
            share_amount,
            pool.share_supply,
        ));
    }

    let projection = PoolRatioCalculator::project_withdrawal(pool, share_amount)?;

    let base_amount_min = SlippageBound::minimum_acceptable(projection.base_amount, tolerance)?;
    let quote_amount_min = SlippageBound::minimum_acceptable(projection.quote_amount, tolerance)?;

    for (side, min) in [
        (PoolSide::Base, base_amount_min),
        (PoolSide::Quote, quote_amount_min),
    ] {
        let available = pool.reserve(side);
        if min > available {
            return Err(LiquidityError::insufficient(
                format!("{} minimum for withdrawal", side),
                min,
                available,
            ));
        }
    }

    debug!(
        pool = %pool.pool_id,
        shares = %share_amount,
        base_min = %base_amount_min,
        quote_min = %quote_amount_min,
        tolerance = %tolerance,
        "Planned withdrawal"
    );

    Ok(RemoveLiquidityPlan {
        pool_id: pool.pool_id.clone(),
        share_amount,
        base_amount_min,
        quote_amount_min,
        projection,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use types::{AssetDescriptor, ProgramId};

    fn pool(base: u128, quote: u128, supply: u128) -> PoolState {
        PoolState {
            pool_id: PoolId::new("Pool1111"),
            program_id: ProgramId::new("Amm11111"),
            base: AssetDescriptor::new("MintA111", 6),
            quote: AssetDescriptor::new("MintB111", 6),
            base_reserve: BaseUnitAmount(base),
            quote_reserve: BaseUnitAmount(quote),
            share_supply: BaseUnitAmount(supply),
            share: AssetDescriptor::new("MintLp11", 6),
        }
    }

    #[test]
    fn test_add_liquidity_plan() {
        let pool = pool(1_000_000_000, 2_000_000_000, 1_414_213_562);
        let plan = plan_add_liquidity(
            &pool,
            PoolSide::Base,
            dec!(1),
            SlippageTolerance::from_percent(1).unwrap(),
        )
        .unwrap();

        assert_eq!(plan.pool_id, pool.pool_id);
        assert_eq!(plan.fixed_amount, BaseUnitAmount(1_000_000));
        assert_eq!(plan.other_amount_min, BaseUnitAmount(1_980_000));
        assert_eq!(plan.other_amount_max, BaseUnitAmount(2_020_000));
        assert_eq!(plan.max_debit(PoolSide::Base), BaseUnitAmount(1_000_000));
        assert_eq!(plan.max_debit(PoolSide::Quote), BaseUnitAmount(2_020_000));
    }

    #[test]
    fn test_remove_liquidity_plan() {
        let pool = pool(1_000_000, 2_000_000, 500_000);
        let plan = plan_remove_liquidity(
            &pool,
            dec!(0.01),
            SlippageTolerance::from_percent(1).unwrap(),
        )
        .unwrap();

        assert_eq!(plan.share_amount, BaseUnitAmount(10_000));
        assert_eq!(plan.projection.base_amount, BaseUnitAmount(20_000));
        assert_eq!(plan.projection.quote_amount, BaseUnitAmount(40_000));
        assert_eq!(plan.base_amount_min, BaseUnitAmount(19_800));
        assert_eq!(plan.quote_amount_min, BaseUnitAmount(39_600));
    }

    #[test]
    fn test_remove_rejects_zero_and_oversized() {
        let pool = pool(1_000_000, 2_000_000, 500_000);
        assert_eq!(
            plan_remove_liquidity_units(&pool, BaseUnitAmount::ZERO, SlippageTolerance::ZERO),
            Err(LiquidityError::ZeroAmount)
        );
        assert!(matches!(
            plan_remove_liquidity_units(&pool, BaseUnitAmount(500_001), SlippageTolerance::ZERO),
            Err(LiquidityError::InsufficientLiquidity { .. })
        ));
    }

    #[test]
    fn test_remove_from_empty_pool_checks_reserves() {
        // No shares outstanding: 1:1 projection, but nothing to pay it from
        let pool = pool(0, 0, 0);
        let err = plan_remove_liquidity_units(&pool, BaseUnitAmount(1_000), SlippageTolerance::ZERO)
            .unwrap_err();

        match err {
            LiquidityError::InsufficientLiquidity {
                required,
                available,
                ..
            } => {
                assert_eq!(required, "1000");
                assert_eq!(available, "0");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_tolerance_fails_before_math() {
        let pool = pool(1_000_000, 2_000_000, 500_000);
        let bad = SlippageTolerance {
            numerator: 2,
            denominator: 1,
        };
        assert!(matches!(
            plan_remove_liquidity_units(&pool, BaseUnitAmount(10), bad),
            Err(LiquidityError::InvalidTolerance { .. })
        ));
        assert!(matches!(
            plan_add_liquidity(&pool, PoolSide::Base, dec!(1), bad),
            Err(LiquidityError::InvalidTolerance { .. })
        ));
    }
}
