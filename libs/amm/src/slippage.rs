//! Slippage bounds on base-unit amounts
//!
//! All bounds are exact integer floor/ceil operations on `u128`. The product
//! `target × numerator` is never formed directly, so any target up to
//! `u128::MAX` is accepted.

use types::{BaseUnitAmount, LiquidityError, Result, SlippageTolerance};

/// Tolerance-derived minimum and maximum acceptable amounts
pub struct SlippageBound;

impl SlippageBound {
    /// `target − floor(target × numerator / denominator)`
    ///
    /// Always `<= target`, and equal to `target` at zero tolerance.
    pub fn minimum_acceptable(
        target: BaseUnitAmount,
        tolerance: SlippageTolerance,
    ) -> Result<BaseUnitAmount> {
        tolerance.validate()?;
        let (floor, _) = scaled_slippage(target.raw(), tolerance);
        Ok(BaseUnitAmount(target.raw().saturating_sub(floor)))
    }

    /// `target + ceil(target × numerator / denominator)`
    ///
    /// Upper bound for the side of a deposit whose exact amount depends on
    /// the pool price at execution time.
    pub fn maximum_acceptable(
        target: BaseUnitAmount,
        tolerance: SlippageTolerance,
    ) -> Result<BaseUnitAmount> {
        tolerance.validate()?;
        let (floor, has_remainder) = scaled_slippage(target.raw(), tolerance);
        let ceil = floor + u128::from(has_remainder);

        target.raw().checked_add(ceil).map(BaseUnitAmount).ok_or_else(|| {
            LiquidityError::overflow(format!(
                "maximum of {} at tolerance {}",
                target, tolerance
            ))
        })
    }
}

/// `floor(target × n / d)` plus whether the division left a remainder
///
/// With `target = q·d + r`: `target × n / d = q·n + r·n / d`. Since `n <= d`,
/// `q·n <= target`, and `r·n < d² <= u64::MAX²` fits in `u128`.
fn scaled_slippage(target: u128, tolerance: SlippageTolerance) -> (u128, bool) {
    let n = u128::from(tolerance.numerator);
    let d = u128::from(tolerance.denominator);

    let q = target / d;
    let r = target % d;
    let rn = r * n;

    (q * n + rn / d, rn % d != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tol(n: u64, d: u64) -> SlippageTolerance {
        SlippageTolerance::new(n, d).unwrap()
    }

    #[test]
    fn test_minimum_acceptable_one_percent() {
        let min = SlippageBound::minimum_acceptable(BaseUnitAmount(2_000_000), tol(1, 100)).unwrap();
        assert_eq!(min, BaseUnitAmount(1_980_000));
    }

    #[test]
    fn test_minimum_floors_the_slippage() {
        // 1% of 999 = 9.99, floor 9 → 990
        let min = SlippageBound::minimum_acceptable(BaseUnitAmount(999), tol(1, 100)).unwrap();
        assert_eq!(min, BaseUnitAmount(990));
    }

    #[test]
    fn test_zero_tolerance_is_identity() {
        let target = BaseUnitAmount(123_456_789);
        assert_eq!(
            SlippageBound::minimum_acceptable(target, SlippageTolerance::ZERO).unwrap(),
            target
        );
        assert_eq!(
            SlippageBound::maximum_acceptable(target, SlippageTolerance::ZERO).unwrap(),
            target
        );
    }

    #[test]
    fn test_full_tolerance_reaches_zero() {
        let min = SlippageBound::minimum_acceptable(BaseUnitAmount(5_000), tol(1, 1)).unwrap();
        assert_eq!(min, BaseUnitAmount::ZERO);
    }

    #[test]
    fn test_maximum_rounds_up() {
        // 1% of 999 = 9.99, ceil 10 → 1009
        let max = SlippageBound::maximum_acceptable(BaseUnitAmount(999), tol(1, 100)).unwrap();
        assert_eq!(max, BaseUnitAmount(1_009));

        let exact = SlippageBound::maximum_acceptable(BaseUnitAmount(1_000), tol(1, 100)).unwrap();
        assert_eq!(exact, BaseUnitAmount(1_010));
    }

    #[test]
    fn test_huge_targets_do_not_overflow() {
        let target = BaseUnitAmount(u128::MAX);
        let min = SlippageBound::minimum_acceptable(target, tol(u64::MAX - 1, u64::MAX)).unwrap();
        assert!(min <= target);

        assert!(matches!(
            SlippageBound::maximum_acceptable(target, tol(1, 100)),
            Err(LiquidityError::Overflow { .. })
        ));
    }

    #[test]
    fn test_invalid_tolerance_rejected() {
        let over = SlippageTolerance {
            numerator: 3,
            denominator: 2,
        };
        assert!(matches!(
            SlippageBound::minimum_acceptable(BaseUnitAmount(10), over),
            Err(LiquidityError::InvalidTolerance {
                numerator: 3,
                denominator: 2
            })
        ));

        let zero_den = SlippageTolerance {
            numerator: 0,
            denominator: 0,
        };
        assert!(SlippageBound::maximum_acceptable(BaseUnitAmount(10), zero_den).is_err());
    }
}
