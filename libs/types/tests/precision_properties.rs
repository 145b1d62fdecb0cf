//! Amount Conversion Property Tests
//!
//! These tests validate properties that must hold for every decimal amount
//! and precision, not just the handful of literals in the unit tests.

use proptest::prelude::*;
use rust_decimal::Decimal;
use types::{AmountConverter, BaseUnitAmount};

prop_compose! {
    /// Non-negative decimal with up to 12 fractional digits, small enough that
    /// its base-unit value at 18 decimals still fits a Decimal mantissa
    fn human_amount()
        (mantissa in 0i64..10_000_000_000i64, scale in 0u32..=12u32) -> Decimal {
        Decimal::new(mantissa, scale)
    }
}

proptest! {
    /// Property: decimal → base units → decimal equals the input truncated to `d` digits
    #[test]
    fn round_trip_is_truncation(amount in human_amount(), decimals in 0u8..=18u8) {
        let units = AmountConverter::to_base_units(amount, decimals).unwrap();
        let back = AmountConverter::to_decimal(units, decimals).unwrap();
        let truncated = AmountConverter::truncate(amount, decimals).unwrap();

        prop_assert_eq!(back, truncated);
        // Never overshoot what was authorized
        prop_assert!(back <= amount, "{} overshoots {}", back, amount);
    }

    /// Property: base units → decimal → base units is the identity
    #[test]
    fn base_units_survive_round_trip(raw in 0u64..u64::MAX, decimals in 0u8..=18u8) {
        let units = BaseUnitAmount::from(raw);
        let decimal = AmountConverter::to_decimal(units, decimals).unwrap();
        prop_assert_eq!(AmountConverter::to_base_units(decimal, decimals).unwrap(), units);
    }

    /// Property: conversion is monotone, larger amounts never yield fewer base units
    #[test]
    fn conversion_is_monotone(a in human_amount(), b in human_amount(), decimals in 0u8..=18u8) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let lo_units = AmountConverter::to_base_units(lo, decimals).unwrap();
        let hi_units = AmountConverter::to_base_units(hi, decimals).unwrap();
        prop_assert!(lo_units <= hi_units);
    }
}
