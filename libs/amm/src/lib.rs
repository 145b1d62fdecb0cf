//! # lpkit AMM Library - Client-Side Liquidity Math
//!
//! ## Purpose
//!
//! Exact arithmetic that decides what a liquidity instruction submits:
//! slippage-bounded minimums, proportional share redemption and the paired
//! amount for a deposit at the current pool price. Nothing here touches the
//! network; every function takes a [`types::PoolState`] snapshot and returns
//! amounts or a plan.
//!
//! ## Integration Points
//!
//! - **Input Sources**: pool snapshots from the provisioning service's ledger reader
//! - **Output Destinations**: add/remove liquidity plans handed to the resource creator
//! - **Precision**: native per-asset decimals, truncated toward zero on the way back to base units
//!
//! ## Data Flow
//!
//! ```text
//! PoolState ──► PoolRatioCalculator ──► SlippageBound ──► AddLiquidityPlan
//!                   │                                      RemoveLiquidityPlan
//!                   └── AmountConverter (types::precision)
//! ```
//!
//! ## Guarantees
//!
//! - No floating point anywhere; decimals for ratios, `u128` for bounds
//! - A minimum is never above its target, a maximum never below it
//! - Validation errors are raised before any amount leaves this crate

pub mod liquidity;
pub mod ratio;
pub mod slippage;

pub use liquidity::{
    plan_add_liquidity, plan_remove_liquidity, plan_remove_liquidity_units, AddLiquidityPlan,
    RemoveLiquidityPlan,
};
pub use ratio::{PairAmount, PoolRatioCalculator, ShareRatios, WithdrawalProjection};
pub use slippage::SlippageBound;

/// Common types for AMM calculations
pub use rust_decimal::Decimal;
