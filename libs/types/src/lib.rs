//! # lpkit Types Library
//!
//! Amount, asset and pool types shared by the liquidity math and the
//! provisioning workflow.
//!
//! ## Design Philosophy
//!
//! - **No Precision Loss**: human quantities are [`Decimal`], ledger quantities are integer [`BaseUnitAmount`]
//! - **Truncating Conversions**: decimal → base units always rounds toward zero
//! - **Type Safety**: distinct address wrappers prevent passing a pool where a mint is expected
//! - **Clear Boundaries**: one converter owns every decimal ⇄ integer crossing
//!
//! ## Quick Start
//!
//! ```rust
//! use types::{AmountConverter, BaseUnitAmount, SlippageTolerance};
//! use types::precision::parse_decimal;
//!
//! let amount = parse_decimal("2.5").unwrap();
//! let units = AmountConverter::to_base_units(amount, 6u8).unwrap();
//! assert_eq!(units, BaseUnitAmount(2_500_000));
//!
//! let tolerance = SlippageTolerance::from_percent(1).unwrap();
//! assert_eq!(tolerance.to_string(), "1/100");
//! ```

pub mod common;

// Precision module for decimal ⇄ base-unit conversion
pub mod precision;

// Re-export common types for convenience
pub use common::errors::LiquidityError;
pub use common::fixed_point::BaseUnitAmount;
pub use common::identifiers::{AccountId, AssetId, MarketId, PoolId, ProgramId, TxSignature};
pub use common::pool::{AssetDescriptor, PoolSide, PoolState};
pub use common::tolerance::SlippageTolerance;
pub use precision::AmountConverter;

/// Human-facing decimal quantity
pub use rust_decimal::Decimal;

/// Human-facing decimal quantity (alias used in liquidity APIs)
pub type DecimalAmount = Decimal;

// Define Result type alias
pub type Result<T> = std::result::Result<T, LiquidityError>;
