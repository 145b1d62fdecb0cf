//! # lpkit Provisioning
//!
//! Idempotent creation of an order-book market and the AMM pool on top of
//! it, plus add/remove liquidity against that pool.
//!
//! ## Integration Points
//!
//! - **Ledger reads**: [`LedgerReader`] supplies pool, mint, market and balance snapshots
//! - **Ledger writes**: [`ResourceCreator`] submits creations and liquidity transactions
//! - **Persistence**: [`ResourceCache`] keeps one JSON record per resource kind
//! - **Math**: plans come from the `amm` crate; nothing here rounds amounts itself
//!
//! ## Data Flow
//!
//! ```text
//! HarnessConfig ──► ProvisioningWorkflow ──► ResourceCache (market, pool)
//!                        │        │
//!                        │        └──► ResourceCreator (only on a miss)
//!                        ▼
//!                   LedgerReader (market mints, token programs)
//!
//! PoolId ──► LiquidityOperator ──► fresh PoolState ──► amm plan ──► ResourceCreator
//!                                        ▲                               │
//!                                        └──── balance snapshots ◄───────┘
//! ```
//!
//! The [`testing`] module provides an in-memory exchange implementing both
//! collaborator traits.

pub mod cache;
pub mod creator;
pub mod errors;
pub mod ledger;
pub mod liquidity;
pub mod testing;
pub mod workflow;

pub use cache::{CachedResource, Lookup, ResourceCache, ResourceIdentity, ResourceKind};
pub use creator::{CreatedResource, MarketRequest, MintRequest, PoolRequest, ResourceCreator};
pub use errors::{CacheError, CreatorError, LedgerError, ProvisionError, Result};
pub use ledger::LedgerReader;
pub use liquidity::{
    BalanceChange, BalanceSnapshot, Holding, LiquidityAction, LiquidityOperator, LiquidityReceipt,
    LiquiditySettings,
};
pub use workflow::{
    check_initial_liquidity, initial_reserve, Metrics, ProvisionOutcome, ProvisionState,
    Provisioned, ProvisionedResources, ProvisioningWorkflow, WorkflowSettings,
};
