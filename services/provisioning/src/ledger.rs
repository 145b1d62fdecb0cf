//! Read-only ledger access

use async_trait::async_trait;
use types::{AccountId, AssetDescriptor, AssetId, BaseUnitAmount, MarketId, PoolId, PoolState};

use crate::errors::LedgerError;

/// Snapshot reads against the ledger
///
/// Every call returns state as of the call; nothing is cached between
/// calls, so callers fetch a fresh [`PoolState`] right before planning.
#[async_trait]
pub trait LedgerReader: Send + Sync {
    async fn pool_state(&self, pool: &PoolId) -> Result<PoolState, LedgerError>;

    async fn asset_descriptor(&self, asset: &AssetId) -> Result<AssetDescriptor, LedgerError>;

    /// Base and quote mints a market trades
    async fn market_mints(&self, market: &MarketId) -> Result<(AssetId, AssetId), LedgerError>;

    /// Token balance `owner` holds of `asset`; zero when it holds no account
    async fn balance(&self, owner: &AccountId, asset: &AssetId) -> Result<BaseUnitAmount, LedgerError>;
}
