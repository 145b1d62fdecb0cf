//! Mutating calls against the exchange
//!
//! Implementations submit and confirm transactions; confirmation and retry
//! policy belong to them. They must classify "account already in use"
//! failures as [`CreatorError::AlreadyInUse`] instead of returning free text.

use amm::{AddLiquidityPlan, RemoveLiquidityPlan};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use types::{AssetDescriptor, AssetId, BaseUnitAmount, MarketId, ProgramId, TxSignature};

use crate::errors::CreatorError;

/// Create a token mint at a fixed address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintRequest {
    pub address: AssetId,
    pub decimals: u8,
    /// Base units minted to the creator's wallet
    pub initial_supply: BaseUnitAmount,
}

/// Create an order-book market for a pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketRequest {
    pub base: AssetDescriptor,
    pub quote: AssetDescriptor,
    pub lot_size: Decimal,
    pub tick_size: Decimal,
    pub program_id: ProgramId,
}

/// Create an AMM pool on an existing market
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolRequest {
    pub market_id: MarketId,
    pub base: AssetDescriptor,
    pub quote: AssetDescriptor,
    pub base_amount: BaseUnitAmount,
    pub quote_amount: BaseUnitAmount,
    /// Unix seconds, 0 opens immediately
    pub start_time: u64,
    pub program_id: ProgramId,
    pub market_program_id: ProgramId,
    pub fee_destination: String,
}

/// Addresses produced by a creation call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedResource {
    /// The resource's own address (market id, amm id)
    pub address: String,
    /// Auxiliary accounts by role (vaults, queues, share mint, ...)
    #[serde(default)]
    pub accounts: BTreeMap<String, String>,
    #[serde(default)]
    pub signatures: Vec<TxSignature>,
}

/// Exchange operations that create or move state
#[async_trait]
pub trait ResourceCreator: Send + Sync {
    async fn create_mint(&self, request: &MintRequest) -> Result<TxSignature, CreatorError>;

    async fn create_market(&self, request: &MarketRequest) -> Result<CreatedResource, CreatorError>;

    async fn create_pool(&self, request: &PoolRequest) -> Result<CreatedResource, CreatorError>;

    async fn add_liquidity(&self, plan: &AddLiquidityPlan) -> Result<TxSignature, CreatorError>;

    async fn remove_liquidity(&self, plan: &RemoveLiquidityPlan) -> Result<TxSignature, CreatorError>;
}
