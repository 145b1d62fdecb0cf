//! Asset and pool snapshots as read from the ledger

use crate::common::fixed_point::BaseUnitAmount;
use crate::common::identifiers::{AssetId, PoolId, ProgramId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Mint identity plus its fixed decimal-places count
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDescriptor {
    pub id: AssetId,
    pub decimals: u8,
    /// Token program owning the mint, when the ledger reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_program: Option<ProgramId>,
}

impl AssetDescriptor {
    pub fn new(id: impl Into<AssetId>, decimals: u8) -> Self {
        Self {
            id: id.into(),
            decimals,
            token_program: None,
        }
    }

    pub fn with_token_program(mut self, program: impl Into<ProgramId>) -> Self {
        self.token_program = Some(program.into());
        self
    }
}

/// Which side of the pair an amount is pinned to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolSide {
    Base,
    Quote,
}

impl PoolSide {
    pub fn other(self) -> Self {
        match self {
            PoolSide::Base => PoolSide::Quote,
            PoolSide::Quote => PoolSide::Base,
        }
    }
}

impl fmt::Display for PoolSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolSide::Base => f.write_str("base"),
            PoolSide::Quote => f.write_str("quote"),
        }
    }
}

/// Point-in-time pool snapshot
///
/// Reserves move with every trade, so a `PoolState` is only valid for the
/// computation it was fetched for. Never hold one across operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolState {
    pub pool_id: PoolId,
    /// AMM program that owns the pool account
    pub program_id: ProgramId,
    pub base: AssetDescriptor,
    pub quote: AssetDescriptor,
    pub base_reserve: BaseUnitAmount,
    pub quote_reserve: BaseUnitAmount,
    /// Outstanding share (LP) token supply
    pub share_supply: BaseUnitAmount,
    pub share: AssetDescriptor,
}

impl PoolState {
    pub fn asset(&self, side: PoolSide) -> &AssetDescriptor {
        match side {
            PoolSide::Base => &self.base,
            PoolSide::Quote => &self.quote,
        }
    }

    pub fn reserve(&self, side: PoolSide) -> BaseUnitAmount {
        match side {
            PoolSide::Base => self.base_reserve,
            PoolSide::Quote => self.quote_reserve,
        }
    }

    /// No share tokens outstanding
    pub fn is_empty(&self) -> bool {
        self.share_supply.is_zero()
    }
}
