//! Add and remove liquidity against a provisioned pool
//!
//! Every operation fetches a fresh pool snapshot, plans against it and
//! submits immediately. There is no re-check between planning and
//! submission; the slippage minimums are the only guard against reserves
//! moving in between.

use amm::{plan_add_liquidity, plan_remove_liquidity, AddLiquidityPlan, RemoveLiquidityPlan};
use lpkit_config::HarnessConfig;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};
use types::{AccountId, BaseUnitAmount, PoolId, PoolSide, PoolState, ProgramId, SlippageTolerance, TxSignature};

use crate::cache::ResourceKind;
use crate::creator::ResourceCreator;
use crate::errors::{CreatorError, ProvisionError, Result};
use crate::ledger::LedgerReader;

/// Liquidity parameters resolved from [`HarnessConfig`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquiditySettings {
    /// Wallet whose balances fund deposits and receive withdrawals
    pub owner: AccountId,
    pub slippage: SlippageTolerance,
    pub fixed_side: PoolSide,
    pub deposit_amount: Decimal,
    pub withdraw_amount: Decimal,
    pub valid_amm_programs: HashSet<ProgramId>,
    /// Pause after each submission before reading its effects
    pub confirmation_wait: Duration,
}

impl LiquiditySettings {
    pub fn from_config(config: &HarnessConfig, owner: AccountId) -> Self {
        Self {
            owner,
            slippage: config.liquidity.slippage,
            fixed_side: config.liquidity.fixed_side,
            deposit_amount: config.liquidity.deposit_amount,
            withdraw_amount: config.liquidity.withdraw_amount,
            valid_amm_programs: config
                .programs
                .valid_amm_programs
                .iter()
                .map(|p| ProgramId::new(p.as_str()))
                .collect(),
            confirmation_wait: Duration::from_secs(config.network.confirmation_wait_secs),
        }
    }
}

/// Owner balances relevant to one pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSnapshot {
    pub base: BaseUnitAmount,
    pub quote: BaseUnitAmount,
    pub share: BaseUnitAmount,
}

impl BalanceSnapshot {
    pub fn get(&self, holding: Holding) -> BaseUnitAmount {
        match holding {
            Holding::Base => self.base,
            Holding::Quote => self.quote,
            Holding::Share => self.share,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Holding {
    Base,
    Quote,
    Share,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceChange {
    Increased(BaseUnitAmount),
    Decreased(BaseUnitAmount),
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LiquidityAction {
    Add(AddLiquidityPlan),
    Remove(RemoveLiquidityPlan),
}

/// Submitted operation with the owner's balances around it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityReceipt {
    pub pool_id: PoolId,
    pub signature: TxSignature,
    pub action: LiquidityAction,
    pub before: BalanceSnapshot,
    pub after: BalanceSnapshot,
}

impl LiquidityReceipt {
    pub fn change(&self, holding: Holding) -> BalanceChange {
        let before = self.before.get(holding);
        let after = self.after.get(holding);

        if after > before {
            BalanceChange::Increased(after.abs_diff(before))
        } else if after < before {
            BalanceChange::Decreased(after.abs_diff(before))
        } else {
            BalanceChange::Unchanged
        }
    }
}

/// Plans and submits liquidity operations, one at a time
pub struct LiquidityOperator {
    settings: LiquiditySettings,
    ledger: Arc<dyn LedgerReader>,
    creator: Arc<dyn ResourceCreator>,
}

impl LiquidityOperator {
    pub fn new(
        settings: LiquiditySettings,
        ledger: Arc<dyn LedgerReader>,
        creator: Arc<dyn ResourceCreator>,
    ) -> Self {
        Self {
            settings,
            ledger,
            creator,
        }
    }

    pub fn settings(&self) -> &LiquiditySettings {
        &self.settings
    }

    /// Deposit the configured amount on the configured side
    pub async fn add_liquidity(&self, pool_id: &PoolId) -> Result<LiquidityReceipt> {
        self.add_liquidity_amount(pool_id, self.settings.fixed_side, self.settings.deposit_amount)
            .await
    }

    /// Deposit `amount` (human units) of the `fixed_side` asset plus the
    /// matching amount of the other asset
    pub async fn add_liquidity_amount(
        &self,
        pool_id: &PoolId,
        fixed_side: PoolSide,
        amount: Decimal,
    ) -> Result<LiquidityReceipt> {
        let pool = self.fresh_pool(pool_id).await?;
        let plan = plan_add_liquidity(&pool, fixed_side, amount, self.settings.slippage)?;

        let before = self.snapshot(&pool).await?;
        let signature = self
            .creator
            .add_liquidity(&plan)
            .await
            .map_err(|e| external_failure(pool_id, e))?;
        self.settle().await;
        let after = self.snapshot(&pool).await?;

        let receipt = LiquidityReceipt {
            pool_id: pool_id.clone(),
            signature,
            action: LiquidityAction::Add(plan),
            before,
            after,
        };
        log_receipt("liquidity added", &receipt);
        Ok(receipt)
    }

    /// Redeem the configured amount of share tokens
    pub async fn remove_liquidity(&self, pool_id: &PoolId) -> Result<LiquidityReceipt> {
        self.remove_liquidity_amount(pool_id, self.settings.withdraw_amount)
            .await
    }

    /// Redeem `share_amount` (human units) share tokens for both reserves
    pub async fn remove_liquidity_amount(
        &self,
        pool_id: &PoolId,
        share_amount: Decimal,
    ) -> Result<LiquidityReceipt> {
        let pool = self.fresh_pool(pool_id).await?;
        let plan = plan_remove_liquidity(&pool, share_amount, self.settings.slippage)?;

        let before = self.snapshot(&pool).await?;
        let signature = self
            .creator
            .remove_liquidity(&plan)
            .await
            .map_err(|e| external_failure(pool_id, e))?;
        self.settle().await;
        let after = self.snapshot(&pool).await?;

        let receipt = LiquidityReceipt {
            pool_id: pool_id.clone(),
            signature,
            action: LiquidityAction::Remove(plan),
            before,
            after,
        };
        log_receipt("liquidity withdrawn", &receipt);
        Ok(receipt)
    }

    /// Deposit then withdraw, each against its own fresh snapshot
    pub async fn add_remove_liquidity(
        &self,
        pool_id: &PoolId,
    ) -> Result<(LiquidityReceipt, LiquidityReceipt)> {
        let added = self.add_liquidity(pool_id).await?;
        let removed = self.remove_liquidity(pool_id).await?;
        Ok((added, removed))
    }

    /// Current pool state, rejecting pools outside the AMM allow-list
    pub async fn fresh_pool(&self, pool_id: &PoolId) -> Result<PoolState> {
        let pool = self.ledger.pool_state(pool_id).await?;

        if !self.settings.valid_amm_programs.contains(&pool.program_id) {
            return Err(ProvisionError::UnsupportedResourceType {
                kind: ResourceKind::Pool,
                detail: format!(
                    "pool {} is owned by {}, which is not an AMM pool program",
                    pool_id, pool.program_id
                ),
            });
        }

        debug!(
            pool = %pool_id,
            base_reserve = %pool.base_reserve,
            quote_reserve = %pool.quote_reserve,
            share_supply = %pool.share_supply,
            "Fetched pool state"
        );
        Ok(pool)
    }

    /// Base, quote and share balances, read concurrently
    pub async fn snapshot(&self, pool: &PoolState) -> Result<BalanceSnapshot> {
        let owner = &self.settings.owner;
        let (base, quote, share) = tokio::try_join!(
            self.ledger.balance(owner, &pool.base.id),
            self.ledger.balance(owner, &pool.quote.id),
            self.ledger.balance(owner, &pool.share.id),
        )?;

        Ok(BalanceSnapshot { base, quote, share })
    }

    async fn settle(&self) {
        if !self.settings.confirmation_wait.is_zero() {
            debug!("Waiting {:?} for settlement", self.settings.confirmation_wait);
            sleep(self.settings.confirmation_wait).await;
        }
    }
}

fn external_failure(pool_id: &PoolId, error: CreatorError) -> ProvisionError {
    ProvisionError::ExternalCallFailure {
        kind: ResourceKind::Pool,
        identity: format!("ammId={}", pool_id),
        message: error.to_string(),
    }
}

fn log_receipt(what: &str, receipt: &LiquidityReceipt) {
    info!(
        pool = %receipt.pool_id,
        tx = %receipt.signature,
        "{}: share {} -> {}, base {} -> {}, quote {} -> {}",
        what,
        receipt.before.share,
        receipt.after.share,
        receipt.before.base,
        receipt.after.base,
        receipt.before.quote,
        receipt.after.quote,
    );
}
