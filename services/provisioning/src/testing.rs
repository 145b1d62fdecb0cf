//! In-memory exchange for tests and dry runs
//!
//! [`SandboxExchange`] implements both [`LedgerReader`] and
//! [`ResourceCreator`] over plain maps: mints, order-book markets,
//! constant-product pools and wallet balances. It counts every call and can
//! be told to fail the next call of a given kind.

use amm::{AddLiquidityPlan, RemoveLiquidityPlan};
use async_trait::async_trait;
use lpkit_config::{defaults, HarnessConfig};
use std::collections::{BTreeMap, HashMap, VecDeque};
use tokio::sync::Mutex;
use tracing::debug;
use types::{
    AccountId, AssetDescriptor, AssetId, BaseUnitAmount, MarketId, PoolId, PoolSide, PoolState,
    ProgramId, TxSignature,
};

use crate::creator::{CreatedResource, MarketRequest, MintRequest, PoolRequest, ResourceCreator};
use crate::errors::{CreatorError, LedgerError};
use crate::ledger::LedgerReader;

/// Calls the sandbox counts and can fail on demand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SandboxCall {
    CreateMint,
    CreateMarket,
    CreatePool,
    AddLiquidity,
    RemoveLiquidity,
    PoolState,
    Balance,
}

#[derive(Debug, Default)]
struct SandboxState {
    mints: HashMap<AssetId, AssetDescriptor>,
    markets: HashMap<MarketId, (AssetId, AssetId)>,
    pools: HashMap<PoolId, PoolState>,
    pool_by_market: HashMap<MarketId, PoolId>,
    balances: HashMap<(AccountId, AssetId), BaseUnitAmount>,
    calls: HashMap<SandboxCall, usize>,
    faults: HashMap<SandboxCall, VecDeque<CreatorError>>,
    next_id: u64,
}

impl SandboxState {
    fn record(&mut self, call: SandboxCall) -> Result<(), CreatorError> {
        *self.calls.entry(call).or_default() += 1;
        match self.faults.get_mut(&call).and_then(VecDeque::pop_front) {
            Some(fault) => Err(fault),
            None => Ok(()),
        }
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn signature(&mut self) -> TxSignature {
        TxSignature::new(format!("SandboxTx{}", self.next_id()))
    }

    fn balance(&self, owner: &AccountId, asset: &AssetId) -> BaseUnitAmount {
        self.balances
            .get(&(owner.clone(), asset.clone()))
            .copied()
            .unwrap_or_default()
    }

    fn credit(&mut self, owner: &AccountId, asset: &AssetId, amount: BaseUnitAmount) -> Result<(), CreatorError> {
        let entry = self
            .balances
            .entry((owner.clone(), asset.clone()))
            .or_default();
        *entry = entry.checked_add(amount).map_err(|e| rejected(e.to_string()))?;
        Ok(())
    }

    /// Apply every debit and credit to `owner`'s balances, or none of them
    fn transfer(
        &mut self,
        owner: &AccountId,
        debits: &[(&AssetId, BaseUnitAmount)],
        credits: &[(&AssetId, BaseUnitAmount)],
    ) -> Result<(), CreatorError> {
        let mut updated: HashMap<AssetId, BaseUnitAmount> = HashMap::new();

        for (asset, amount) in debits {
            let held = updated
                .get(*asset)
                .copied()
                .unwrap_or_else(|| self.balance(owner, asset));
            let remaining = held.checked_sub(*amount).ok_or_else(|| {
                rejected(format!(
                    "insufficient funds: {} of {} needed, {} held",
                    amount, asset, held
                ))
            })?;
            updated.insert((*asset).clone(), remaining);
        }
        for (asset, amount) in credits {
            let held = updated
                .get(*asset)
                .copied()
                .unwrap_or_else(|| self.balance(owner, asset));
            let total = held
                .checked_add(*amount)
                .map_err(|e| rejected(e.to_string()))?;
            updated.insert((*asset).clone(), total);
        }

        for (asset, amount) in updated {
            self.balances.insert((owner.clone(), asset), amount);
        }
        Ok(())
    }
}

/// In-memory exchange acting for a single wallet
pub struct SandboxExchange {
    owner: AccountId,
    token_program: ProgramId,
    state: Mutex<SandboxState>,
}

impl SandboxExchange {
    pub fn new(owner: AccountId) -> Self {
        Self {
            owner,
            token_program: ProgramId::new(defaults::programs::TOKEN_PROGRAM_ID),
            state: Mutex::new(SandboxState::default()),
        }
    }

    /// Sandbox whose new mints belong to the configured token program
    pub fn for_config(config: &HarnessConfig, owner: AccountId) -> Self {
        Self {
            token_program: ProgramId::new(config.programs.token_program.as_str()),
            ..Self::new(owner)
        }
    }

    pub fn owner(&self) -> &AccountId {
        &self.owner
    }

    /// Register a mint that exists before the run, e.g. under another token program
    pub async fn register_mint(&self, descriptor: AssetDescriptor) {
        self.state
            .lock()
            .await
            .mints
            .insert(descriptor.id.clone(), descriptor);
    }

    /// Make the next call of `call` fail with `error`
    pub async fn fail_next(&self, call: SandboxCall, error: CreatorError) {
        self.state
            .lock()
            .await
            .faults
            .entry(call)
            .or_default()
            .push_back(error);
    }

    /// How many times `call` has been made
    pub async fn calls(&self, call: SandboxCall) -> usize {
        self.state.lock().await.calls.get(&call).copied().unwrap_or(0)
    }

    pub async fn pool(&self, pool_id: &PoolId) -> Option<PoolState> {
        self.state.lock().await.pools.get(pool_id).cloned()
    }

    /// Move a pool's reserves as an outside trade would
    pub async fn set_reserves(
        &self,
        pool_id: &PoolId,
        base: BaseUnitAmount,
        quote: BaseUnitAmount,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.lock().await;
        let pool = state.pools.get_mut(pool_id).ok_or_else(|| LedgerError::NotFound {
            what: format!("pool {}", pool_id),
        })?;
        pool.base_reserve = base;
        pool.quote_reserve = quote;
        Ok(())
    }
}

#[async_trait]
impl LedgerReader for SandboxExchange {
    async fn pool_state(&self, pool: &PoolId) -> Result<PoolState, LedgerError> {
        let mut state = self.state.lock().await;
        *state.calls.entry(SandboxCall::PoolState).or_default() += 1;
        state.pools.get(pool).cloned().ok_or_else(|| LedgerError::NotFound {
            what: format!("pool {}", pool),
        })
    }

    async fn asset_descriptor(&self, asset: &AssetId) -> Result<AssetDescriptor, LedgerError> {
        let state = self.state.lock().await;
        state.mints.get(asset).cloned().ok_or_else(|| LedgerError::NotFound {
            what: format!("mint {}", asset),
        })
    }

    async fn market_mints(&self, market: &MarketId) -> Result<(AssetId, AssetId), LedgerError> {
        let state = self.state.lock().await;
        state
            .markets
            .get(market)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound {
                what: format!("market {}", market),
            })
    }

    async fn balance(&self, owner: &AccountId, asset: &AssetId) -> Result<BaseUnitAmount, LedgerError> {
        let mut state = self.state.lock().await;
        *state.calls.entry(SandboxCall::Balance).or_default() += 1;
        Ok(state.balance(owner, asset))
    }
}

#[async_trait]
impl ResourceCreator for SandboxExchange {
    async fn create_mint(&self, request: &MintRequest) -> Result<TxSignature, CreatorError> {
        let mut state = self.state.lock().await;
        state.record(SandboxCall::CreateMint)?;

        // Mint creation reports the collision without naming the account
        if state.mints.contains_key(&request.address) {
            return Err(CreatorError::AlreadyInUse { address: None });
        }

        let descriptor = AssetDescriptor::new(request.address.clone(), request.decimals)
            .with_token_program(self.token_program.clone());
        state.mints.insert(request.address.clone(), descriptor);
        state.credit(&self.owner, &request.address, request.initial_supply)?;

        debug!("Sandbox minted {} {}", request.initial_supply, request.address);
        Ok(state.signature())
    }

    async fn create_market(&self, request: &MarketRequest) -> Result<CreatedResource, CreatorError> {
        let mut state = self.state.lock().await;
        state.record(SandboxCall::CreateMarket)?;

        for asset in [&request.base, &request.quote] {
            if !state.mints.contains_key(&asset.id) {
                return Err(rejected(format!("mint {} does not exist", asset.id)));
            }
        }

        let id = state.next_id();
        let market_id = MarketId::new(format!("SandboxMarket{}", id));
        state
            .markets
            .insert(market_id.clone(), (request.base.id.clone(), request.quote.id.clone()));

        let accounts = ["requestQueue", "eventQueue", "bids", "asks", "baseVault", "quoteVault"]
            .iter()
            .map(|role| (role.to_string(), format!("{}{}", role, id)))
            .collect();
        let signature = state.signature();

        Ok(CreatedResource {
            address: market_id.into_inner(),
            accounts,
            signatures: vec![signature],
        })
    }

    async fn create_pool(&self, request: &PoolRequest) -> Result<CreatedResource, CreatorError> {
        let mut state = self.state.lock().await;
        state.record(SandboxCall::CreatePool)?;

        if !state.markets.contains_key(&request.market_id) {
            return Err(rejected(format!("market {} does not exist", request.market_id)));
        }
        // The pool address is derived from the market, so a second pool collides
        if let Some(existing) = state.pool_by_market.get(&request.market_id) {
            return Err(CreatorError::AlreadyInUse {
                address: Some(existing.to_string()),
            });
        }

        let product = request
            .base_amount
            .raw()
            .checked_mul(request.quote_amount.raw())
            .ok_or_else(|| rejected("initial reserves overflow"))?;
        let share_supply = BaseUnitAmount(isqrt(product));

        let id = state.next_id();
        let pool_id = PoolId::new(format!("SandboxPool{}", id));
        let share = AssetDescriptor::new(format!("SandboxLp{}", id), request.base.decimals)
            .with_token_program(self.token_program.clone());

        state.transfer(
            &self.owner,
            &[
                (&request.base.id, request.base_amount),
                (&request.quote.id, request.quote_amount),
            ],
            &[(&share.id, share_supply)],
        )?;
        state.mints.insert(share.id.clone(), share.clone());

        let mut accounts = BTreeMap::new();
        accounts.insert("programId".to_string(), request.program_id.to_string());
        accounts.insert("marketId".to_string(), request.market_id.to_string());
        accounts.insert("lpMint".to_string(), share.id.to_string());
        accounts.insert("coinMint".to_string(), request.base.id.to_string());
        accounts.insert("pcMint".to_string(), request.quote.id.to_string());

        state.pools.insert(
            pool_id.clone(),
            PoolState {
                pool_id: pool_id.clone(),
                program_id: request.program_id.clone(),
                base: request.base.clone(),
                quote: request.quote.clone(),
                base_reserve: request.base_amount,
                quote_reserve: request.quote_amount,
                share_supply,
                share,
            },
        );
        state
            .pool_by_market
            .insert(request.market_id.clone(), pool_id.clone());
        let signature = state.signature();

        Ok(CreatedResource {
            address: pool_id.into_inner(),
            accounts,
            signatures: vec![signature],
        })
    }

    async fn add_liquidity(&self, plan: &AddLiquidityPlan) -> Result<TxSignature, CreatorError> {
        let mut state = self.state.lock().await;
        state.record(SandboxCall::AddLiquidity)?;

        let pool = state
            .pools
            .get(&plan.pool_id)
            .cloned()
            .ok_or_else(|| rejected(format!("pool {} does not exist", plan.pool_id)))?;

        let fixed_side = plan.fixed_side;
        let fixed_reserve = pool.reserve(fixed_side).raw();
        let other_reserve = pool.reserve(fixed_side.other()).raw();
        if fixed_reserve == 0 {
            return Err(rejected("pool has no reserves to price against"));
        }

        let fixed = plan.fixed_amount.raw();
        let other = mul_div(fixed, other_reserve, fixed_reserve)?;
        if other < plan.other_amount_min.raw() || other > plan.other_amount_max.raw() {
            return Err(rejected(format!(
                "exceeds desired slippage limit: other amount {} outside [{}, {}]",
                other, plan.other_amount_min, plan.other_amount_max
            )));
        }
        let minted = mul_div(fixed, pool.share_supply.raw(), fixed_reserve)?;

        let (base_in, quote_in) = match fixed_side {
            PoolSide::Base => (fixed, other),
            PoolSide::Quote => (other, fixed),
        };
        let base_reserve = checked_add(pool.base_reserve.raw(), base_in)?;
        let quote_reserve = checked_add(pool.quote_reserve.raw(), quote_in)?;
        let share_supply = checked_add(pool.share_supply.raw(), minted)?;

        state.transfer(
            &self.owner,
            &[
                (&pool.base.id, BaseUnitAmount(base_in)),
                (&pool.quote.id, BaseUnitAmount(quote_in)),
            ],
            &[(&pool.share.id, BaseUnitAmount(minted))],
        )?;

        if let Some(pool) = state.pools.get_mut(&plan.pool_id) {
            pool.base_reserve = BaseUnitAmount(base_reserve);
            pool.quote_reserve = BaseUnitAmount(quote_reserve);
            pool.share_supply = BaseUnitAmount(share_supply);
        }

        Ok(state.signature())
    }

    async fn remove_liquidity(&self, plan: &RemoveLiquidityPlan) -> Result<TxSignature, CreatorError> {
        let mut state = self.state.lock().await;
        state.record(SandboxCall::RemoveLiquidity)?;

        let pool = state
            .pools
            .get(&plan.pool_id)
            .cloned()
            .ok_or_else(|| rejected(format!("pool {} does not exist", plan.pool_id)))?;

        let shares = plan.share_amount.raw();
        let supply = pool.share_supply.raw();
        if shares == 0 || shares > supply {
            return Err(rejected(format!("cannot redeem {} of {} shares", shares, supply)));
        }

        let base_out = mul_div(shares, pool.base_reserve.raw(), supply)?;
        let quote_out = mul_div(shares, pool.quote_reserve.raw(), supply)?;
        if base_out < plan.base_amount_min.raw() || quote_out < plan.quote_amount_min.raw() {
            return Err(rejected(format!(
                "exceeds desired slippage limit: payout {}/{} below minimum {}/{}",
                base_out, quote_out, plan.base_amount_min, plan.quote_amount_min
            )));
        }

        // Payouts never exceed reserves since shares ≤ supply
        state.transfer(
            &self.owner,
            &[(&pool.share.id, plan.share_amount)],
            &[
                (&pool.base.id, BaseUnitAmount(base_out)),
                (&pool.quote.id, BaseUnitAmount(quote_out)),
            ],
        )?;

        if let Some(pool) = state.pools.get_mut(&plan.pool_id) {
            pool.base_reserve = BaseUnitAmount(pool.base_reserve.raw() - base_out);
            pool.quote_reserve = BaseUnitAmount(pool.quote_reserve.raw() - quote_out);
            pool.share_supply = BaseUnitAmount(supply - shares);
        }

        Ok(state.signature())
    }
}

fn rejected(message: impl Into<String>) -> CreatorError {
    CreatorError::Rejected {
        message: message.into(),
    }
}

fn checked_add(a: u128, b: u128) -> Result<u128, CreatorError> {
    a.checked_add(b).ok_or_else(|| rejected("reserve overflow"))
}

/// `floor(a × b / c)`
fn mul_div(a: u128, b: u128, c: u128) -> Result<u128, CreatorError> {
    a.checked_mul(b)
        .map(|product| product / c)
        .ok_or_else(|| rejected("amount overflow"))
}

/// Integer square root, `floor(sqrt(n))`
fn isqrt(n: u128) -> u128 {
    if n < 2 {
        return n;
    }
    let mut x = n;
    let mut y = (x + 1) / 2;
    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }
    x
}
