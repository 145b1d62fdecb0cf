//! Idempotent market and pool provisioning
//!
//! Each resource goes through the same states:
//!
//! ```text
//! Uncached ────────────────────────────► Provisioned
//!     (record found)                         ▲
//! Verifying ──► Reused (identity matches)    │
//!           └─► Stale (mismatch, deleted) ───┘
//! ```
//!
//! A reused resource costs no external call. Markets are provisioned before
//! pools, since a pool is created on top of a market.

use lpkit_config::HarnessConfig;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use types::{
    AmountConverter, AssetDescriptor, AssetId, BaseUnitAmount, LiquidityError, MarketId, PoolId,
    ProgramId,
};

use crate::cache::{CachedResource, Lookup, ResourceCache, ResourceIdentity, ResourceKind};
use crate::creator::{CreatedResource, MarketRequest, MintRequest, PoolRequest, ResourceCreator};
use crate::errors::{CacheError, CreatorError, ProvisionError, Result};
use crate::ledger::LedgerReader;

/// States a resource passes through while being ensured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionState {
    Uncached,
    Verifying,
    Reused,
    Stale,
    Provisioned,
}

/// How an ensured resource came to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// Taken from the cache without any external call
    Reused,
    /// Created by this run
    Created,
    /// Creation reported the account already exists; address recovered
    AlreadyProvisioned,
}

/// An ensured resource and the states it went through
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provisioned<T> {
    pub address: T,
    pub outcome: ProvisionOutcome,
    pub trail: Vec<ProvisionState>,
}

/// Result of a full market-then-pool run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedResources {
    pub market: Provisioned<MarketId>,
    pub pool: Provisioned<PoolId>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Metrics {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub stale_records: u64,
    pub creations: u64,
    pub already_provisioned: u64,
    pub failures: u64,
}

/// What to provision, resolved from [`HarnessConfig`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowSettings {
    pub base: AssetDescriptor,
    pub quote: AssetDescriptor,
    pub lot_size: Decimal,
    pub tick_size: Decimal,
    pub initial_mint_supply: BaseUnitAmount,
    pub market_program: ProgramId,
    pub amm_program: ProgramId,
    pub fee_destination: String,
    /// Token program every pool mint must belong to
    pub token_program: ProgramId,
    pub start_time: u64,
    pub initial_liquidity_exponent: u32,
}

impl WorkflowSettings {
    pub fn from_config(config: &HarnessConfig) -> Self {
        let token_program = ProgramId::new(config.programs.token_program.as_str());

        Self {
            base: AssetDescriptor::new(config.market.base_mint.as_str(), config.market.base_decimals)
                .with_token_program(token_program.clone()),
            quote: AssetDescriptor::new(
                config.market.quote_mint.as_str(),
                config.market.quote_decimals,
            )
            .with_token_program(token_program.clone()),
            lot_size: config.market.lot_size,
            tick_size: config.market.tick_size,
            initial_mint_supply: config.market.initial_mint_supply,
            market_program: ProgramId::new(config.market_program()),
            amm_program: ProgramId::new(config.amm_program()),
            fee_destination: config.fee_destination().to_string(),
            token_program,
            start_time: config.pool.start_time,
            initial_liquidity_exponent: config.pool.initial_liquidity_exponent,
        }
    }
}

/// Orchestrates mint, market and pool creation against the cache
pub struct ProvisioningWorkflow {
    settings: WorkflowSettings,
    cache: ResourceCache,
    ledger: Arc<dyn LedgerReader>,
    creator: Arc<dyn ResourceCreator>,
    metrics: Arc<RwLock<Metrics>>,
}

impl ProvisioningWorkflow {
    /// Create a workflow with the cache location and resources from `config`
    pub fn new(
        config: &HarnessConfig,
        ledger: Arc<dyn LedgerReader>,
        creator: Arc<dyn ResourceCreator>,
    ) -> Result<Self> {
        let cache = ResourceCache::new(&config.cache.dir, config.cache_prefix())?;
        Ok(Self::with_cache(
            WorkflowSettings::from_config(config),
            cache,
            ledger,
            creator,
        ))
    }

    pub fn with_cache(
        settings: WorkflowSettings,
        cache: ResourceCache,
        ledger: Arc<dyn LedgerReader>,
        creator: Arc<dyn ResourceCreator>,
    ) -> Self {
        info!(
            "Provisioning workflow initialized: {}/{} cached in {:?}",
            settings.base.id,
            settings.quote.id,
            cache.dir()
        );

        Self {
            settings,
            cache,
            ledger,
            creator,
            metrics: Arc::new(RwLock::new(Metrics::default())),
        }
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    /// Ensure the market, then the pool on it
    pub async fn provision(&self) -> Result<ProvisionedResources> {
        let market = self.ensure_market().await?;
        let pool = self.ensure_pool(&market.address).await?;

        info!(
            market = %market.address,
            pool = %pool.address,
            "Provisioning complete ({:?}/{:?})",
            market.outcome,
            pool.outcome
        );

        Ok(ProvisionedResources { market, pool })
    }

    /// Ensure both configured mints exist at their configured addresses
    pub async fn ensure_mints(&self) -> Result<(Provisioned<AssetId>, Provisioned<AssetId>)> {
        let base = self
            .ensure_mint(&self.settings.base.id, self.settings.base.decimals)
            .await?;
        let quote = self
            .ensure_mint(&self.settings.quote.id, self.settings.quote.decimals)
            .await?;
        Ok((base, quote))
    }

    /// Create a mint at `address`, treating "already in use" as existing
    pub async fn ensure_mint(&self, address: &AssetId, decimals: u8) -> Result<Provisioned<AssetId>> {
        let identity = ResourceIdentity::mint(address);
        let mut trail = vec![ProvisionState::Uncached];

        let request = MintRequest {
            address: address.clone(),
            decimals,
            initial_supply: self.settings.initial_mint_supply,
        };

        let result = self.creator.create_mint(&request).await.map(|signature| CreatedResource {
            address: address.to_string(),
            accounts: Default::default(),
            signatures: vec![signature],
        });

        let (address, outcome) = self
            .record_creation(
                ResourceKind::Mint,
                identity,
                result,
                Some(address.to_string()),
                &mut trail,
            )
            .await?;

        Ok(Provisioned {
            address: AssetId::new(address),
            outcome,
            trail,
        })
    }

    /// Reuse the cached market for the configured pair or create it
    pub async fn ensure_market(&self) -> Result<Provisioned<MarketId>> {
        let identity = ResourceIdentity::market(&self.settings.base.id, &self.settings.quote.id);
        let mut trail = Vec::new();

        if let Some(address) = self
            .check_cache(ResourceKind::Market, &identity, &mut trail)
            .await?
        {
            return Ok(Provisioned {
                address: MarketId::new(address),
                outcome: ProvisionOutcome::Reused,
                trail,
            });
        }

        let request = MarketRequest {
            base: self.settings.base.clone(),
            quote: self.settings.quote.clone(),
            lot_size: self.settings.lot_size,
            tick_size: self.settings.tick_size,
            program_id: self.settings.market_program.clone(),
        };

        info!("Creating market for [{}]", identity);
        let result = self.creator.create_market(&request).await;

        let (address, outcome) = self
            .record_creation(ResourceKind::Market, identity, result, None, &mut trail)
            .await?;

        Ok(Provisioned {
            address: MarketId::new(address),
            outcome,
            trail,
        })
    }

    /// Reuse the cached pool on `market_id` or create it
    ///
    /// Every check on the new pool's parameters runs before the creation
    /// call, so a rejected request leaves nothing on the ledger.
    pub async fn ensure_pool(&self, market_id: &MarketId) -> Result<Provisioned<PoolId>> {
        let identity =
            ResourceIdentity::pool(&self.settings.base.id, &self.settings.quote.id, market_id);
        let mut trail = Vec::new();

        if let Some(address) = self
            .check_cache(ResourceKind::Pool, &identity, &mut trail)
            .await?
        {
            return Ok(Provisioned {
                address: PoolId::new(address),
                outcome: ProvisionOutcome::Reused,
                trail,
            });
        }

        let request = self.pool_request(market_id).await?;

        info!(
            "Creating pool on market {} with {} {} / {} {}",
            market_id, request.base_amount, request.base.id, request.quote_amount, request.quote.id
        );
        let result = self.creator.create_pool(&request).await;

        let (address, outcome) = self
            .record_creation(ResourceKind::Pool, identity, result, None, &mut trail)
            .await?;

        Ok(Provisioned {
            address: PoolId::new(address),
            outcome,
            trail,
        })
    }

    /// Get current metrics
    pub async fn metrics(&self) -> Metrics {
        self.metrics.read().await.clone()
    }

    async fn check_cache(
        &self,
        kind: ResourceKind,
        identity: &ResourceIdentity,
        trail: &mut Vec<ProvisionState>,
    ) -> Result<Option<String>> {
        let lookup = self.cache.verify(kind, identity)?;
        let mut metrics = self.metrics.write().await;

        match lookup {
            Lookup::Uncached => {
                trail.push(ProvisionState::Uncached);
                metrics.cache_misses += 1;
                debug!("No cached {} for [{}]", kind, identity);
                Ok(None)
            }
            Lookup::Reused(record) => {
                trail.extend([ProvisionState::Verifying, ProvisionState::Reused]);
                metrics.cache_hits += 1;

                let address = record.primary_address().ok_or_else(|| CacheError::Corrupt {
                    path: self.cache.path(kind),
                    reason: format!("missing address.{}", kind.address_key()),
                })?;
                info!("{} {} loaded from cache", kind, address);
                Ok(Some(address.to_string()))
            }
            Lookup::Stale(_) | Lookup::Corrupt(_) => {
                trail.extend([ProvisionState::Verifying, ProvisionState::Stale]);
                metrics.stale_records += 1;
                metrics.cache_misses += 1;
                Ok(None)
            }
        }
    }

    /// Persist a creation result, mapping "already in use" to a recovered address
    async fn record_creation(
        &self,
        kind: ResourceKind,
        identity: ResourceIdentity,
        result: std::result::Result<CreatedResource, CreatorError>,
        intended: Option<String>,
        trail: &mut Vec<ProvisionState>,
    ) -> Result<(String, ProvisionOutcome)> {
        let (record, outcome) = match result {
            Ok(created) => {
                info!("Created {} {} for [{}]", kind, created.address, identity);
                let record = CachedResource::new(kind, identity, created.address)
                    .with_accounts(created.accounts)
                    .with_signatures(created.signatures);
                self.metrics.write().await.creations += 1;
                (record, ProvisionOutcome::Created)
            }
            Err(CreatorError::AlreadyInUse { address }) => match address.or(intended) {
                Some(address) => {
                    warn!("{} {} already exists, continuing", kind, address);
                    self.metrics.write().await.already_provisioned += 1;
                    (
                        CachedResource::new(kind, identity, address),
                        ProvisionOutcome::AlreadyProvisioned,
                    )
                }
                None => {
                    self.metrics.write().await.failures += 1;
                    return Err(ProvisionError::ExternalCallFailure {
                        kind,
                        identity: identity.to_string(),
                        message: "account already in use and its address is unknown".to_string(),
                    });
                }
            },
            Err(e) => {
                warn!("Creating {} for [{}] failed: {}", kind, identity, e);
                self.metrics.write().await.failures += 1;
                return Err(ProvisionError::ExternalCallFailure {
                    kind,
                    identity: identity.to_string(),
                    message: e.to_string(),
                });
            }
        };

        if ResourceKind::CACHED.contains(&kind) {
            self.cache.store(&record)?;
        }
        trail.push(ProvisionState::Provisioned);

        let address = record
            .primary_address()
            .map(str::to_string)
            .unwrap_or_default();
        Ok((address, outcome))
    }

    async fn pool_request(&self, market_id: &MarketId) -> Result<PoolRequest> {
        let (base_mint, quote_mint) = self.ledger.market_mints(market_id).await?;
        if base_mint != self.settings.base.id || quote_mint != self.settings.quote.id {
            return Err(ProvisionError::UnsupportedResourceType {
                kind: ResourceKind::Market,
                detail: format!(
                    "market {} trades {}/{}, expected {}/{}",
                    market_id, base_mint, quote_mint, self.settings.base.id, self.settings.quote.id
                ),
            });
        }

        let (base, quote) = tokio::try_join!(
            self.ledger.asset_descriptor(&base_mint),
            self.ledger.asset_descriptor(&quote_mint),
        )?;

        for asset in [&base, &quote] {
            if asset.token_program.as_ref() != Some(&self.settings.token_program) {
                return Err(ProvisionError::UnsupportedResourceType {
                    kind: ResourceKind::Mint,
                    detail: format!(
                        "mint {} belongs to token program {}; pools on an order-book market only accept {} mints",
                        asset.id,
                        asset
                            .token_program
                            .as_ref()
                            .map(ProgramId::as_str)
                            .unwrap_or("<unknown>"),
                        self.settings.token_program
                    ),
                });
            }
        }

        let exponent = self.settings.initial_liquidity_exponent;
        let base_amount = initial_reserve(base.decimals, exponent)?;
        let quote_amount = initial_reserve(quote.decimals, exponent)?;
        check_initial_liquidity(base_amount, quote_amount, base.decimals)?;

        Ok(PoolRequest {
            market_id: market_id.clone(),
            base,
            quote,
            base_amount,
            quote_amount,
            start_time: self.settings.start_time,
            program_id: self.settings.amm_program.clone(),
            market_program_id: self.settings.market_program.clone(),
            fee_destination: self.settings.fee_destination.clone(),
        })
    }
}

/// `(10^decimals)^exponent` base units
pub fn initial_reserve(decimals: u8, exponent: u32) -> Result<BaseUnitAmount> {
    let unit = AmountConverter::one_unit(decimals)?;
    unit.raw()
        .checked_pow(exponent)
        .map(BaseUnitAmount)
        .ok_or_else(|| {
            LiquidityError::overflow(format!("(10^{})^{} initial reserve", decimals, exponent))
                .into()
        })
}

/// Reject pools whose `base × quote` does not exceed `(10^base_decimals)^2`
pub fn check_initial_liquidity(
    base_amount: BaseUnitAmount,
    quote_amount: BaseUnitAmount,
    base_decimals: u8,
) -> Result<()> {
    let threshold = initial_reserve(base_decimals, 2)?;
    // A product beyond u128 is certainly above the threshold
    let sufficient = match base_amount.raw().checked_mul(quote_amount.raw()) {
        Some(product) => product > threshold.raw(),
        None => true,
    };

    if !sufficient {
        return Err(ProvisionError::InitialLiquidityTooLow {
            base: base_amount.to_string(),
            quote: quote_amount.to_string(),
            threshold: threshold.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_reserve() {
        assert_eq!(initial_reserve(6, 2).unwrap(), BaseUnitAmount(1_000_000_000_000));
        assert_eq!(initial_reserve(0, 2).unwrap(), BaseUnitAmount(1));
        assert!(matches!(
            initial_reserve(28, 2),
            Err(ProvisionError::Liquidity(LiquidityError::Overflow { .. }))
        ));
    }

    #[test]
    fn test_initial_liquidity_threshold() {
        let base = initial_reserve(6, 2).unwrap();
        let quote = initial_reserve(6, 2).unwrap();
        assert!(check_initial_liquidity(base, quote, 6).is_ok());

        // A zero-decimal quote contributes a factor of 1
        let quote = initial_reserve(0, 2).unwrap();
        assert!(matches!(
            check_initial_liquidity(base, quote, 6),
            Err(ProvisionError::InitialLiquidityTooLow { .. })
        ));
    }
}
