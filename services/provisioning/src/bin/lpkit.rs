//! lpkit command-line harness
//!
//! Prints the effective configuration, inspects the resource cache, plans
//! liquidity operations against given reserves, and runs the full
//! provision → deposit → withdraw flow against the in-memory exchange.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use amm::{plan_add_liquidity, plan_remove_liquidity};
use lpkit_config::{load_config, HarnessConfig, LogConfig};
use provisioning::testing::SandboxExchange;
use provisioning::{
    LiquidityOperator, LiquiditySettings, ProvisioningWorkflow, ResourceCache, ResourceKind,
};
use types::{AccountId, AssetDescriptor, BaseUnitAmount, PoolId, PoolSide, PoolState, ProgramId, SlippageTolerance};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "lpkit")]
#[command(about = "Market/pool provisioning and liquidity harness")]
struct Args {
    /// Configuration file path (defaults to config/lpkit.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Environment overlay (devnet, mainnet, ...)
    #[arg(short, long, global = true)]
    environment: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the effective configuration as TOML
    Config,

    /// Inspect or reset the resource cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Plan a liquidity operation against the given pool reserves
    Plan {
        #[command(flatten)]
        pool: PoolArgs,

        /// Slippage tolerance in basis points (defaults to the configured tolerance)
        #[arg(long)]
        slippage_bps: Option<u64>,

        #[command(subcommand)]
        operation: PlanOperation,
    },

    /// Provision, deposit and withdraw against an in-memory exchange
    Sandbox {
        /// Provisioning passes to run; later passes reuse the cache
        #[arg(long, default_value_t = 2)]
        runs: u32,
    },
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    /// Print cached records as JSON
    Show,
    /// Delete every cached record
    Clear,
}

#[derive(Subcommand, Debug)]
enum PlanOperation {
    /// Deposit `amount` of one side plus the matching other side
    Deposit {
        #[arg(long, value_enum, default_value_t = Side::Base)]
        side: Side,
        #[arg(long)]
        amount: Decimal,
    },
    /// Redeem `shares` share tokens
    Withdraw {
        #[arg(long)]
        shares: Decimal,
    },
}

#[derive(clap::Args, Debug)]
struct PoolArgs {
    /// Base reserve in base units
    #[arg(long)]
    base_reserve: u128,
    /// Quote reserve in base units
    #[arg(long)]
    quote_reserve: u128,
    /// Outstanding share supply in base units
    #[arg(long)]
    share_supply: u128,
    #[arg(long, default_value_t = 6)]
    base_decimals: u8,
    #[arg(long, default_value_t = 6)]
    quote_decimals: u8,
    /// Share-token decimals (defaults to the base decimals)
    #[arg(long)]
    share_decimals: Option<u8>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Side {
    Base,
    Quote,
}

impl From<Side> for PoolSide {
    fn from(side: Side) -> Self {
        match side {
            Side::Base => PoolSide::Base,
            Side::Quote => PoolSide::Quote,
        }
    }
}

impl PoolArgs {
    fn pool_state(&self) -> PoolState {
        PoolState {
            pool_id: PoolId::new("cli"),
            program_id: ProgramId::default(),
            base: AssetDescriptor::new("base", self.base_decimals),
            quote: AssetDescriptor::new("quote", self.quote_decimals),
            base_reserve: BaseUnitAmount(self.base_reserve),
            quote_reserve: BaseUnitAmount(self.quote_reserve),
            share_supply: BaseUnitAmount(self.share_supply),
            share: AssetDescriptor::new("share", self.share_decimals.unwrap_or(self.base_decimals)),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref(), args.environment.as_deref())
        .context("Failed to load configuration")?;
    init_tracing(&config.log)?;

    match args.command {
        Command::Config => {
            print!("{}", config.to_toml()?);
        }
        Command::Cache { action } => run_cache(&config, action)?,
        Command::Plan {
            pool,
            slippage_bps,
            operation,
        } => {
            let slippage = match slippage_bps {
                Some(bps) => SlippageTolerance::from_bps(bps)?,
                None => config.liquidity.slippage,
            };
            run_plan(&pool, slippage, operation)?;
        }
        Command::Sandbox { runs } => run_sandbox(config, runs).await?,
    }

    Ok(())
}

fn init_tracing(log: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&log.level))
        .context("Invalid log level")?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if log.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
    Ok(())
}

fn run_cache(config: &HarnessConfig, action: CacheAction) -> Result<()> {
    let cache = ResourceCache::new(&config.cache.dir, config.cache_prefix())?;

    match action {
        CacheAction::Show => {
            let records = cache.list()?;
            if records.is_empty() {
                info!("No cached resources in {:?}", cache.dir());
            }
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        CacheAction::Clear => {
            let removed = cache.clear()?;
            info!(
                "Removed {} cached record(s) ({} kinds tracked) from {:?}",
                removed,
                ResourceKind::CACHED.len(),
                cache.dir()
            );
        }
    }
    Ok(())
}

fn run_plan(pool: &PoolArgs, slippage: SlippageTolerance, operation: PlanOperation) -> Result<()> {
    let state = pool.pool_state();

    let rendered = match operation {
        PlanOperation::Deposit { side, amount } => {
            let plan = plan_add_liquidity(&state, side.into(), amount, slippage)?;
            serde_json::to_string_pretty(&plan)?
        }
        PlanOperation::Withdraw { shares } => {
            let plan = plan_remove_liquidity(&state, shares, slippage)?;
            serde_json::to_string_pretty(&plan)?
        }
    };
    println!("{}", rendered);
    Ok(())
}

async fn run_sandbox(mut config: HarnessConfig, runs: u32) -> Result<()> {
    if config.market.base_mint.is_empty() {
        config.market.base_mint = "SandboxBaseMint".to_string();
    }
    if config.market.quote_mint.is_empty() {
        config.market.quote_mint = "SandboxQuoteMint".to_string();
    }
    config.validate()?;

    let owner = AccountId::new("SandboxWallet");
    let exchange = Arc::new(SandboxExchange::for_config(&config, owner.clone()));
    let workflow = ProvisioningWorkflow::new(&config, exchange.clone(), exchange.clone())?;

    workflow.ensure_mints().await?;

    // The sandbox exchange never resets between runs, so a cache left behind
    // by an earlier invocation would point at resources it does not hold
    workflow.cache().clear()?;

    let mut provisioned = None;
    for run in 1..=runs.max(1) {
        let resources = workflow.provision().await?;
        info!(
            "Run {}: market {} ({:?}), pool {} ({:?})",
            run,
            resources.market.address,
            resources.market.outcome,
            resources.pool.address,
            resources.pool.outcome
        );
        provisioned = Some(resources);
    }
    let pool_id = provisioned
        .map(|resources| resources.pool.address)
        .context("No provisioning run completed")?;

    let mut settings = LiquiditySettings::from_config(&config, owner);
    settings.confirmation_wait = Duration::ZERO;
    let operator = LiquidityOperator::new(settings, exchange.clone(), exchange);

    let (added, removed) = operator.add_remove_liquidity(&pool_id).await?;
    println!("{}", serde_json::to_string_pretty(&[&added, &removed])?);

    let metrics = workflow.metrics().await;
    info!(
        "Cache hits {}, misses {}, creations {}",
        metrics.cache_hits, metrics.cache_misses, metrics.creations
    );
    Ok(())
}
