//! Harness Configuration Module
//!
//! Loads the harness configuration from a base TOML file, an optional
//! environment overlay and `LPKIT__` environment variables, in that order of
//! precedence (last wins). Every field has a default, so a missing base file
//! yields a devnet configuration.

use anyhow::{bail, Context, Result};
use config_crate::{Config, Environment, File};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use types::{BaseUnitAmount, PoolSide, SlippageTolerance};

use crate::defaults;

/// Default base configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/lpkit.toml";

/// Environment variable prefix; nested keys use `__`, e.g. `LPKIT__NETWORK__CLUSTER`
pub const ENV_PREFIX: &str = "LPKIT";

/// Which network the harness talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cluster {
    #[default]
    Devnet,
    Mainnet,
    Localnet,
}

impl Cluster {
    pub fn default_rpc_url(self) -> &'static str {
        match self {
            Cluster::Devnet => defaults::network::DEVNET_RPC_URL,
            Cluster::Mainnet => defaults::network::MAINNET_RPC_URL,
            Cluster::Localnet => defaults::network::LOCALNET_RPC_URL,
        }
    }

    pub fn default_ws_url(self) -> &'static str {
        match self {
            Cluster::Devnet => defaults::network::DEVNET_WS_URL,
            Cluster::Mainnet => defaults::network::MAINNET_WS_URL,
            Cluster::Localnet => defaults::network::LOCALNET_WS_URL,
        }
    }

    /// Cache file-name prefix for this cluster
    pub fn cache_prefix(self) -> &'static str {
        match self {
            Cluster::Devnet => defaults::cache::DEVNET_PREFIX,
            Cluster::Mainnet | Cluster::Localnet => "",
        }
    }

    /// Program creating AMM v4 pools
    pub fn amm_program(self) -> &'static str {
        match self {
            Cluster::Devnet => defaults::programs::DEVNET_AMM_V4,
            Cluster::Mainnet | Cluster::Localnet => defaults::programs::AMM_V4,
        }
    }

    /// Order-book program hosting markets
    pub fn market_program(self) -> &'static str {
        match self {
            Cluster::Devnet => defaults::programs::DEVNET_OPENBOOK_MARKET,
            Cluster::Mainnet | Cluster::Localnet => defaults::programs::OPENBOOK_MARKET,
        }
    }

    pub fn fee_destination(self) -> &'static str {
        match self {
            Cluster::Devnet => defaults::programs::DEVNET_FEE_DESTINATION,
            Cluster::Mainnet | Cluster::Localnet => defaults::programs::FEE_DESTINATION,
        }
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cluster::Devnet => f.write_str("devnet"),
            Cluster::Mainnet => f.write_str("mainnet"),
            Cluster::Localnet => f.write_str("localnet"),
        }
    }
}

/// Main harness configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub log: LogConfig,
    pub network: NetworkConfig,
    pub cache: CacheConfig,
    pub market: MarketConfig,
    pub pool: PoolConfig,
    pub liquidity: LiquidityConfig,
    pub programs: ProgramsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default `tracing` directive when `RUST_LOG` is unset
    pub level: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub cluster: Cluster,
    /// Overrides the cluster's default RPC endpoint
    pub rpc_url: Option<String>,
    pub ws_url: Option<String>,
    pub confirmation_wait_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            cluster: Cluster::default(),
            rpc_url: None,
            ws_url: None,
            confirmation_wait_secs: defaults::network::CONFIRMATION_WAIT_SECS,
        }
    }
}

impl NetworkConfig {
    pub fn rpc_url(&self) -> &str {
        self.rpc_url
            .as_deref()
            .unwrap_or_else(|| self.cluster.default_rpc_url())
    }

    pub fn ws_url(&self) -> &str {
        self.ws_url
            .as_deref()
            .unwrap_or_else(|| self.cluster.default_ws_url())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub dir: PathBuf,
    /// Overrides the cluster-derived file-name prefix
    pub prefix: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(defaults::cache::DEFAULT_DIR),
            prefix: None,
        }
    }
}

/// Market to provision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    pub base_mint: String,
    pub quote_mint: String,
    pub base_decimals: u8,
    pub quote_decimals: u8,
    pub lot_size: Decimal,
    pub tick_size: Decimal,
    /// Minted to the wallet when the harness creates the mints itself
    pub initial_mint_supply: BaseUnitAmount,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            base_mint: String::new(),
            quote_mint: String::new(),
            base_decimals: defaults::market::DECIMALS,
            quote_decimals: defaults::market::DECIMALS,
            lot_size: defaults::market::LOT_SIZE,
            tick_size: defaults::market::TICK_SIZE,
            initial_mint_supply: BaseUnitAmount(defaults::market::INITIAL_MINT_SUPPLY),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Unix seconds the pool opens for trading, 0 for immediately
    pub start_time: u64,
    pub initial_liquidity_exponent: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            start_time: defaults::pool::START_TIME,
            initial_liquidity_exponent: defaults::pool::INITIAL_LIQUIDITY_EXPONENT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiquidityConfig {
    pub fixed_side: PoolSide,
    pub deposit_amount: Decimal,
    pub withdraw_amount: Decimal,
    pub slippage: SlippageTolerance,
}

impl Default for LiquidityConfig {
    fn default() -> Self {
        Self {
            fixed_side: PoolSide::Base,
            deposit_amount: defaults::liquidity::DEPOSIT_AMOUNT,
            withdraw_amount: defaults::liquidity::WITHDRAW_AMOUNT,
            slippage: SlippageTolerance {
                numerator: defaults::liquidity::SLIPPAGE_PERCENT,
                denominator: 100,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramsConfig {
    /// Token program every pool mint must belong to
    pub token_program: String,
    /// Pool programs liquidity operations accept
    pub valid_amm_programs: Vec<String>,
    pub amm_program: Option<String>,
    pub market_program: Option<String>,
    pub fee_destination: Option<String>,
}

impl Default for ProgramsConfig {
    fn default() -> Self {
        Self {
            token_program: defaults::programs::TOKEN_PROGRAM_ID.to_string(),
            valid_amm_programs: defaults::programs::VALID_AMM_PROGRAMS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            amm_program: None,
            market_program: None,
            fee_destination: None,
        }
    }
}

impl HarnessConfig {
    /// Load configuration from files with environment overrides
    ///
    /// An explicit `base_path` must exist; the default path is optional.
    /// The overlay is read from `environments/<environment>.toml` next to
    /// the base file.
    pub fn load(base_path: Option<&Path>, environment: Option<&str>) -> Result<Self> {
        let (base, required) = match base_path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };

        let mut builder = Config::builder().add_source(File::from(base.as_path()).required(required));

        // Add environment-specific overrides if specified
        if let Some(env) = environment {
            let env_file = base
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join("environments")
                .join(format!("{}.toml", env));

            if env_file.exists() {
                info!("Loading environment config: {:?}", env_file);
                builder = builder.add_source(File::from(env_file));
            } else {
                warn!("Environment config not found: {:?}", env_file);
            }
        }

        // Override with environment variables (LPKIT__ prefix)
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        let config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        debug!(cluster = %config.network.cluster, "Configuration loaded");
        Ok(config)
    }

    /// Expand `~` and `$VARS` in paths and endpoint strings
    pub fn expand_env_vars(&mut self) -> Result<()> {
        let dir = self.cache.dir.to_string_lossy().into_owned();
        let expanded = shellexpand::full(&dir).context("Failed to expand cache dir")?;
        self.cache.dir = PathBuf::from(expanded.as_ref());

        if let Some(rpc) = &self.network.rpc_url {
            let expanded = shellexpand::env(rpc).context("Failed to expand RPC URL")?;
            self.network.rpc_url = Some(expanded.to_string());
        }

        if let Some(ws) = &self.network.ws_url {
            let expanded = shellexpand::env(ws).context("Failed to expand websocket URL")?;
            self.network.ws_url = Some(expanded.to_string());
        }

        Ok(())
    }

    /// Reject configurations that would fail only after an external call
    pub fn validate(&self) -> Result<()> {
        let market = &self.market;

        if market.base_mint.is_empty() || market.quote_mint.is_empty() {
            bail!("market.base_mint and market.quote_mint must both be set");
        }
        if market.base_mint == market.quote_mint {
            bail!("market base and quote mints must differ ({})", market.base_mint);
        }
        for (name, decimals) in [("base", market.base_decimals), ("quote", market.quote_decimals)] {
            if u32::from(decimals) > types::precision::MAX_DECIMALS {
                bail!(
                    "market.{}_decimals = {} exceeds the supported {}",
                    name,
                    decimals,
                    types::precision::MAX_DECIMALS
                );
            }
        }
        if market.lot_size <= Decimal::ZERO || market.tick_size <= Decimal::ZERO {
            bail!(
                "market lot size ({}) and tick size ({}) must be positive",
                market.lot_size,
                market.tick_size
            );
        }

        if self.pool.initial_liquidity_exponent == 0 {
            bail!("pool.initial_liquidity_exponent must be at least 1");
        }

        self.liquidity
            .slippage
            .validate()
            .context("liquidity.slippage")?;
        if self.liquidity.deposit_amount <= Decimal::ZERO
            || self.liquidity.withdraw_amount <= Decimal::ZERO
        {
            bail!("liquidity deposit and withdraw amounts must be positive");
        }

        if self.programs.valid_amm_programs.is_empty() {
            bail!("programs.valid_amm_programs must list at least one program");
        }

        Ok(())
    }

    /// Cache file-name prefix, explicit or derived from the cluster
    pub fn cache_prefix(&self) -> &str {
        self.cache
            .prefix
            .as_deref()
            .unwrap_or_else(|| self.network.cluster.cache_prefix())
    }

    pub fn amm_program(&self) -> &str {
        self.programs
            .amm_program
            .as_deref()
            .unwrap_or_else(|| self.network.cluster.amm_program())
    }

    pub fn market_program(&self) -> &str {
        self.programs
            .market_program
            .as_deref()
            .unwrap_or_else(|| self.network.cluster.market_program())
    }

    pub fn fee_destination(&self) -> &str {
        self.programs
            .fee_destination
            .as_deref()
            .unwrap_or_else(|| self.network.cluster.fee_destination())
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}

/// Convenience function to load configuration with defaults
pub fn load_config(path: Option<&Path>, environment: Option<&str>) -> Result<HarnessConfig> {
    let mut config = HarnessConfig::load(path, environment)?;
    config.expand_env_vars()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::fs;
    use tempfile::tempdir;

    const BASE: &str = r#"
[network]
cluster = "mainnet"
confirmation_wait_secs = 5

[cache]
dir = "/tmp/lpkit-test-cache"

[market]
base_mint = "MintA111"
quote_mint = "MintB111"
base_decimals = 9
tick_size = "0.001"

[liquidity]
deposit_amount = "2.5"
fixed_side = "quote"

[liquidity.slippage]
numerator = 5
denominator = 1000
"#;

    #[test]
    fn test_load_base_config() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("lpkit.toml");
        fs::write(&config_path, BASE).unwrap();

        let config = HarnessConfig::load(Some(&config_path), None).unwrap();

        assert_eq!(config.network.cluster, Cluster::Mainnet);
        assert_eq!(config.network.confirmation_wait_secs, 5);
        assert_eq!(config.network.rpc_url(), defaults::network::MAINNET_RPC_URL);
        assert_eq!(config.cache.dir, PathBuf::from("/tmp/lpkit-test-cache"));
        assert_eq!(config.cache_prefix(), "");
        assert_eq!(config.market.base_decimals, 9);
        // Unset fields keep their defaults
        assert_eq!(config.market.quote_decimals, defaults::market::DECIMALS);
        assert_eq!(config.market.tick_size, dec!(0.001));
        assert_eq!(config.market.lot_size, dec!(1));
        assert_eq!(config.liquidity.deposit_amount, dec!(2.5));
        assert_eq!(config.liquidity.fixed_side, PoolSide::Quote);
        assert_eq!(config.liquidity.slippage, SlippageTolerance::new(5, 1000).unwrap());
        assert_eq!(config.amm_program(), defaults::programs::AMM_V4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_environment_override() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("lpkit.toml");
        fs::write(&config_path, BASE).unwrap();

        let env_dir = dir.path().join("environments");
        fs::create_dir_all(&env_dir).unwrap();
        fs::write(
            env_dir.join("staging.toml"),
            "[network]\ncluster = \"devnet\"\nrpc_url = \"http://staging:8899\"\n",
        )
        .unwrap();

        let config = HarnessConfig::load(Some(&config_path), Some("staging")).unwrap();

        assert_eq!(config.network.cluster, Cluster::Devnet);
        assert_eq!(config.network.rpc_url(), "http://staging:8899");
        assert_eq!(config.network.ws_url(), defaults::network::DEVNET_WS_URL);
        assert_eq!(config.cache_prefix(), "devnet_");
        assert_eq!(config.amm_program(), defaults::programs::DEVNET_AMM_V4);
        // Base values the overlay doesn't touch survive
        assert_eq!(config.market.base_mint, "MintA111");
    }

    #[test]
    fn test_missing_overlay_is_not_fatal() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("lpkit.toml");
        fs::write(&config_path, BASE).unwrap();

        let config = HarnessConfig::load(Some(&config_path), Some("nope")).unwrap();
        assert_eq!(config.network.cluster, Cluster::Mainnet);
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(HarnessConfig::load(Some(&dir.path().join("absent.toml")), None).is_err());
    }

    #[test]
    fn test_defaults() {
        let config = HarnessConfig::default();

        assert_eq!(config.network.cluster, Cluster::Devnet);
        assert_eq!(config.network.rpc_url(), "https://api.devnet.solana.com");
        assert_eq!(config.network.ws_url(), "wss://dapi.devnet.solana.com");
        assert_eq!(config.network.confirmation_wait_secs, 15);
        assert_eq!(config.cache_prefix(), "devnet_");
        assert_eq!(config.pool.initial_liquidity_exponent, 2);
        assert_eq!(config.liquidity.slippage, SlippageTolerance::from_percent(1).unwrap());
        assert_eq!(config.programs.valid_amm_programs.len(), 4);

        // Mints have no sensible default
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = HarnessConfig::default();
        config.market.base_mint = "MintA111".into();
        config.market.quote_mint = "MintB111".into();
        assert!(config.validate().is_ok());

        let mut same_mints = config.clone();
        same_mints.market.quote_mint = "MintA111".into();
        assert!(same_mints.validate().is_err());

        let mut bad_slippage = config.clone();
        bad_slippage.liquidity.slippage = SlippageTolerance {
            numerator: 2,
            denominator: 1,
        };
        assert!(bad_slippage.validate().is_err());

        let mut bad_decimals = config.clone();
        bad_decimals.market.base_decimals = 40;
        assert!(bad_decimals.validate().is_err());

        let mut zero_exponent = config;
        zero_exponent.pool.initial_liquidity_exponent = 0;
        assert!(zero_exponent.validate().is_err());
    }

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("LPKIT_TEST_CACHE_ROOT", "/var/tmp/lpkit");
        let mut config = HarnessConfig::default();
        config.cache.dir = PathBuf::from("$LPKIT_TEST_CACHE_ROOT/cache");
        config.network.rpc_url = Some("http://${LPKIT_TEST_CACHE_ROOT}".into());

        config.expand_env_vars().unwrap();

        assert_eq!(config.cache.dir, PathBuf::from("/var/tmp/lpkit/cache"));
        assert_eq!(config.network.rpc_url(), "http:///var/tmp/lpkit");
    }

    #[test]
    fn test_toml_round_trip() {
        let config = HarnessConfig::default();
        let rendered = config.to_toml().unwrap();
        let back: HarnessConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(back, config);
    }
}
