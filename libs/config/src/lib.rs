//! # lpkit Configuration
//!
//! Layered configuration for the provisioning harness plus the cluster
//! endpoints and program addresses it falls back to.
//!
//! ## Features
//!
//! - **Layered loading**: base TOML, `environments/<env>.toml` overlay, `LPKIT__` env vars
//! - **Cluster defaults**: RPC/websocket URLs, AMM and market programs, cache prefix
//! - **Validation**: catches bad mints, decimals and slippage before anything is submitted
//!
//! ## Usage
//!
//! ```rust,no_run
//! use lpkit_config::{load_config, Cluster};
//!
//! let config = load_config(None, Some("devnet")).unwrap();
//! if config.network.cluster == Cluster::Devnet {
//!     println!("rpc: {}", config.network.rpc_url());
//! }
//! ```

pub mod defaults;
pub mod harness_config;

// Re-export commonly used types
pub use harness_config::{
    load_config, CacheConfig, Cluster, HarnessConfig, LiquidityConfig, LogConfig, MarketConfig,
    NetworkConfig, PoolConfig, ProgramsConfig,
};
