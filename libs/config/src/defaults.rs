//! Cluster endpoints, program addresses and harness defaults
//!
//! Values a fresh checkout runs with when no configuration file overrides
//! them.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Network defaults
pub mod network {
    pub const DEVNET_RPC_URL: &str = "https://api.devnet.solana.com";
    pub const DEVNET_WS_URL: &str = "wss://dapi.devnet.solana.com";

    pub const MAINNET_RPC_URL: &str = "https://api.mainnet-beta.solana.com";
    pub const MAINNET_WS_URL: &str = "wss://api.mainnet-beta.solana.com";

    pub const LOCALNET_RPC_URL: &str = "http://127.0.0.1:8899";
    pub const LOCALNET_WS_URL: &str = "ws://127.0.0.1:8900";

    /// Seconds to let a submitted transaction settle before reading its effects
    pub const CONFIRMATION_WAIT_SECS: u64 = 15;
}

/// On-chain program addresses
pub mod programs {
    /// Classic SPL token program, the only one AMM v4 pools accept
    pub const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
    pub const TOKEN_2022_PROGRAM_ID: &str = "TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb";

    pub const AMM_V4: &str = "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8";
    pub const AMM_STABLE: &str = "5quBtoiQqxF9Jv6KYKctB59NT3gtJD2Y65kdnB1Uev3h";
    pub const OPENBOOK_MARKET: &str = "srmqPvymJeFKQ4zGQed1GFppgkRHL9kaELCbyksJtPX";
    pub const FEE_DESTINATION: &str = "7YttLkHDoNj9wyDur5pM1ejNaAvT9X4eqaYcHQqtj2G5";

    pub const DEVNET_AMM_V4: &str = "HWy1jotHpo6UqeQxx49dpYYdQB8wj9Qk9MdxwjLvDHB8";
    pub const DEVNET_AMM_STABLE: &str = "DDg4VmQaJV9ogWce7LpcjBA9bv22wRp5uaTPa5pGjijF";
    pub const DEVNET_OPENBOOK_MARKET: &str = "EoTcMgcDRTJVZDMZWBoU6rhYHZfkNTVEAfz3uUJRcYGj";
    pub const DEVNET_FEE_DESTINATION: &str = "3XMrhbv989VxAMi3DErLV9eJht1pHppW5LbKxe9fkEFR";

    /// Pool programs liquidity operations are allowed against
    pub const VALID_AMM_PROGRAMS: [&str; 4] = [AMM_V4, AMM_STABLE, DEVNET_AMM_V4, DEVNET_AMM_STABLE];
}

/// Resource cache defaults
pub mod cache {
    pub const DEFAULT_DIR: &str = "cache";

    /// File-name prefix keeping devnet records apart from mainnet ones
    pub const DEVNET_PREFIX: &str = "devnet_";
}

/// Market creation defaults
pub mod market {
    use super::*;

    pub const DECIMALS: u8 = 6;
    pub const LOT_SIZE: Decimal = dec!(1);
    pub const TICK_SIZE: Decimal = dec!(0.01);

    /// Base units minted to the wallet when a test mint is created
    pub const INITIAL_MINT_SUPPLY: u128 = 1_000_000_000_000_000_000;
}

/// Pool creation defaults
pub mod pool {
    /// Initial reserves are `(10^decimals)^exponent` base units per side
    pub const INITIAL_LIQUIDITY_EXPONENT: u32 = 2;

    /// Open for trading immediately
    pub const START_TIME: u64 = 0;
}

/// Liquidity operation defaults
pub mod liquidity {
    use super::*;

    /// Human amount paid on the fixed side of a deposit
    pub const DEPOSIT_AMOUNT: Decimal = dec!(1);

    /// Human amount of share tokens redeemed by a withdrawal
    pub const WITHDRAW_AMOUNT: Decimal = dec!(1);

    pub const SLIPPAGE_PERCENT: u64 = 1;
}
