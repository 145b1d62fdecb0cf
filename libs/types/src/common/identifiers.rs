//! # Typed Ledger Addresses
//!
//! Ledger accounts are all base58 strings on the wire, which makes it easy
//! to pass a pool id where a mint was expected. Each role gets its own
//! wrapper so the compiler catches the swap.
//!
//! ```rust
//! use types::{AssetId, PoolId};
//!
//! fn withdraw(pool: &PoolId, asset: &AssetId) { /* ... */ }
//!
//! let pool = PoolId::new("8sLbNZoA1cfnvMJLPfp98ZLAnFSYCFApfJKMbiXNLwxj");
//! let mint = AssetId::new("So11111111111111111111111111111111111111112");
//! withdraw(&pool, &mint); // ✅ Works
//! // withdraw(&mint, &pool); // ❌ Compile error!
//! ```

/// Macro for generating typed string address wrappers
///
/// The wrapper serializes as the bare string so cache documents stay
/// human-readable.
#[macro_export]
macro_rules! define_address {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        #[repr(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new typed address
            pub fn new(address: impl Into<String>) -> Self {
                Self(address.into())
            }

            /// Borrow the address string
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Extract the inner value by value
            pub fn into_inner(self) -> String {
                self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(address: &str) -> Self {
                Self(address.to_string())
            }
        }

        impl From<String> for $name {
            fn from(address: String) -> Self {
                Self(address)
            }
        }

        impl From<$name> for String {
            fn from(wrapper: $name) -> String {
                wrapper.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                self.0.serialize(serializer)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                String::deserialize(deserializer).map(Self)
            }
        }
    };
}

define_address!(
    /// Token mint address
    AssetId
);

define_address!(
    /// AMM pool (amm id) address
    PoolId
);

define_address!(
    /// Order-book market address
    MarketId
);

define_address!(
    /// On-chain program address (AMM program, token program, market program)
    ProgramId
);

define_address!(
    /// Wallet or token account owner
    AccountId
);

define_address!(
    /// Submitted transaction signature
    TxSignature
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_serializes_bare() {
        let mint = AssetId::new("MintA111");
        assert_eq!(serde_json::to_string(&mint).unwrap(), "\"MintA111\"");

        let back: AssetId = serde_json::from_str("\"MintA111\"").unwrap();
        assert_eq!(back, mint);
        assert_eq!(back.to_string(), "MintA111");
    }

    #[test]
    fn test_addresses_order_and_compare() {
        let a = PoolId::from("a");
        let b = PoolId::from("b".to_string());
        assert!(a < b);
        assert_ne!(a, b);
        assert!(PoolId::default().is_empty());
    }
}
