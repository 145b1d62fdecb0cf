//! Error taxonomy for provisioning and liquidity operations

use std::path::PathBuf;
use thiserror::Error;
use types::LiquidityError;

use crate::cache::ResourceKind;

/// Resource cache failures
///
/// `Corrupt` never escapes [`crate::ResourceCache::lookup`]; a record that
/// fails to parse is deleted and reported as a miss.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cache record at {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("Failed to serialize cache record: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failures reading ledger state
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("{what} not found on ledger")]
    NotFound { what: String },

    #[error("Ledger request failed: {message}")]
    Request { message: String },
}

/// Failures reported by the resource creator, classified at its boundary
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CreatorError {
    /// The target account already exists; carries its address when the
    /// creator can tell which one
    #[error("account {} already in use", .address.as_deref().unwrap_or("<unknown>"))]
    AlreadyInUse { address: Option<String> },

    /// Submitted and rejected by the program (slippage, balance, ...)
    #[error("transaction rejected: {message}")]
    Rejected { message: String },

    /// Never reached the ledger or confirmation was lost
    #[error("submission failed: {message}")]
    Submission { message: String },
}

/// Top-level error for the provisioning workflow and liquidity operator
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Arithmetic or validation failure, raised before any external call
    #[error(transparent)]
    Liquidity(#[from] LiquidityError),

    #[error("Unsupported {kind}: {detail}")]
    UnsupportedResourceType { kind: ResourceKind, detail: String },

    #[error("Initial liquidity too low: {base} × {quote} must exceed {threshold}")]
    InitialLiquidityTooLow {
        base: String,
        quote: String,
        threshold: String,
    },

    #[error("Creating {kind} ({identity}) failed: {message}")]
    ExternalCallFailure {
        kind: ResourceKind,
        identity: String,
        message: String,
    },

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

pub type Result<T> = std::result::Result<T, ProvisionError>;
