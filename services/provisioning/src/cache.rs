//! Durable, identity-checked cache of provisioned resources
//!
//! One human-readable JSON document per resource kind at
//! `<dir>/<prefix><kind>.json`. A record is only trusted when its stored
//! identity equals the identity the caller expects right now; anything else
//! is deleted on sight, so the next run re-creates instead of silently
//! reusing a resource built for a different configuration.
//!
//! Single-writer: the workflow is the only caller that stores records.
//! Writes go through a temp file and rename so a crash mid-write leaves
//! either the old record or the new one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use types::{AssetId, MarketId, TxSignature};

use crate::errors::CacheError;

/// Kinds of externally created resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Mint,
    Market,
    Pool,
}

impl ResourceKind {
    /// Kinds persisted in the cache; mints live at fixed addresses instead
    pub const CACHED: [ResourceKind; 2] = [ResourceKind::Market, ResourceKind::Pool];

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Mint => "mint",
            ResourceKind::Market => "market",
            ResourceKind::Pool => "pool",
        }
    }

    /// Key of the resource's own address within a record's `address` map
    pub fn address_key(self) -> &'static str {
        match self {
            ResourceKind::Mint => "mint",
            ResourceKind::Market => "marketId",
            ResourceKind::Pool => "ammId",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields a cached resource must match to be reused
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceIdentity(BTreeMap<String, String>);

impl ResourceIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// A market is identified by its base and quote mints
    pub fn market(base: &AssetId, quote: &AssetId) -> Self {
        Self::new()
            .with("baseMint", base.as_str())
            .with("quoteMint", quote.as_str())
    }

    /// A pool is identified by its mints and the market it trades on
    pub fn pool(base: &AssetId, quote: &AssetId, market: &MarketId) -> Self {
        Self::market(base, quote).with("marketId", market.as_str())
    }

    pub fn mint(address: &AssetId) -> Self {
        Self::new().with("mint", address.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, value) in &self.0 {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", key, value)?;
            first = false;
        }
        Ok(())
    }
}

/// Persisted record of one provisioned resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedResource {
    pub kind: ResourceKind,
    pub identity: ResourceIdentity,
    /// Created account addresses by role; always holds `kind.address_key()`
    pub address: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signatures: Vec<TxSignature>,
    pub created_at: DateTime<Utc>,
}

impl CachedResource {
    pub fn new(kind: ResourceKind, identity: ResourceIdentity, address: impl Into<String>) -> Self {
        let mut accounts = BTreeMap::new();
        accounts.insert(kind.address_key().to_string(), address.into());

        Self {
            kind,
            identity,
            address: accounts,
            signatures: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Merge auxiliary accounts; the primary address is never overwritten
    pub fn with_accounts(mut self, accounts: BTreeMap<String, String>) -> Self {
        let key = self.kind.address_key();
        for (role, address) in accounts {
            if role != key {
                self.address.insert(role, address);
            }
        }
        self
    }

    pub fn with_signatures(mut self, signatures: Vec<TxSignature>) -> Self {
        self.signatures = signatures;
        self
    }

    /// The resource's own address
    pub fn primary_address(&self) -> Option<&str> {
        self.address
            .get(self.kind.address_key())
            .map(String::as_str)
    }
}

/// Outcome of checking the cache against an expected identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// No record on disk
    Uncached,
    /// Record matches and may be reused
    Reused(CachedResource),
    /// Record existed for a different identity and has been deleted
    Stale(CachedResource),
    /// Record failed to parse and has been deleted
    Corrupt(String),
}

impl Lookup {
    pub fn into_record(self) -> Option<CachedResource> {
        match self {
            Lookup::Reused(record) => Some(record),
            _ => None,
        }
    }
}

/// File-backed resource cache
#[derive(Debug, Clone)]
pub struct ResourceCache {
    dir: PathBuf,
    prefix: String,
}

impl ResourceCache {
    /// Open (and create if needed) a cache directory
    ///
    /// `prefix` namespaces the files, e.g. `devnet_` for devnet records.
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Result<Self, CacheError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| CacheError::io(&dir, e))?;

        Ok(Self {
            dir,
            prefix: prefix.into(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record for `kind`
    pub fn path(&self, kind: ResourceKind) -> PathBuf {
        self.dir.join(format!("{}{}.json", self.prefix, kind))
    }

    /// Stored record for `kind` only if its identity equals `expected`
    ///
    /// Mismatched and unparseable records are deleted, so a second lookup
    /// never sees them.
    pub fn lookup(
        &self,
        kind: ResourceKind,
        expected: &ResourceIdentity,
    ) -> Result<Option<CachedResource>, CacheError> {
        self.verify(kind, expected).map(Lookup::into_record)
    }

    /// Like [`ResourceCache::lookup`], reporting which transition happened
    pub fn verify(&self, kind: ResourceKind, expected: &ResourceIdentity) -> Result<Lookup, CacheError> {
        let record = match self.load(kind) {
            Ok(Some(record)) => record,
            Ok(None) => return Ok(Lookup::Uncached),
            Err(CacheError::Corrupt { path, reason }) => {
                warn!("Discarding corrupt {} cache record {:?}: {}", kind, path, reason);
                self.remove(kind)?;
                return Ok(Lookup::Corrupt(reason));
            }
            Err(e) => return Err(e),
        };

        if record.identity != *expected {
            warn!(
                "Stale {} cache record: cached [{}], expected [{}]; deleting",
                kind, record.identity, expected
            );
            self.remove(kind)?;
            return Ok(Lookup::Stale(record));
        }

        debug!("Cache hit for {} [{}]", kind, expected);
        Ok(Lookup::Reused(record))
    }

    /// Read the record for `kind` without any identity check
    pub fn load(&self, kind: ResourceKind) -> Result<Option<CachedResource>, CacheError> {
        let path = self.path(kind);

        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::io(path, e)),
        };

        let record: CachedResource =
            serde_json::from_str(&data).map_err(|e| CacheError::Corrupt {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        if record.kind != kind {
            return Err(CacheError::Corrupt {
                path,
                reason: format!("holds a {} record", record.kind),
            });
        }
        if record.primary_address().is_none() {
            return Err(CacheError::Corrupt {
                path,
                reason: format!("missing address.{}", kind.address_key()),
            });
        }

        Ok(Some(record))
    }

    /// Persist `record`, replacing any previous record of its kind
    pub fn store(&self, record: &CachedResource) -> Result<(), CacheError> {
        let path = self.path(record.kind);
        let tmp = path.with_extension("json.tmp");

        let data = serde_json::to_string_pretty(record)?;
        fs::write(&tmp, data).map_err(|e| CacheError::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| CacheError::io(&path, e))?;

        info!("{} [{}] saved to cache at {:?}", record.kind, record.identity, path);
        Ok(())
    }

    /// Delete the record for `kind`; `false` if there was none
    pub fn remove(&self, kind: ResourceKind) -> Result<bool, CacheError> {
        let path = self.path(kind);
        match fs::remove_file(&path) {
            Ok(()) => {
                info!("Cache file deleted: {:?}", path);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::io(path, e)),
        }
    }

    /// All readable records, skipping corrupt ones
    pub fn list(&self) -> Result<Vec<CachedResource>, CacheError> {
        let mut records = Vec::new();
        for kind in ResourceKind::CACHED {
            match self.load(kind) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(CacheError::Corrupt { path, reason }) => {
                    warn!("Skipping corrupt cache record {:?}: {}", path, reason);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(records)
    }

    /// Remove every cached record; returns how many were deleted
    pub fn clear(&self) -> Result<usize, CacheError> {
        let mut removed = 0;
        for kind in ResourceKind::CACHED {
            if self.remove(kind)? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn market_identity() -> ResourceIdentity {
        ResourceIdentity::market(&AssetId::new("MintA111"), &AssetId::new("MintB111"))
    }

    #[test]
    fn test_store_then_lookup() {
        let dir = TempDir::new().unwrap();
        let cache = ResourceCache::new(dir.path(), "").unwrap();

        let record = CachedResource::new(ResourceKind::Market, market_identity(), "Market111");
        cache.store(&record).unwrap();

        let hit = cache
            .lookup(ResourceKind::Market, &market_identity())
            .unwrap()
            .unwrap();
        assert_eq!(hit, record);
        assert_eq!(hit.primary_address(), Some("Market111"));
    }

    #[test]
    fn test_mismatch_deletes_record() {
        let dir = TempDir::new().unwrap();
        let cache = ResourceCache::new(dir.path(), "").unwrap();
        cache
            .store(&CachedResource::new(
                ResourceKind::Market,
                market_identity(),
                "Market111",
            ))
            .unwrap();

        let other = ResourceIdentity::market(&AssetId::new("MintA111"), &AssetId::new("MintC111"));
        assert!(matches!(
            cache.verify(ResourceKind::Market, &other).unwrap(),
            Lookup::Stale(_)
        ));
        assert!(!cache.path(ResourceKind::Market).exists());

        // Nothing left behind, even for the originally matching identity
        assert_eq!(
            cache.verify(ResourceKind::Market, &market_identity()).unwrap(),
            Lookup::Uncached
        );
    }

    #[test]
    fn test_corrupt_record_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let cache = ResourceCache::new(dir.path(), "").unwrap();
        fs::write(cache.path(ResourceKind::Pool), "{ not json").unwrap();

        let identity = ResourceIdentity::pool(
            &AssetId::new("MintA111"),
            &AssetId::new("MintB111"),
            &MarketId::new("Market111"),
        );
        assert!(matches!(
            cache.verify(ResourceKind::Pool, &identity).unwrap(),
            Lookup::Corrupt(_)
        ));
        assert!(!cache.path(ResourceKind::Pool).exists());
    }

    #[test]
    fn test_record_without_primary_address_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let cache = ResourceCache::new(dir.path(), "").unwrap();
        fs::write(
            cache.path(ResourceKind::Market),
            r#"{"kind":"market","identity":{},"address":{},"createdAt":"2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();

        assert!(matches!(
            cache.load(ResourceKind::Market),
            Err(CacheError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_prefix_namespaces_files() {
        let dir = TempDir::new().unwrap();
        let devnet = ResourceCache::new(dir.path(), "devnet_").unwrap();
        let mainnet = ResourceCache::new(dir.path(), "").unwrap();

        assert!(devnet
            .path(ResourceKind::Market)
            .ends_with("devnet_market.json"));

        devnet
            .store(&CachedResource::new(
                ResourceKind::Market,
                market_identity(),
                "DevMarket",
            ))
            .unwrap();
        assert!(mainnet
            .lookup(ResourceKind::Market, &market_identity())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_document_layout_is_human_readable() {
        let dir = TempDir::new().unwrap();
        let cache = ResourceCache::new(dir.path(), "").unwrap();

        let mut accounts = BTreeMap::new();
        accounts.insert("bids".to_string(), "Bids1111".to_string());
        accounts.insert("marketId".to_string(), "Ignored1".to_string());
        let record = CachedResource::new(ResourceKind::Market, market_identity(), "Market111")
            .with_accounts(accounts);
        cache.store(&record).unwrap();

        let raw = fs::read_to_string(cache.path(ResourceKind::Market)).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(doc["kind"], "market");
        assert_eq!(doc["identity"]["baseMint"], "MintA111");
        assert_eq!(doc["address"]["marketId"], "Market111");
        assert_eq!(doc["address"]["bids"], "Bids1111");
        assert!(doc["createdAt"].is_string());
        assert!(raw.contains('\n'), "pretty-printed");
    }

    #[test]
    fn test_list_and_clear() {
        let dir = TempDir::new().unwrap();
        let cache = ResourceCache::new(dir.path(), "").unwrap();
        cache
            .store(&CachedResource::new(
                ResourceKind::Market,
                market_identity(),
                "Market111",
            ))
            .unwrap();
        fs::write(cache.path(ResourceKind::Pool), "garbage").unwrap();

        let listed = cache.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].kind, ResourceKind::Market);

        assert_eq!(cache.clear().unwrap(), 2);
        assert!(cache.list().unwrap().is_empty());
        assert!(!cache.remove(ResourceKind::Market).unwrap());
    }

    #[test]
    fn test_identity_display() {
        let identity = market_identity();
        assert_eq!(identity.to_string(), "baseMint=MintA111, quoteMint=MintB111");
        assert_eq!(identity.get("quoteMint"), Some("MintB111"));
    }
}
