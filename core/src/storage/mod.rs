//! Local note cache.
//!
//! The cache is never authoritative: anything it cannot read is dropped and
//! rebuilt from the ledger. Entries are JSON, keyed by account fingerprint,
//! chain and token, and carry a schema version.
//!
//! | version | layout                                  | on load          |
//! |---------|-----------------------------------------|------------------|
//! | 1       | `last_nonce`, `notes`                   | migrated in place |
//! | 2       | `last_nonce`, `notes`, `tree` snapshot  | used as-is       |
//! | other   |                                         | invalidated      |

pub mod memory;
#[cfg(feature = "rocksdb")]
pub mod rocks;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use veilvault_privacy::Scalar;
use veilvault_privacy::encoding::{hex_scalar, scalar_to_bytes};
use veilvault_privacy::keys::TokenAddress;
use veilvault_privacy::merkle::TreeSnapshot;

use crate::context::SessionContext;
use crate::reconstruct::NoteState;

pub const SCHEMA_VERSION: u32 = 2;

/// Identifies one (account, chain, token) without exposing key material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    #[serde(with = "hex_scalar")]
    pub fingerprint: Scalar,
    pub chain_id: u64,
    pub token: TokenAddress,
}

impl CacheKey {
    pub fn for_session(ctx: &SessionContext) -> Self {
        Self {
            fingerprint: ctx.fingerprint(),
            chain_id: ctx.chain_id(),
            token: *ctx.token(),
        }
    }

    /// `fingerprint (32, LE) || chain_id (8, BE) || token (20)`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(60);
        out.extend_from_slice(&scalar_to_bytes(&self.fingerprint));
        out.extend_from_slice(&self.chain_id.to_be_bytes());
        out.extend_from_slice(&self.token.0);
        out
    }
}

/// Everything remembered about one account between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedAccount {
    pub schema_version: u32,
    /// Highest nonce whose outcome is final. `None` before the first scan.
    pub last_nonce: Option<u64>,
    /// Most recent first.
    pub notes: Vec<NoteState>,
    /// Local tree the witnesses were produced against.
    pub tree: Option<TreeSnapshot>,
}

impl CachedAccount {
    pub fn new(last_nonce: Option<u64>, notes: Vec<NoteState>, tree: Option<TreeSnapshot>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            last_nonce,
            notes,
            tree,
        }
    }

    /// First nonce a resumed run has to look at.
    pub fn resume_nonce(&self) -> u64 {
        self.last_nonce.map_or(0, |n| n.saturating_add(1))
    }
}

#[derive(Deserialize)]
struct CachedAccountV1 {
    last_nonce: Option<u64>,
    notes: Vec<NoteState>,
}

#[derive(Deserialize)]
struct VersionProbe {
    schema_version: u32,
}

/// Outcome of decoding a stored entry.
#[derive(Debug, PartialEq, Eq)]
pub enum Decoded {
    Current(CachedAccount),
    /// Read from an older layout; should be written back.
    Migrated(CachedAccount),
    /// Unreadable or from an unknown version; should be dropped.
    Invalid(String),
}

pub fn decode_entry(bytes: &[u8]) -> Decoded {
    let version = match serde_json::from_slice::<VersionProbe>(bytes) {
        Ok(probe) => probe.schema_version,
        Err(e) => return Decoded::Invalid(format!("unreadable entry: {e}")),
    };

    match version {
        SCHEMA_VERSION => match serde_json::from_slice::<CachedAccount>(bytes) {
            Ok(account) => Decoded::Current(account),
            Err(e) => Decoded::Invalid(format!("corrupt v{SCHEMA_VERSION} entry: {e}")),
        },
        1 => match serde_json::from_slice::<CachedAccountV1>(bytes) {
            Ok(old) => Decoded::Migrated(CachedAccount::new(old.last_nonce, old.notes, None)),
            Err(e) => Decoded::Invalid(format!("corrupt v1 entry: {e}")),
        },
        other => Decoded::Invalid(format!("unsupported schema version {other}")),
    }
}

/// Byte-level key-value store with versioned account entries on top.
pub trait NoteCache: Send + Sync {
    fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    fn put_raw(&self, key: &[u8], value: Vec<u8>) -> Result<()>;

    fn delete_raw(&self, key: &[u8]) -> Result<()>;

    /// Load an entry, migrating or dropping it if its schema is stale.
    fn load(&self, key: &CacheKey) -> Result<Option<CachedAccount>> {
        let raw_key = key.to_bytes();
        let Some(bytes) = self.get_raw(&raw_key)? else {
            return Ok(None);
        };

        match decode_entry(&bytes) {
            Decoded::Current(account) => Ok(Some(account)),
            Decoded::Migrated(account) => {
                log::info!(
                    "Migrating cache entry for chain {} token {} to schema v{}",
                    key.chain_id,
                    key.token,
                    SCHEMA_VERSION
                );
                self.store(key, &account)?;
                Ok(Some(account))
            }
            Decoded::Invalid(reason) => {
                log::warn!("Dropping cache entry for token {}: {}", key.token, reason);
                self.delete_raw(&raw_key)?;
                Ok(None)
            }
        }
    }

    fn store(&self, key: &CacheKey, account: &CachedAccount) -> Result<()> {
        let bytes = serde_json::to_vec(account).context("Failed to serialize cache entry")?;
        self.put_raw(&key.to_bytes(), bytes)
    }

    fn invalidate(&self, key: &CacheKey) -> Result<()> {
        self.delete_raw(&key.to_bytes())
    }
}
