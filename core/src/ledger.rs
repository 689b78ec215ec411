//! Ledger records and the lookup seam.
//!
//! The ledger is authoritative. Everything fetched through [`LedgerSource`]
//! is public data indexed by nonce commitment; nothing here is secret.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use veilvault_privacy::Scalar;
use veilvault_privacy::encoding::hex_scalar;
use veilvault_privacy::keys::{NonceCommitment, TokenAddress};
use veilvault_privacy::merkle::MerkleTree;

/// Operation that produced a ledger record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationTag {
    Open,
    TopUp,
    Transfer,
    Withdraw,
    Absorb,
}

/// One record per nonce commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub operation: OperationTag,
    #[serde(with = "hex_scalar")]
    pub shares_added: Scalar,
    pub recorded_token: TokenAddress,
    /// Plaintext at nonce 0.
    #[serde(with = "hex_scalar")]
    pub encrypted_balance: Scalar,
    /// Plaintext at nonce 0.
    #[serde(with = "hex_scalar")]
    pub encrypted_nullifier: Scalar,
    pub used: bool,
    /// The leaf the ledger inserted into its tree.
    #[serde(with = "hex_scalar")]
    pub commitment_leaf: Scalar,
    /// Lock reported when the account was opened.
    #[serde(with = "hex_scalar", default)]
    pub unlocks_at: Scalar,
    #[serde(default)]
    pub leaf_index: Option<u64>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    #[error("malformed ledger record: {0}")]
    Malformed(String),
}

/// Synchronous record lookup, one call per nonce.
///
/// Retries and timeouts belong to the implementation.
pub trait LedgerSource: Send + Sync {
    fn fetch(&self, nonce_commitment: &NonceCommitment) -> Result<Option<LedgerRecord>, LedgerError>;
}

impl<T: LedgerSource + ?Sized> LedgerSource for std::sync::Arc<T> {
    fn fetch(&self, nonce_commitment: &NonceCommitment) -> Result<Option<LedgerRecord>, LedgerError> {
        (**self).fetch(nonce_commitment)
    }
}

/// Entry of a JSON ledger dump.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LedgerEntry {
    nonce_commitment: NonceCommitment,
    record: LedgerRecord,
}

/// In-memory ledger, typically loaded from a JSON dump.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    records: HashMap<NonceCommitment, LedgerRecord>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the record it replaced, if any.
    pub fn insert(
        &mut self,
        nonce_commitment: NonceCommitment,
        record: LedgerRecord,
    ) -> Option<LedgerRecord> {
        self.records.insert(nonce_commitment, record)
    }

    pub fn get(&self, nonce_commitment: &NonceCommitment) -> Option<&LedgerRecord> {
        self.records.get(nonce_commitment)
    }

    pub fn get_mut(&mut self, nonce_commitment: &NonceCommitment) -> Option<&mut LedgerRecord> {
        self.records.get_mut(nonce_commitment)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let entries: Vec<LedgerEntry> =
            serde_json::from_str(json).context("Failed to parse ledger dump")?;

        let mut ledger = Self::new();
        for entry in entries {
            if ledger.insert(entry.nonce_commitment, entry.record).is_some() {
                log::warn!("Duplicate nonce commitment in dump: {}", entry.nonce_commitment);
            }
        }
        Ok(ledger)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read ledger dump: {}", path.display()))?;
        let ledger = Self::from_json(&contents)
            .with_context(|| format!("Invalid ledger dump: {}", path.display()))?;
        log::info!("Loaded {} ledger records from {}", ledger.len(), path.display());
        Ok(ledger)
    }

    /// Rebuild the ledger's tree from the records that report a leaf index.
    ///
    /// Stops at the first gap in the indices: leaves past it cannot be
    /// placed.
    pub fn tree_mirror(&self) -> anyhow::Result<MerkleTree> {
        let mut indexed: Vec<(u64, Scalar)> = self
            .records
            .values()
            .filter_map(|r| r.leaf_index.map(|i| (i, r.commitment_leaf)))
            .collect();
        indexed.sort_by_key(|(i, _)| *i);

        let mut tree = MerkleTree::new();
        for (index, leaf) in indexed {
            if index != tree.size() {
                log::warn!("Leaf index gap at {} (tree has {}); mirror truncated", index, tree.size());
                break;
            }
            tree.insert(leaf)
                .with_context(|| format!("Cannot insert leaf {index} into mirror"))?;
        }
        Ok(tree)
    }

    /// Entries are sorted by nonce commitment so dumps are reproducible.
    pub fn to_json(&self) -> anyhow::Result<String> {
        let mut entries: Vec<LedgerEntry> = self
            .records
            .iter()
            .map(|(nc, record)| LedgerEntry {
                nonce_commitment: *nc,
                record: record.clone(),
            })
            .collect();
        entries.sort_by_key(|e| e.nonce_commitment.to_string());
        serde_json::to_string_pretty(&entries).context("Failed to serialize ledger dump")
    }
}

impl LedgerSource for MemoryLedger {
    fn fetch(&self, nonce_commitment: &NonceCommitment) -> Result<Option<LedgerRecord>, LedgerError> {
        Ok(self.records.get(nonce_commitment).cloned())
    }
}
