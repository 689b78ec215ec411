//! Lean Incremental Merkle Tree for Commitment Leaves
//!
//! Append-only binary tree with O(depth) insertion. A node without a right
//! sibling is promoted to the next level unchanged instead of being hashed
//! with a zero pad, so a tree of `n` leaves only ever hashes real pairs.
//!
//! ```text
//!                 Root
//!               /      \
//!            H01        L2        <- L2 has no sibling: promoted as-is
//!           /   \        |
//!          L0   L1      L2
//! ```
//!
//! Insertion keeps one cached "side node" per level: the most recent node
//! that arrived at that level as a left child. A right child combines with
//! it; a left child replaces it and travels up unchanged.
//!
//! Proofs always carry `depth` siblings. A missing sibling is encoded as the
//! zero sentinel, which is why the zero leaf can never be inserted.

use ark_ff::Zero;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

use crate::Scalar;
use crate::encoding::{hex_scalar, hex_scalar_vec};
use crate::error::{PrivacyError, Result};
use crate::hash::hash2;

/// Depth floor. The tree never reports a smaller depth.
pub const MIN_DEPTH: usize = 8;

/// Supports 2^32 leaves.
pub const MAX_DEPTH: usize = 32;

/// An inclusion proof for one leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    #[serde(with = "hex_scalar")]
    pub leaf: Scalar,
    pub index: u64,
    pub depth: usize,
    #[serde(with = "hex_scalar")]
    pub root: Scalar,
    /// Sibling per level, leaf level first. Zero means "no sibling".
    #[serde(with = "hex_scalar_vec")]
    pub siblings: Vec<Scalar>,
}

impl MerkleProof {
    pub fn verify(&self) -> Result<bool> {
        verify_proof(&self.leaf, self.index, self.depth, &self.root, &self.siblings)
    }
}

/// Size, depth and root: enough to tell whether a cached view is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeSnapshot {
    pub size: u64,
    pub depth: usize,
    /// Zero for the empty tree.
    #[serde(with = "hex_scalar")]
    pub root: Scalar,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    leaves: Vec<Scalar>,
    depth: usize,
    side_nodes: Vec<Scalar>,
    root: Scalar,
}

impl MerkleTree {
    pub fn new() -> Self {
        Self {
            leaves: Vec::new(),
            depth: MIN_DEPTH,
            side_nodes: vec![Scalar::zero(); MAX_DEPTH + 1],
            root: Scalar::zero(),
        }
    }

    /// Rebuild a tree by replaying insertions in order.
    pub fn from_leaves<I: IntoIterator<Item = Scalar>>(leaves: I) -> Result<Self> {
        let mut tree = Self::new();
        for leaf in leaves {
            tree.insert(leaf)?;
        }
        Ok(tree)
    }

    pub fn root(&self) -> Scalar {
        self.root
    }

    pub fn size(&self) -> u64 {
        self.leaves.len() as u64
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn leaf(&self, index: u64) -> Option<Scalar> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.leaves.get(i).copied())
    }

    /// Position of the first occurrence of `leaf`.
    pub fn position_of(&self, leaf: &Scalar) -> Option<u64> {
        self.leaves.iter().position(|l| l == leaf).map(|i| i as u64)
    }

    pub fn snapshot(&self) -> TreeSnapshot {
        TreeSnapshot {
            size: self.size(),
            depth: self.depth,
            root: self.root,
        }
    }

    /// Append a leaf and return the new root.
    pub fn insert(&mut self, leaf: Scalar) -> Result<Scalar> {
        if leaf.is_zero() {
            return Err(PrivacyError::ZeroLeaf);
        }

        let index = self.size();
        if index >= 1u64 << MAX_DEPTH {
            return Err(PrivacyError::TreeFull(MAX_DEPTH));
        }
        while (1u64 << self.depth) < index + 1 {
            self.depth += 1;
        }

        let mut node = leaf;
        for level in 0..self.depth {
            if (index >> level) & 1 == 1 {
                node = hash2(self.side_nodes[level], node);
            } else {
                self.side_nodes[level] = node;
            }
        }
        // Needed as the left sibling once the tree grows a level.
        self.side_nodes[self.depth] = node;

        self.leaves.push(leaf);
        self.root = node;
        Ok(node)
    }

    /// Siblings from leaf to root for the leaf at `index`.
    pub fn generate_proof(&self, index: u64) -> Result<MerkleProof> {
        let leaf = self.leaf(index).ok_or(PrivacyError::IndexOutOfRange {
            index,
            size: self.size(),
        })?;

        let mut siblings = Vec::with_capacity(self.depth);
        let mut level_nodes = self.leaves.clone();

        for level in 0..self.depth {
            let position = (index >> level) as usize;
            let sibling = level_nodes
                .get(position ^ 1)
                .copied()
                .unwrap_or_else(Scalar::zero);
            siblings.push(sibling);

            level_nodes = level_nodes
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => hash2(*left, *right),
                    [single] => *single,
                    _ => unreachable!("chunks(2) yields one or two nodes"),
                })
                .collect();
        }

        Ok(MerkleProof {
            leaf,
            index,
            depth: self.depth,
            root: self.root,
            siblings,
        })
    }
}

impl Default for MerkleTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Append `leaf` to `tree`, returning the new root.
pub fn insert_leaf(tree: &mut MerkleTree, leaf: Scalar) -> Result<Scalar> {
    tree.insert(leaf)
}

/// Sibling sequence for the leaf at `index`.
pub fn generate_proof(tree: &MerkleTree, index: u64) -> Result<Vec<Scalar>> {
    Ok(tree.generate_proof(index)?.siblings)
}

/// Replay the insertion rule along `siblings` and compare with `root`.
///
/// Returns `Ok(false)` on any mismatch. Errors only for malformed shapes.
pub fn verify_proof(
    leaf: &Scalar,
    index: u64,
    depth: usize,
    root: &Scalar,
    siblings: &[Scalar],
) -> Result<bool> {
    if !(MIN_DEPTH..=MAX_DEPTH).contains(&depth) {
        return Err(PrivacyError::DepthOutOfRange {
            depth,
            min: MIN_DEPTH,
            max: MAX_DEPTH,
        });
    }
    if siblings.len() != depth {
        return Err(PrivacyError::ProofLength {
            got: siblings.len(),
            expected: depth,
        });
    }
    if index >= 1u64 << depth {
        return Err(PrivacyError::IndexOutOfRange {
            index,
            size: 1u64 << depth,
        });
    }

    let mut node = *leaf;
    for (level, sibling) in siblings.iter().enumerate() {
        if (index >> level) & 1 == 1 {
            node = hash2(*sibling, node);
        } else if !sibling.is_zero() {
            node = hash2(node, *sibling);
        }
    }

    Ok(node == *root)
}

/// Single-writer, multi-reader handle to a tree.
///
/// Inserts take the write lock; readers clone a snapshot and generate or
/// verify proofs against it without holding the lock.
#[derive(Debug, Clone, Default)]
pub struct SharedTree {
    inner: Arc<RwLock<MerkleTree>>,
}

impl SharedTree {
    pub fn new(tree: MerkleTree) -> Self {
        Self {
            inner: Arc::new(RwLock::new(tree)),
        }
    }

    pub fn insert(&self, leaf: Scalar) -> Result<Scalar> {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        guard.insert(leaf)
    }

    /// A stable copy for concurrent readers.
    pub fn snapshot(&self) -> MerkleTree {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn root(&self) -> Scalar {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).root()
    }
}
