//! Note Commitments
//!
//! Pedersen commitment over five fixed generators:
//!
//! ```text
//! C    = shares·G + nullifier·H + spendingKey·D + unlocksAt·K + nonceCommitment·J
//! leaf = hash2(C.x, C.y)
//! ```
//!
//! The slot-to-generator assignment is fixed; the ledger builds the same
//! point independently. Because point addition is associative,
//! `commit(s, ...) == commit(0, ...) + s·G`, which is how the ledger's
//! after-the-fact share folds are reproduced in one step.

use serde::{Deserialize, Serialize};

use crate::Scalar;
use crate::curve::CurvePoint;
use crate::encoding::hex_scalar;
use crate::generators::generators;
use crate::hash::hash2;
use crate::keys::{NonceCommitment, SpendingKey};

/// `Σ scalarMul(bases[i], scalars[i])`. Zero scalars contribute the identity.
pub fn commit5(scalars: &[Scalar; 5], bases: &[CurvePoint; 5]) -> CurvePoint {
    scalars
        .iter()
        .zip(bases.iter())
        .fold(CurvePoint::identity(), |acc, (m, g)| {
            acc.add(&g.scalar_mul(m))
        })
}

/// The five scalars that open a note commitment, in slot order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteOpening {
    pub shares: Scalar,
    pub nullifier: Scalar,
    pub spending_key: SpendingKey,
    pub unlocks_at: Scalar,
    pub nonce_commitment: NonceCommitment,
}

impl NoteOpening {
    /// Scalars in slot order `[shares, nullifier, spendingKey, unlocksAt, nonceCommitment]`.
    pub fn as_array(&self) -> [Scalar; 5] {
        [
            self.shares,
            self.nullifier,
            self.spending_key.as_scalar(),
            self.unlocks_at,
            self.nonce_commitment.as_scalar(),
        ]
    }

    pub fn commit(&self) -> Commitment {
        Commitment::from_point(commit5(&self.as_array(), &generators().as_array()))
    }
}

/// Build the commitment point with the fixed slot assignment.
pub fn build_commitment(
    shares: Scalar,
    nullifier: Scalar,
    spending_key: &SpendingKey,
    unlocks_at: Scalar,
    nonce_commitment: &NonceCommitment,
) -> CurvePoint {
    NoteOpening {
        shares,
        nullifier,
        spending_key: *spending_key,
        unlocks_at,
        nonce_commitment: *nonce_commitment,
    }
    .commit()
    .point
}

/// Add `shares·G` to an existing commitment point.
pub fn fold_shares(point: &CurvePoint, shares: &Scalar) -> CurvePoint {
    point.add(&generators().g.scalar_mul(shares))
}

/// Add `unlocksAt·K` to an existing commitment point.
pub fn fold_unlocks_at(point: &CurvePoint, unlocks_at: &Scalar) -> CurvePoint {
    point.add(&generators().k.scalar_mul(unlocks_at))
}

/// `hash2(x, y)` of a commitment point: the value inserted into the tree.
pub fn commitment_leaf(point: &CurvePoint) -> Scalar {
    hash2(point.x(), point.y())
}

/// A commitment point together with its tree leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commitment {
    pub point: CurvePoint,
    #[serde(with = "hex_scalar")]
    pub leaf: Scalar,
}

impl Commitment {
    pub fn from_point(point: CurvePoint) -> Self {
        Self {
            point,
            leaf: commitment_leaf(&point),
        }
    }
}
