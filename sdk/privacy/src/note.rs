//! Note Kinds
//!
//! Every slot in an account's nonce sequence is either the note that opened
//! the account or one that continues it. The two differ in how the ledger
//! accounted for the shares minted by the operation:
//!
//! ```text
//! OpeningNote:     ledger = commit(0, 0, sk, 0, nc) + minted·G + unlocksAt·K
//!                  local  = commit(minted, 0, sk, unlocksAt, nc)
//!
//! ContinuingNote:  ledger = commit(balance, nullifier, sk, unlocksAt, nc) + minted·G
//!                  local  = same, folded the same way
//! ```
//!
//! Both paths land on the same point. Mixing them up (folding twice, or
//! passing zero and never folding) yields a leaf that never matches.

use serde::{Deserialize, Serialize};

use crate::Scalar;
use crate::commitment::{Commitment, NoteOpening, fold_shares};
use crate::keys::{NonceCommitment, SpendingKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    OpeningNote,
    ContinuingNote,
}

impl NoteKind {
    /// Nonce 0 always opens the account, whatever the ledger's tag says.
    pub fn for_nonce(nonce: u64) -> Self {
        if nonce == 0 {
            Self::OpeningNote
        } else {
            Self::ContinuingNote
        }
    }

    pub fn is_opening(&self) -> bool {
        matches!(self, Self::OpeningNote)
    }
}

/// Scalars needed to rebuild one note's commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteInputs {
    /// Balance carried in from decryption. Ignored for opening notes.
    pub balance: Scalar,
    /// Shares the operation minted on top of `balance`.
    pub minted: Scalar,
    pub nullifier: Scalar,
    pub spending_key: SpendingKey,
    pub unlocks_at: Scalar,
    pub nonce_commitment: NonceCommitment,
}

impl NoteKind {
    /// Balance the note holds once `inputs` are applied.
    pub fn resulting_balance(&self, inputs: &NoteInputs) -> Scalar {
        match self {
            Self::OpeningNote => inputs.minted,
            Self::ContinuingNote => inputs.balance + inputs.minted,
        }
    }

    /// Rebuild the commitment exactly as the ledger stored it.
    pub fn commit(&self, inputs: &NoteInputs) -> Commitment {
        match self {
            Self::OpeningNote => NoteOpening {
                shares: inputs.minted,
                nullifier: inputs.nullifier,
                spending_key: inputs.spending_key,
                unlocks_at: inputs.unlocks_at,
                nonce_commitment: inputs.nonce_commitment,
            }
            .commit(),
            Self::ContinuingNote => {
                let base = NoteOpening {
                    shares: inputs.balance,
                    nullifier: inputs.nullifier,
                    spending_key: inputs.spending_key,
                    unlocks_at: inputs.unlocks_at,
                    nonce_commitment: inputs.nonce_commitment,
                }
                .commit();
                Commitment::from_point(fold_shares(&base.point, &inputs.minted))
            }
        }
    }
}
