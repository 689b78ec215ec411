//! VeilVault Privacy SDK
//!
//! Cryptographic accounting layer for a shielded token vault: balances live
//! on-chain as blinded commitments, and their owner can rebuild every one of
//! them from a single user key.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         User Key                                │
//! │        ┌──────────────────┴───────────────────┐                 │
//! │        ▼                                      ▼                 │
//! │  ┌──────────────┐                      ┌──────────────┐         │
//! │  │ Spending Key │                      │   View Key   │         │
//! │  └──────────────┘                      └──────────────┘         │
//! │        │  nonce                               │ counter         │
//! │        ▼                                      ▼                 │
//! │  ┌─────────────────────────┐        ┌──────────────────────┐    │
//! │  │ Pedersen commit (G..J)  │        │ Field stream cipher  │    │
//! │  │ over Jubjub             │        │ (encrypted balance)  │    │
//! │  └─────────────────────────┘        └──────────────────────┘    │
//! │        │ hash2(x, y)                                            │
//! │        ▼                                                        │
//! │  ┌─────────────────────────────────────────────────────────┐    │
//! │  │          Lean incremental Merkle tree                    │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod cipher;
pub mod commitment;
pub mod curve;
pub mod encoding;
pub mod error;
pub mod generators;
pub mod hash;
pub mod keys;
pub mod merkle;
pub mod note;

/// Field element of the BLS12-381 scalar field, which is also the Jubjub
/// base field.
pub type Scalar = ark_bls12_381::Fr;

pub use cipher::{BALANCE_COUNTER, EncryptionSlot, MAX_COUNTER, NULLIFIER_COUNTER, decrypt, encrypt};
pub use commitment::{Commitment, NoteOpening, build_commitment, commitment_leaf, fold_shares};
pub use curve::CurvePoint;
pub use error::{PrivacyError, Result};
pub use generators::{GeneratorSet, generators};
pub use hash::{hash1, hash2, hash3};
pub use keys::{
    NonceCommitment, SpendingKey, TokenAddress, UserKey, ViewKey, account_fingerprint,
    derive_nonce_commitment, derive_spending_key, derive_view_key,
};
pub use merkle::{
    MAX_DEPTH, MIN_DEPTH, MerkleProof, MerkleTree, SharedTree, TreeSnapshot, generate_proof,
    insert_leaf, verify_proof,
};
pub use note::{NoteInputs, NoteKind};
