//! Account history reconstruction.
//!
//! Replays an account's nonce chain against the ledger:
//!
//! ```text
//! for n in 0..current_nonce:
//!     nc     = nonce_commitment(n)            absent ⇒ skip
//!     kind   = Opening if n == 0 else Continuing
//!     shares = resolve(kind, record)          see table below
//!     C      = commit(shares, nullifier, sk, unlocksAt, nc)
//!     leaf   = hash2(C.x, C.y)                must equal record.commitment_leaf
//! ```
//!
//! | kind       | operation | balance                     | folded after commit |
//! |------------|-----------|-----------------------------|---------------------|
//! | Opening    | any       | `shares_added`              | (passed up front)   |
//! | Continuing | TopUp     | decrypted + `shares_added`  | `shares_added·G`    |
//! | Continuing | other     | decrypted                   | nothing             |
//!
//! A note only updates the carried `(nullifier, unlocksAt)` once its leaf
//! matched. Everything that goes wrong is reported as a [`Diagnostic`];
//! only an unreachable ledger ends the run early.

use ark_ff::Zero;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use veilvault_privacy::Scalar;
use veilvault_privacy::cipher::{BALANCE_COUNTER, NULLIFIER_COUNTER, decrypt_with_view_key};
use veilvault_privacy::commitment::Commitment;
use veilvault_privacy::encoding::hex_scalar;
use veilvault_privacy::keys::{NonceCommitment, TokenAddress, UserKey};
use veilvault_privacy::merkle::{MerkleProof, MerkleTree, TreeSnapshot};
use veilvault_privacy::note::{NoteInputs, NoteKind};

use crate::context::SessionContext;
use crate::diagnostics::{Diagnostic, DiagnosticKind, Severity};
use crate::ledger::{LedgerError, LedgerRecord, LedgerSource, OperationTag};
use crate::storage::{CacheKey, CachedAccount, NoteCache};

/// Proof that a note's leaf sits in the local tree mirror.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipWitness {
    pub proof: MerkleProof,
    pub tree: TreeSnapshot,
}

/// One recovered note. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteState {
    pub nonce: u64,
    pub kind: NoteKind,
    pub nonce_commitment: NonceCommitment,
    pub operation: OperationTag,
    /// Shares held once this note's operation is applied.
    #[serde(with = "hex_scalar")]
    pub balance: Scalar,
    /// Nullifier committed into this note.
    #[serde(with = "hex_scalar")]
    pub nullifier: Scalar,
    #[serde(with = "hex_scalar")]
    pub unlocks_at: Scalar,
    /// Nullifier handed to the next note in the chain.
    #[serde(with = "hex_scalar")]
    pub next_nullifier: Scalar,
    pub commitment: Commitment,
    pub used: bool,
    pub leaf_index: Option<u64>,
    pub membership: Option<MembershipWitness>,
}

impl NoteState {
    fn carry(&self) -> Carry {
        Carry {
            nullifier: self.next_nullifier,
            unlocks_at: self.unlocks_at,
        }
    }
}

/// State threaded from one verified note to the next.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Carry {
    nullifier: Scalar,
    unlocks_at: Scalar,
}

/// Result of one run. Always returned, even when the run was cut short.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconstruction {
    /// Most recent first.
    pub notes: Vec<NoteState>,
    /// In nonce order.
    pub diagnostics: Vec<Diagnostic>,
    /// Set when the ledger became unreachable.
    pub aborted: bool,
    /// Highest nonce up to which every outcome is final. Resumed runs start
    /// right after it.
    pub last_final_nonce: Option<u64>,
}

impl Reconstruction {
    pub fn latest(&self) -> Option<&NoteState> {
        self.notes.first()
    }

    /// Balance of the latest recovered note.
    pub fn balance(&self) -> Option<Scalar> {
        self.latest().map(|n| n.balance)
    }

    pub fn is_clean(&self) -> bool {
        !self.aborted
            && self
                .diagnostics
                .iter()
                .all(|d| d.severity() <= Severity::Skip)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity() == severity)
            .count()
    }
}

/// Replays nonce chains against a ledger and an optional local tree.
pub struct Reconstructor<'a, L: LedgerSource + ?Sized> {
    ledger: &'a L,
    tree: Option<&'a MerkleTree>,
    attach_membership: bool,
}

impl<'a, L: LedgerSource + ?Sized> Reconstructor<'a, L> {
    pub fn new(ledger: &'a L) -> Self {
        Self {
            ledger,
            tree: None,
            attach_membership: true,
        }
    }

    /// Check each note against a local mirror of the ledger's tree.
    pub fn with_tree(mut self, tree: &'a MerkleTree) -> Self {
        self.tree = Some(tree);
        self
    }

    pub fn attach_membership(mut self, attach: bool) -> Self {
        self.attach_membership = attach;
        self
    }

    /// Replay nonces `0..current_nonce`.
    pub fn reconstruct(&self, ctx: &SessionContext, current_nonce: u64) -> Reconstruction {
        self.replay(ctx, 0..current_nonce, Vec::new(), None)
    }

    /// Reconstruct several independent accounts in parallel.
    ///
    /// Results come back in job order. `max_parallel == 0` uses rayon's
    /// global pool.
    pub fn reconstruct_many(
        &self,
        jobs: &[(SessionContext, u64)],
        max_parallel: usize,
    ) -> Vec<Reconstruction> {
        let run = || -> Vec<Reconstruction> {
            jobs.par_iter()
                .map(|(ctx, current_nonce)| self.reconstruct(ctx, *current_nonce))
                .collect()
        };

        if max_parallel == 0 {
            return run();
        }
        match rayon::ThreadPoolBuilder::new()
            .num_threads(max_parallel)
            .build()
        {
            Ok(pool) => pool.install(run),
            Err(e) => {
                log::warn!("Failed to build a {max_parallel}-thread pool ({e}), using the global pool");
                run()
            }
        }
    }

    /// Resume from `cache`, replay what is new, and write the result back.
    pub fn reconstruct_incremental(
        &self,
        ctx: &SessionContext,
        current_nonce: u64,
        cache: &dyn NoteCache,
    ) -> anyhow::Result<Reconstruction> {
        let key = CacheKey::for_session(ctx);
        let cached = cache.load(&key)?.filter(|entry| self.cache_matches_tree(entry));

        let (start, prior, last_final) = match cached {
            Some(entry) => {
                let start = entry.resume_nonce();
                log::debug!("Resuming {} from nonce {start}", key.token);
                // Notes past the last final nonce are rebuilt by this run, and
                // the carry must come from the last final note.
                let mut notes = entry.notes;
                notes.retain(|n| n.nonce < start.min(current_nonce));
                // Stored most recent first; replay wants oldest first.
                notes.reverse();
                (start, notes, entry.last_nonce)
            }
            None => (0, Vec::new(), None),
        };

        if start >= current_nonce {
            let mut notes = prior;
            notes.reverse();
            return Ok(Reconstruction {
                notes,
                last_final_nonce: last_final.map(|n| n.min(current_nonce.saturating_sub(1))),
                ..Reconstruction::default()
            });
        }

        let result = self.replay(ctx, start..current_nonce, prior, last_final);

        let entry = CachedAccount::new(
            result.last_final_nonce,
            result.notes.clone(),
            self.tree.map(MerkleTree::snapshot),
        );
        cache.store(&key, &entry)?;

        Ok(result)
    }

    /// A cached entry built against a larger tree than the one we hold, or
    /// against a different tree of the same size, cannot be trusted.
    fn cache_matches_tree(&self, entry: &CachedAccount) -> bool {
        match (self.tree, entry.tree) {
            (Some(tree), Some(snapshot)) if tree.size() < snapshot.size => {
                log::warn!(
                    "Local tree has {} leaves, cache was built against {}; replaying from scratch",
                    tree.size(),
                    snapshot.size
                );
                false
            }
            (Some(tree), Some(snapshot))
                if tree.size() == snapshot.size && tree.root() != snapshot.root =>
            {
                log::warn!(
                    "Local tree root differs from the one the cache was built against; replaying from scratch"
                );
                false
            }
            _ => true,
        }
    }

    /// `prior` holds notes from earlier runs, oldest first.
    fn replay(
        &self,
        ctx: &SessionContext,
        nonces: Range<u64>,
        prior: Vec<NoteState>,
        last_final: Option<u64>,
    ) -> Reconstruction {
        let mut carry = prior.last().map(NoteState::carry).unwrap_or_default();
        let mut notes = prior;
        let mut diagnostics = Vec::new();
        let mut aborted = false;
        let mut last_final_nonce = last_final;
        let mut chain_intact = true;

        for nonce in nonces {
            let nonce_commitment = ctx.nonce_commitment(nonce);
            let mut raised = Vec::new();

            match self.ledger.fetch(&nonce_commitment) {
                Ok(None) => {
                    log::debug!("nonce {nonce}: no record");
                    raised.push(DiagnosticKind::NotFound);
                }
                Ok(Some(record)) => {
                    match self.replay_note(ctx, nonce, nonce_commitment, &record, carry, &mut raised) {
                        Ok(note) => {
                            log::debug!("nonce {nonce}: recovered {:?} note", note.kind);
                            carry = note.carry();
                            notes.push(note);
                        }
                        Err(kind) => raised.push(kind),
                    }
                }
                Err(LedgerError::Malformed(reason)) => {
                    log::warn!("nonce {nonce}: malformed record: {reason}");
                    raised.push(DiagnosticKind::MalformedInput { reason });
                }
                Err(LedgerError::Unavailable(reason)) => {
                    log::warn!("nonce {nonce}: ledger unavailable, stopping: {reason}");
                    raised.push(DiagnosticKind::UpstreamUnavailable { reason });
                    aborted = true;
                }
            }

            let worst = raised.iter().map(DiagnosticKind::severity).max();
            diagnostics.extend(raised.into_iter().map(|kind| Diagnostic {
                nonce,
                nonce_commitment,
                kind,
            }));

            if aborted {
                break;
            }
            if worst.is_some_and(|s| s >= Severity::NonceFatal) {
                chain_intact = false;
            }
            if chain_intact {
                last_final_nonce = Some(nonce);
            }
        }

        log::info!(
            "Reconstructed {} notes for token {} ({} diagnostics{})",
            notes.len(),
            ctx.token(),
            diagnostics.len(),
            if aborted { ", aborted" } else { "" }
        );

        notes.reverse();
        Reconstruction {
            notes,
            diagnostics,
            aborted,
            last_final_nonce,
        }
    }

    /// Rebuild a single note. Warnings go to `raised`; the returned error is
    /// the reason the note was rejected.
    fn replay_note(
        &self,
        ctx: &SessionContext,
        nonce: u64,
        nonce_commitment: NonceCommitment,
        record: &LedgerRecord,
        carry: Carry,
        raised: &mut Vec<DiagnosticKind>,
    ) -> Result<NoteState, DiagnosticKind> {
        if record.recorded_token != *ctx.token() {
            log::warn!("nonce {nonce}: record is for token {}", record.recorded_token);
            return Err(DiagnosticKind::TokenMismatch {
                recorded: record.recorded_token,
                expected: *ctx.token(),
            });
        }

        let kind = NoteKind::for_nonce(nonce);
        let inputs = match kind {
            NoteKind::OpeningNote => NoteInputs {
                balance: Scalar::zero(),
                minted: record.shares_added,
                nullifier: Scalar::zero(),
                spending_key: *ctx.spending_key(),
                unlocks_at: record.unlocks_at,
                nonce_commitment,
            },
            NoteKind::ContinuingNote => {
                let balance = decrypt_field(ctx, &record.encrypted_balance, BALANCE_COUNTER)?;
                let minted = match record.operation {
                    OperationTag::TopUp => record.shares_added,
                    operation => {
                        if !record.shares_added.is_zero() {
                            log::warn!(
                                "nonce {nonce}: {operation:?} reports added shares on a continuing note; ignoring them"
                            );
                            raised.push(DiagnosticKind::AmbiguousShares {
                                operation,
                                shares_added: record.shares_added,
                            });
                        }
                        Scalar::zero()
                    }
                };
                NoteInputs {
                    balance,
                    minted,
                    nullifier: carry.nullifier,
                    spending_key: *ctx.spending_key(),
                    unlocks_at: carry.unlocks_at,
                    nonce_commitment,
                }
            }
        };

        let commitment = kind.commit(&inputs);
        if commitment.leaf != record.commitment_leaf {
            log::error!("nonce {nonce}: recomputed leaf does not match the ledger");
            return Err(DiagnosticKind::IntegrityMismatch {
                expected: record.commitment_leaf,
                computed: commitment.leaf,
            });
        }

        let membership = self.membership(record)?;

        let next_nullifier = match kind {
            NoteKind::OpeningNote => record.encrypted_nullifier,
            NoteKind::ContinuingNote => {
                decrypt_field(ctx, &record.encrypted_nullifier, NULLIFIER_COUNTER)?
            }
        };

        Ok(NoteState {
            nonce,
            kind,
            nonce_commitment,
            operation: record.operation,
            balance: kind.resulting_balance(&inputs),
            nullifier: inputs.nullifier,
            unlocks_at: inputs.unlocks_at,
            next_nullifier,
            commitment,
            used: record.used,
            leaf_index: record.leaf_index,
            membership,
        })
    }

    fn membership(&self, record: &LedgerRecord) -> Result<Option<MembershipWitness>, DiagnosticKind> {
        let (Some(tree), Some(leaf_index)) = (self.tree, record.leaf_index) else {
            return Ok(None);
        };
        if !self.attach_membership {
            return Ok(None);
        }

        let mismatch = |reason: String| DiagnosticKind::MembershipMismatch { leaf_index, reason };

        match tree.leaf(leaf_index) {
            None => {
                // The mirror is behind the ledger; nothing to check yet.
                log::debug!("leaf {leaf_index} not in local tree of size {}", tree.size());
                return Ok(None);
            }
            Some(leaf) if leaf != record.commitment_leaf => {
                return Err(mismatch("stored leaf differs from local tree".into()));
            }
            Some(_) => {}
        }

        let proof = tree
            .generate_proof(leaf_index)
            .map_err(|e| mismatch(e.to_string()))?;
        match proof.verify() {
            Ok(true) => Ok(Some(MembershipWitness {
                proof,
                tree: tree.snapshot(),
            })),
            Ok(false) => Err(mismatch("proof does not reach the local root".into())),
            Err(e) => Err(mismatch(e.to_string())),
        }
    }
}

fn decrypt_field(ctx: &SessionContext, ciphertext: &Scalar, counter: u64) -> Result<Scalar, DiagnosticKind> {
    decrypt_with_view_key(ciphertext, ctx.view_key(), counter).map_err(|e| {
        DiagnosticKind::MalformedInput {
            reason: e.to_string(),
        }
    })
}

/// Rebuild the history of one (user, chain, token) from nonce 0.
pub fn reconstruct_account_history<L: LedgerSource + ?Sized>(
    ledger: &L,
    user_key: UserKey,
    chain_id: u64,
    token: TokenAddress,
    current_nonce: u64,
) -> Reconstruction {
    let ctx = SessionContext::new(user_key, chain_id, token);
    Reconstructor::new(ledger).reconstruct(&ctx, current_nonce)
}
