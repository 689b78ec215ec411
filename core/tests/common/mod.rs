#![allow(dead_code)]

use ark_ff::Zero;
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use veilvault_core::{LedgerError, LedgerRecord, LedgerSource, MemoryLedger, OperationTag, SessionContext};
use veilvault_privacy::Scalar;
use veilvault_privacy::cipher::{BALANCE_COUNTER, EncryptionSlot, NULLIFIER_COUNTER};
use veilvault_privacy::commitment::{build_commitment, commitment_leaf, fold_shares, fold_unlocks_at};
use veilvault_privacy::keys::{NonceCommitment, TokenAddress, UserKey};
use veilvault_privacy::merkle::MerkleTree;

pub const CHAIN_ID: u64 = 31337;

pub fn token() -> TokenAddress {
    TokenAddress([0x5a; 20])
}

pub fn session(seed: u64) -> SessionContext {
    SessionContext::new(UserKey::from_scalar(Scalar::from(seed)), CHAIN_ID, token())
}

/// What the ledger believes about one account.
pub struct SimAccount {
    pub ctx: SessionContext,
    pub balance: Scalar,
    pub nullifier: Scalar,
    pub unlocks_at: Scalar,
}

impl SimAccount {
    pub fn new(ctx: SessionContext) -> Self {
        Self {
            ctx,
            balance: Scalar::zero(),
            nullifier: Scalar::zero(),
            unlocks_at: Scalar::zero(),
        }
    }
}

/// Writes records exactly the way the ledger does, including its
/// after-the-fact share folds, and mirrors every leaf into a tree.
pub struct LedgerFixture {
    pub ledger: MemoryLedger,
    pub tree: MerkleTree,
}

impl LedgerFixture {
    pub fn new() -> Self {
        Self {
            ledger: MemoryLedger::new(),
            tree: MerkleTree::new(),
        }
    }

    fn seal(account: &SimAccount, counter: u64, plaintext: Scalar) -> Scalar {
        EncryptionSlot::new(account.ctx.view_key(), counter)
            .unwrap()
            .seal(&plaintext)
    }

    fn publish(&mut self, nc: NonceCommitment, mut record: LedgerRecord) -> Scalar {
        let index = self.tree.size();
        self.tree.insert(record.commitment_leaf).unwrap();
        record.leaf_index = Some(index);
        let leaf = record.commitment_leaf;
        self.ledger.insert(nc, record);
        leaf
    }

    /// Nonce 0: commit with zero shares and lock, then fold both in.
    pub fn open(
        &mut self,
        account: &mut SimAccount,
        shares: u64,
        unlocks_at: u64,
        next_nullifier: u64,
    ) -> Scalar {
        let nc = account.ctx.nonce_commitment(0);
        let shares = Scalar::from(shares);
        let unlocks_at = Scalar::from(unlocks_at);

        let base = build_commitment(
            Scalar::zero(),
            Scalar::zero(),
            account.ctx.spending_key(),
            Scalar::zero(),
            &nc,
        );
        let point = fold_unlocks_at(&fold_shares(&base, &shares), &unlocks_at);

        account.balance = shares;
        account.nullifier = Scalar::from(next_nullifier);
        account.unlocks_at = unlocks_at;

        self.publish(
            nc,
            LedgerRecord {
                operation: OperationTag::Open,
                shares_added: shares,
                recorded_token: *account.ctx.token(),
                encrypted_balance: shares,
                encrypted_nullifier: account.nullifier,
                used: false,
                commitment_leaf: commitment_leaf(&point),
                unlocks_at,
                leaf_index: None,
            },
        )
    }

    /// Commit to the prior balance, then fold the new shares on top.
    pub fn top_up(
        &mut self,
        account: &mut SimAccount,
        nonce: u64,
        delta: u64,
        next_nullifier: u64,
    ) -> Scalar {
        let nc = account.ctx.nonce_commitment(nonce);
        let delta = Scalar::from(delta);
        let prior = account.balance;

        let base = build_commitment(
            prior,
            account.nullifier,
            account.ctx.spending_key(),
            account.unlocks_at,
            &nc,
        );
        let point = fold_shares(&base, &delta);

        let record = LedgerRecord {
            operation: OperationTag::TopUp,
            shares_added: delta,
            recorded_token: *account.ctx.token(),
            encrypted_balance: Self::seal(account, BALANCE_COUNTER, prior),
            encrypted_nullifier: Self::seal(account, NULLIFIER_COUNTER, Scalar::from(next_nullifier)),
            used: false,
            commitment_leaf: commitment_leaf(&point),
            unlocks_at: Scalar::zero(),
            leaf_index: None,
        };

        account.balance = prior + delta;
        account.nullifier = Scalar::from(next_nullifier);
        self.publish(nc, record)
    }

    /// Any non-minting operation: the encrypted balance is the new balance.
    pub fn settle(
        &mut self,
        account: &mut SimAccount,
        nonce: u64,
        operation: OperationTag,
        new_balance: u64,
        next_nullifier: u64,
    ) -> Scalar {
        let nc = account.ctx.nonce_commitment(nonce);
        let new_balance = Scalar::from(new_balance);

        let point = build_commitment(
            new_balance,
            account.nullifier,
            account.ctx.spending_key(),
            account.unlocks_at,
            &nc,
        );

        let record = LedgerRecord {
            operation,
            shares_added: Scalar::zero(),
            recorded_token: *account.ctx.token(),
            encrypted_balance: Self::seal(account, BALANCE_COUNTER, new_balance),
            encrypted_nullifier: Self::seal(account, NULLIFIER_COUNTER, Scalar::from(next_nullifier)),
            used: false,
            commitment_leaf: commitment_leaf(&point),
            unlocks_at: Scalar::zero(),
            leaf_index: None,
        };

        account.balance = new_balance;
        account.nullifier = Scalar::from(next_nullifier);
        self.publish(nc, record)
    }

    pub fn record_mut(&mut self, account: &SimAccount, nonce: u64) -> &mut LedgerRecord {
        self.ledger
            .get_mut(&account.ctx.nonce_commitment(nonce))
            .unwrap()
    }
}

/// Counts lookups and fails on selected nonce commitments.
pub struct FlakyLedger {
    pub inner: MemoryLedger,
    pub down: Mutex<HashSet<NonceCommitment>>,
    pub fetches: AtomicUsize,
}

impl FlakyLedger {
    pub fn new(inner: MemoryLedger) -> Self {
        Self {
            inner,
            down: Mutex::new(HashSet::new()),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fail_on(&self, nc: NonceCommitment) {
        self.down.lock().unwrap().insert(nc);
    }

    pub fn recover(&self) {
        self.down.lock().unwrap().clear();
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl LedgerSource for FlakyLedger {
    fn fetch(&self, nc: &NonceCommitment) -> Result<Option<LedgerRecord>, LedgerError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.down.lock().unwrap().contains(nc) {
            return Err(LedgerError::Unavailable("connection refused".into()));
        }
        self.inner.fetch(nc)
    }
}
