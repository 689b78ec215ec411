mod common;

use common::{FlakyLedger, LedgerFixture, SimAccount, session};
use tempfile::TempDir;
use veilvault_core::{
    CacheKey, MemoryCache, NoteCache, OperationTag, Reconstructor, SCHEMA_VERSION, Severity,
};
#[cfg(feature = "rocksdb")]
use veilvault_core::RocksCache;
use veilvault_privacy::Scalar;
use veilvault_privacy::merkle::MerkleTree;

/// Four notes on one account: open, top-up, transfer, top-up.
fn four_note_history() -> (LedgerFixture, SimAccount) {
    let mut fixture = LedgerFixture::new();
    let mut account = SimAccount::new(session(2024));
    fixture.open(&mut account, 10_000, 1_750_000_000, 1);
    fixture.top_up(&mut account, 1, 500, 2);
    fixture.settle(&mut account, 2, OperationTag::Transfer, 9_000, 3);
    fixture.top_up(&mut account, 3, 1_000, 4);
    (fixture, account)
}

#[test]
fn resume_only_fetches_new_nonces() {
    let (fixture, account) = four_note_history();
    let ledger = FlakyLedger::new(fixture.ledger.clone());
    let cache = MemoryCache::new();
    let engine = Reconstructor::new(&ledger);

    let first = engine.reconstruct_incremental(&account.ctx, 2, &cache).unwrap();
    assert_eq!(first.notes.len(), 2);
    assert_eq!(ledger.fetches(), 2);

    let second = engine.reconstruct_incremental(&account.ctx, 4, &cache).unwrap();
    assert_eq!(ledger.fetches(), 4);

    let full = Reconstructor::new(&fixture.ledger).reconstruct(&account.ctx, 4);
    assert_eq!(second.notes, full.notes);
    assert_eq!(second.balance(), Some(Scalar::from(10_000u64)));

    // Nothing new: answered from the cache alone.
    let third = engine.reconstruct_incremental(&account.ctx, 4, &cache).unwrap();
    assert_eq!(ledger.fetches(), 4);
    assert_eq!(third.notes, full.notes);
}

#[test]
fn aborted_run_resumes_at_the_failed_nonce() {
    let (fixture, account) = four_note_history();
    let ledger = FlakyLedger::new(fixture.ledger.clone());
    let cache = MemoryCache::new();
    let engine = Reconstructor::new(&ledger);

    ledger.fail_on(account.ctx.nonce_commitment(2));
    let partial = engine.reconstruct_incremental(&account.ctx, 4, &cache).unwrap();
    assert!(partial.aborted);
    assert_eq!(partial.notes.len(), 2);

    let stored = cache.load(&CacheKey::for_session(&account.ctx)).unwrap().unwrap();
    assert_eq!(stored.last_nonce, Some(1));

    ledger.recover();
    let before = ledger.fetches();
    let resumed = engine.reconstruct_incremental(&account.ctx, 4, &cache).unwrap();
    assert_eq!(ledger.fetches() - before, 2);
    assert!(resumed.is_clean());
    assert_eq!(resumed.notes.len(), 4);
}

#[test]
fn failed_nonce_is_retried_on_the_next_run() {
    let (mut fixture, account) = four_note_history();
    let real = fixture.record_mut(&account, 2).commitment_leaf;
    fixture.record_mut(&account, 2).commitment_leaf = Scalar::from(1u64);

    let cache = MemoryCache::new();
    let broken = Reconstructor::new(&fixture.ledger)
        .reconstruct_incremental(&account.ctx, 4, &cache)
        .unwrap();
    assert_eq!(broken.notes.len(), 2);
    assert_eq!(broken.last_final_nonce, Some(1));

    fixture.record_mut(&account, 2).commitment_leaf = real;
    let fixed = Reconstructor::new(&fixture.ledger)
        .reconstruct_incremental(&account.ctx, 4, &cache)
        .unwrap();
    assert!(fixed.is_clean());
    assert_eq!(fixed.notes.len(), 4);
}

#[test]
fn repaired_nonce_is_rebuilt_with_the_carry_before_it() {
    let mut fixture = LedgerFixture::new();
    let mut account = SimAccount::new(session(77));
    fixture.open(&mut account, 4_000, 1_750_000_000, 1);
    fixture.top_up(&mut account, 1, 600, 1);
    fixture.settle(&mut account, 2, OperationTag::Withdraw, 3_000, 9);

    // Nonce 1 fails while nonce 2 still verifies: both commit nullifier 1.
    let real = fixture.record_mut(&account, 1).commitment_leaf;
    fixture.record_mut(&account, 1).commitment_leaf = Scalar::from(5u64);

    let cache = MemoryCache::new();
    let broken = Reconstructor::new(&fixture.ledger)
        .reconstruct_incremental(&account.ctx, 3, &cache)
        .unwrap();
    let nonces: Vec<u64> = broken.notes.iter().map(|n| n.nonce).collect();
    assert_eq!(nonces, vec![2, 0]);
    assert_eq!(broken.last_final_nonce, Some(0));

    fixture.record_mut(&account, 1).commitment_leaf = real;
    let repaired = Reconstructor::new(&fixture.ledger)
        .reconstruct_incremental(&account.ctx, 3, &cache)
        .unwrap();

    assert!(repaired.is_clean(), "{:?}", repaired.diagnostics);
    let nonces: Vec<u64> = repaired.notes.iter().map(|n| n.nonce).collect();
    assert_eq!(nonces, vec![2, 1, 0]);
    assert_eq!(repaired.last_final_nonce, Some(2));

    let full = Reconstructor::new(&fixture.ledger).reconstruct(&account.ctx, 3);
    assert_eq!(repaired.notes, full.notes);
    assert_eq!(repaired.balance(), Some(Scalar::from(3_000u64)));
}

#[test]
fn v1_cache_entry_is_migrated_and_used() {
    let (fixture, account) = four_note_history();
    let early = Reconstructor::new(&fixture.ledger).reconstruct(&account.ctx, 2);

    let cache = MemoryCache::new();
    let key = CacheKey::for_session(&account.ctx);
    let v1 = serde_json::json!({
        "schema_version": 1,
        "last_nonce": 1,
        "notes": early.notes,
    });
    cache
        .put_raw(&key.to_bytes(), serde_json::to_vec(&v1).unwrap())
        .unwrap();

    let ledger = FlakyLedger::new(fixture.ledger.clone());
    let result = Reconstructor::new(&ledger)
        .reconstruct_incremental(&account.ctx, 4, &cache)
        .unwrap();

    assert_eq!(ledger.fetches(), 2);
    assert!(result.is_clean());
    assert_eq!(result.notes.len(), 4);
    assert_eq!(cache.load(&key).unwrap().unwrap().schema_version, SCHEMA_VERSION);
}

#[test]
fn unknown_schema_forces_full_replay() {
    let (fixture, account) = four_note_history();
    let cache = MemoryCache::new();
    let key = CacheKey::for_session(&account.ctx);
    cache
        .put_raw(
            &key.to_bytes(),
            br#"{"schema_version":99,"last_nonce":3,"notes":[]}"#.to_vec(),
        )
        .unwrap();

    let ledger = FlakyLedger::new(fixture.ledger.clone());
    let result = Reconstructor::new(&ledger)
        .reconstruct_incremental(&account.ctx, 4, &cache)
        .unwrap();

    assert_eq!(ledger.fetches(), 4);
    assert_eq!(result.notes.len(), 4);
}

#[test]
fn smaller_tree_than_cached_forces_full_replay() {
    let (fixture, account) = four_note_history();
    let cache = MemoryCache::new();

    Reconstructor::new(&fixture.ledger)
        .with_tree(&fixture.tree)
        .reconstruct_incremental(&account.ctx, 4, &cache)
        .unwrap();

    let ledger = FlakyLedger::new(fixture.ledger.clone());
    let short = MerkleTree::new();
    let result = Reconstructor::new(&ledger)
        .with_tree(&short)
        .reconstruct_incremental(&account.ctx, 4, &cache)
        .unwrap();

    assert_eq!(ledger.fetches(), 4);
    assert!(result.notes.iter().all(|n| n.membership.is_none()));
}

#[test]
fn diverged_tree_of_same_size_forces_full_replay() {
    let (fixture, account) = four_note_history();
    let cache = MemoryCache::new();

    Reconstructor::new(&fixture.ledger)
        .with_tree(&fixture.tree)
        .reconstruct_incremental(&account.ctx, 4, &cache)
        .unwrap();

    // Same tree again: answered from the cache.
    let ledger = FlakyLedger::new(fixture.ledger.clone());
    Reconstructor::new(&ledger)
        .with_tree(&fixture.tree)
        .reconstruct_incremental(&account.ctx, 4, &cache)
        .unwrap();
    assert_eq!(ledger.fetches(), 0);

    let diverged = MerkleTree::from_leaves((1..=fixture.tree.size()).map(Scalar::from)).unwrap();
    assert_eq!(diverged.size(), fixture.tree.size());
    let result = Reconstructor::new(&ledger)
        .with_tree(&diverged)
        .reconstruct_incremental(&account.ctx, 4, &cache)
        .unwrap();

    assert_eq!(ledger.fetches(), 4);
    assert_eq!(result.count(Severity::NonceFatal), 4);
}

#[cfg(feature = "rocksdb")]
#[test]
fn rocksdb_cache_survives_restart() {
    let (fixture, account) = four_note_history();
    let dir = TempDir::new().unwrap();

    {
        let cache = RocksCache::open(dir.path()).unwrap();
        Reconstructor::new(&fixture.ledger)
            .reconstruct_incremental(&account.ctx, 3, &cache)
            .unwrap();
    }

    let cache = RocksCache::open(dir.path()).unwrap();
    let ledger = FlakyLedger::new(fixture.ledger.clone());
    let result = Reconstructor::new(&ledger)
        .reconstruct_incremental(&account.ctx, 4, &cache)
        .unwrap();

    assert_eq!(ledger.fetches(), 1);
    assert_eq!(result.notes.len(), 4);
    assert_eq!(result.balance(), Some(Scalar::from(10_000u64)));
}
