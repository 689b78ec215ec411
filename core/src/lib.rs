//! VeilVault Core
//!
//! Rebuilds an account's note history from public ledger records plus the
//! owner's user key.
//!
//! ```text
//!   user key ──▶ SessionContext ──▶ nonce commitment(n) ──▶ LedgerSource
//!                                                             │
//!        ┌────────────────────────────────────────────────────┘
//!        ▼
//!   decrypt ──▶ rebuild commitment ──▶ leaf == stored leaf? ──▶ NoteState
//!                                                             │
//!                                         NoteCache ◀─────────┘
//! ```
//!
//! Nonces of one account replay strictly in order. Independent accounts
//! replay in parallel.

pub mod context;
pub mod diagnostics;
pub mod ledger;
pub mod reconstruct;
pub mod storage;

pub use context::SessionContext;
pub use diagnostics::{Diagnostic, DiagnosticKind, Severity};
pub use ledger::{LedgerError, LedgerRecord, LedgerSource, MemoryLedger, OperationTag};
pub use reconstruct::{
    MembershipWitness, NoteState, Reconstruction, Reconstructor, reconstruct_account_history,
};
pub use storage::{CacheKey, CachedAccount, NoteCache, SCHEMA_VERSION, memory::MemoryCache};

#[cfg(feature = "rocksdb")]
pub use storage::rocks::RocksCache;
