//! Per-nonce diagnostics.
//!
//! The reconstruction engine never stops at the first problem. Each problem
//! is recorded against the nonce it happened on and classified by how much
//! of the run it invalidates.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use veilvault_privacy::Scalar;
use veilvault_privacy::encoding::{hex_scalar, scalar_to_hex};
use veilvault_privacy::keys::{NonceCommitment, TokenAddress};

use crate::ledger::OperationTag;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Nothing to do at this nonce.
    Skip,
    /// The note was produced but something looked off.
    Warning,
    /// No note for this nonce. Later nonces are still attempted.
    NonceFatal,
    /// The run stopped here. Notes produced so far are kept.
    RunFatal,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticKind {
    #[error("no ledger record")]
    NotFound,

    #[error("leaf mismatch: expected {}, computed {}", scalar_to_hex(.expected), scalar_to_hex(.computed))]
    IntegrityMismatch {
        #[serde(with = "hex_scalar")]
        expected: Scalar,
        #[serde(with = "hex_scalar")]
        computed: Scalar,
    },

    #[error("record is for token {recorded}, session is for {expected}")]
    TokenMismatch {
        recorded: TokenAddress,
        expected: TokenAddress,
    },

    #[error("local tree disagrees at leaf {leaf_index}: {reason}")]
    MembershipMismatch { leaf_index: u64, reason: String },

    #[error("{operation:?} reports {} added shares on top of a decrypted balance; not folded", scalar_to_hex(.shares_added))]
    AmbiguousShares {
        operation: OperationTag,
        #[serde(with = "hex_scalar")]
        shares_added: Scalar,
    },

    #[error("malformed input: {reason}")]
    MalformedInput { reason: String },

    #[error("upstream unavailable: {reason}")]
    UpstreamUnavailable { reason: String },
}

impl DiagnosticKind {
    pub fn severity(&self) -> Severity {
        match self {
            Self::NotFound => Severity::Skip,
            Self::AmbiguousShares { .. } => Severity::Warning,
            Self::IntegrityMismatch { .. }
            | Self::TokenMismatch { .. }
            | Self::MembershipMismatch { .. }
            | Self::MalformedInput { .. } => Severity::NonceFatal,
            Self::UpstreamUnavailable { .. } => Severity::RunFatal,
        }
    }
}

/// A diagnostic tied to the nonce it was raised on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub nonce: u64,
    pub nonce_commitment: NonceCommitment,
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "nonce {} ({}): {}", self.nonce, self.nonce_commitment, self.kind)
    }
}
