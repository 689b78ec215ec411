//! Errors raised by the privacy primitives.
//!
//! Every variant is a malformed-input failure: the pure functions in this
//! crate never fail on well-formed data.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PrivacyError {
    #[error("non-canonical field element encoding")]
    NonCanonicalScalar,

    #[error("invalid scalar encoding: {0}")]
    InvalidEncoding(String),

    #[error("point ({x}, {y}) is not on the curve")]
    NotOnCurve { x: String, y: String },

    #[error("keystream counter {counter} out of range (max {max})")]
    CounterOutOfRange { counter: u64, max: u64 },

    #[error("the zero leaf is reserved and cannot be inserted")]
    ZeroLeaf,

    #[error("leaf index {index} out of range for tree of size {size}")]
    IndexOutOfRange { index: u64, size: u64 },

    #[error("proof has {got} siblings, expected {expected}")]
    ProofLength { got: usize, expected: usize },

    #[error("tree depth {depth} outside supported range {min}..={max}")]
    DepthOutOfRange { depth: usize, min: usize, max: usize },

    #[error("tree is full at depth {0}")]
    TreeFull(usize),
}

pub type Result<T> = std::result::Result<T, PrivacyError>;
