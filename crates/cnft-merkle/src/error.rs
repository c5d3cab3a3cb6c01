//! Error types for tree operations

use thiserror::Error;

/// Errors that can occur while mutating or proving against a tree
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// Every leaf slot has been appended
    #[error("Tree is full: capacity {capacity} leaves")]
    TreeFull { capacity: u64 },

    /// Depth, buffer size or canopy depth outside the supported range
    #[error("Invalid tree config: {0}")]
    InvalidConfig(String),

    /// Leaf index is past the append frontier
    #[error("Leaf index {index} out of range (appended leaves: {appended})")]
    IndexOutOfRange { index: u32, appended: u32 },

    /// Proof carries the wrong number of siblings
    #[error("Proof has {actual} siblings, expected between {min} and {max}")]
    InvalidProofLength { actual: usize, min: usize, max: usize },

    /// Proof does not reconcile to the current root
    #[error("Proof for leaf {index} does not reconcile to the current root")]
    ProofInvalid { index: u32 },

    /// The proof's root left the changelog window or the leaf changed since
    #[error("Leaf {index} was modified concurrently or its proof is too stale")]
    ConcurrentModification { index: u32 },

    /// Snapshot could not be decoded or is internally inconsistent
    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

impl TreeError {
    /// Whether refetching a proof and retrying can succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, TreeError::ConcurrentModification { .. })
    }
}

/// Result type for tree operations
pub type TreeResult<T> = Result<T, TreeError>;
