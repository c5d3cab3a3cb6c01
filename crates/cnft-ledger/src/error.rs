//! Error types for ledger operations

use cnft_merkle::TreeError;
use cnft_primitives::{AssetId, Pubkey};
use thiserror::Error;

/// Errors returned by [`crate::AssetLedger`]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// No tree registered under this id
    #[error("Tree not found: {0}")]
    TreeNotFound(Pubkey),

    /// A tree is already registered under this id
    #[error("Tree already exists: {0}")]
    TreeAlreadyExists(Pubkey),

    /// Depth, buffer or canopy rejected at creation
    #[error("Invalid tree config: {0}")]
    InvalidTreeConfig(String),

    /// Caller may not perform this tree-level action
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Every leaf slot of the tree is taken
    #[error("Tree is full: capacity {capacity} leaves")]
    TreeFull { capacity: u64 },

    /// Mint payload failed validation
    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    /// Caller is neither the owner nor (where allowed) the delegate
    #[error("{caller} is not authorized for asset {asset_id}")]
    NotOwner { asset_id: AssetId, caller: Pubkey },

    /// Proof does not establish the claimed leaf
    #[error("Proof invalid: {0}")]
    ProofInvalid(String),

    /// Proof too stale or the leaf changed after it was fetched
    #[error("Concurrent modification of leaf {index}")]
    ConcurrentModification { index: u32 },

    /// This nonce has already been redeemed once
    #[error("Asset {tree_id}/{nonce} already redeemed")]
    AlreadyRedeemed { tree_id: Pubkey, nonce: u64 },

    /// No live voucher for the nonce
    #[error("Voucher not found: {tree_id}/{nonce}")]
    VoucherNotFound { tree_id: Pubkey, nonce: u64 },

    /// Decompress caller does not own the voucher
    #[error("Owner mismatch: voucher owned by {expected}, caller {actual}")]
    OwnerMismatch { expected: Pubkey, actual: Pubkey },

    /// Supplied metadata does not hash to the voucher's recorded hashes
    #[error("Data hash mismatch for asset {0}")]
    DataHashMismatch(AssetId),

    /// Uncompressed store refused the record
    #[error("Uncompressed store error: {0}")]
    Store(String),

    /// Snapshot decode or restore failure
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// Submitted instruction could not be decoded
    #[error("Malformed instruction: {0}")]
    MalformedInstruction(String),
}

impl LedgerError {
    /// Whether refetching state and resubmitting can succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::ConcurrentModification { .. })
    }
}

impl From<TreeError> for LedgerError {
    fn from(err: TreeError) -> Self {
        match err {
            TreeError::ConcurrentModification { index } => {
                LedgerError::ConcurrentModification { index }
            }
            TreeError::InvalidConfig(msg) => LedgerError::InvalidTreeConfig(msg),
            TreeError::Snapshot(msg) => LedgerError::Snapshot(msg),
            // Index and length problems are malformed proofs from the ledger's view
            other @ (TreeError::ProofInvalid { .. }
            | TreeError::IndexOutOfRange { .. }
            | TreeError::InvalidProofLength { .. }) => LedgerError::ProofInvalid(other.to_string()),
            TreeError::TreeFull { capacity } => LedgerError::TreeFull { capacity },
        }
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
