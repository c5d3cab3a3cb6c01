//! Ledger and per-tree configuration

use cnft_merkle::TreeParams;
use cnft_primitives::Pubkey;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// Ledger-wide settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Only accept the canonical depth/buffer pairs at tree creation
    pub require_canonical_sizes: bool,
}

impl LedgerConfig {
    /// Configuration matching the production size table
    pub fn strict() -> Self {
        Self {
            require_canonical_sizes: true,
        }
    }

    /// Check creation parameters against this configuration
    pub fn validate_params(&self, params: &TreeParams) -> LedgerResult<()> {
        params.validate()?;
        if self.require_canonical_sizes && !params.is_canonical() {
            return Err(LedgerError::InvalidTreeConfig(format!(
                "({}, {}) is not a supported depth/buffer pair",
                params.max_depth, params.max_buffer_size
            )));
        }
        Ok(())
    }
}

/// Per-tree authority record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeConfig {
    pub tree_id: Pubkey,
    pub tree_creator: Pubkey,
    /// Defaults to the creator
    pub tree_delegate: Pubkey,
    /// Anyone may mint into a public tree
    pub is_public: bool,
    /// Mint counter; the next asset's nonce
    pub num_minted: u64,
}

impl TreeConfig {
    pub fn new(tree_id: Pubkey, tree_creator: Pubkey, is_public: bool) -> Self {
        Self {
            tree_id,
            tree_creator,
            tree_delegate: tree_creator,
            is_public,
            num_minted: 0,
        }
    }

    /// Whether `caller` may mint into this tree
    pub fn can_mint(&self, caller: &Pubkey) -> bool {
        self.is_public || *caller == self.tree_creator || *caller == self.tree_delegate
    }
}
