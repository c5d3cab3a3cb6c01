//! Indexer access
//!
//! The ledger keeps no per-asset state, so callers learn a leaf's content
//! and proof from an indexer that mirrors ledger events. Indexers are
//! eventually consistent: a returned proof may already be a few writes
//! behind, which the tree tolerates within its changelog window.

use async_trait::async_trait;
use cnft_ledger::LeafRecord;
use cnft_merkle::MerkleProof;
use cnft_primitives::{AssetId, Node, Pubkey};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// An asset as seen by an indexer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedLeaf {
    pub tree_id: Pubkey,
    pub leaf_index: u32,
    /// Last known leaf content
    pub leaf: LeafRecord,
    /// Tree sequence number of the last write the indexer saw
    pub seq: u64,
    /// `false` once the leaf was redeemed
    pub compressed: bool,
}

/// Inclusion proof served by an indexer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetProof {
    pub tree_id: Pubkey,
    /// Root the proof was taken against
    pub root: Node,
    pub leaf_index: u32,
    /// Leaf hash the indexer holds at `leaf_index`
    pub leaf: Node,
    /// Siblings, leaf level first
    pub proof: Vec<Node>,
}

impl AssetProof {
    /// Form accepted by the ledger
    pub fn to_merkle_proof(&self) -> MerkleProof {
        MerkleProof::new(self.root, self.leaf_index, self.proof.clone())
    }
}

/// Read side of an indexer
#[async_trait]
pub trait IndexerClient: Send + Sync {
    /// Current leaf content of an asset
    async fn get_leaf(&self, asset_id: &AssetId) -> Result<IndexedLeaf>;

    /// Current inclusion proof of an asset
    async fn get_proof(&self, asset_id: &AssetId) -> Result<AssetProof>;
}
