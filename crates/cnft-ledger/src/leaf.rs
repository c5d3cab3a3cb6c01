//! Leaf records and their canonical hash

use cnft_primitives::{AssetId, Node, Pubkey};
use serde::{Deserialize, Serialize};

/// Domain separator for leaf hashing
pub const DOMAIN_LEAF: &[u8] = b"CNFT_LEAF_V1";

/// Leaf schema version, hashed into every leaf
pub const LEAF_VERSION: u8 = 1;

/// Full state of one compressed asset
///
/// Only `hash()` is stored in the tree. Callers hold the record itself
/// (usually fetched from an indexer) and present it with a proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafRecord {
    /// `AssetId::derive(tree_id, nonce)`
    pub asset_id: AssetId,

    /// Current holder
    pub owner: Pubkey,

    /// Identity allowed to transfer on the owner's behalf
    pub delegate: Option<Pubkey>,

    /// Mint counter value at creation, frozen afterwards
    pub nonce: u64,

    /// Hash of the metadata
    pub data_hash: Node,

    /// Hash of the creator list
    pub creator_hash: Node,
}

impl LeafRecord {
    /// Record for a freshly minted asset
    pub fn new(
        tree_id: &Pubkey,
        nonce: u64,
        owner: Pubkey,
        delegate: Option<Pubkey>,
        data_hash: Node,
        creator_hash: Node,
    ) -> Self {
        Self {
            asset_id: AssetId::derive(tree_id, nonce),
            owner,
            delegate,
            nonce,
            data_hash,
            creator_hash,
        }
    }

    /// `SHA256(domain || version || asset_id || owner || tag || delegate || nonce || data_hash || creator_hash)`
    ///
    /// The tag byte distinguishes "no delegate" from a zero delegate key.
    pub fn hash(&self) -> Node {
        let (tag, delegate) = match &self.delegate {
            Some(delegate) => (1u8, *delegate.as_bytes()),
            None => (0u8, [0u8; 32]),
        };
        Node::hashv(
            DOMAIN_LEAF,
            &[
                &[LEAF_VERSION],
                self.asset_id.as_pubkey().as_bytes(),
                self.owner.as_bytes(),
                &[tag],
                &delegate,
                &self.nonce.to_le_bytes(),
                self.data_hash.as_bytes(),
                self.creator_hash.as_bytes(),
            ],
        )
    }

    /// Whether `caller` may transfer this asset
    pub fn can_transfer(&self, caller: &Pubkey) -> bool {
        self.owner == *caller || self.delegate.as_ref() == Some(caller)
    }

    /// Copy with a new owner and the delegate cleared
    pub fn transferred_to(&self, new_owner: Pubkey) -> Self {
        Self {
            owner: new_owner,
            delegate: None,
            ..self.clone()
        }
    }

    /// Copy with the delegate replaced
    pub fn delegated_to(&self, delegate: Option<Pubkey>) -> Self {
        Self {
            delegate,
            ..self.clone()
        }
    }
}
