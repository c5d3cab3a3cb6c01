//! Submission format for ledger operations

use cnft_merkle::{MerkleProof, TreeParams};
use cnft_primitives::{AssetId, Node, Pubkey};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{LedgerError, LedgerResult};
use crate::leaf::LeafRecord;
use crate::metadata::MetadataArgs;
use crate::uncompressed::UncompressedAsset;
use crate::voucher::Voucher;

/// An operation submitted to [`crate::AssetLedger::execute`]
///
/// Leaf operations carry the caller's view of the current leaf and a proof
/// for it; both may be stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Instruction {
    CreateTree {
        tree_id: Pubkey,
        creator: Pubkey,
        params: TreeParams,
        is_public: bool,
    },
    SetTreeDelegate {
        tree_id: Pubkey,
        caller: Pubkey,
        new_delegate: Pubkey,
    },
    Mint {
        tree_id: Pubkey,
        caller: Pubkey,
        owner: Pubkey,
        delegate: Option<Pubkey>,
        metadata: MetadataArgs,
    },
    Transfer {
        tree_id: Pubkey,
        caller: Pubkey,
        leaf: LeafRecord,
        proof: MerkleProof,
        new_owner: Pubkey,
    },
    Delegate {
        tree_id: Pubkey,
        caller: Pubkey,
        leaf: LeafRecord,
        proof: MerkleProof,
        new_delegate: Option<Pubkey>,
    },
    Redeem {
        tree_id: Pubkey,
        caller: Pubkey,
        leaf: LeafRecord,
        proof: MerkleProof,
    },
    Decompress {
        tree_id: Pubkey,
        caller: Pubkey,
        nonce: u64,
        metadata: MetadataArgs,
    },
    VerifyLeaf {
        tree_id: Pubkey,
        leaf: Node,
        proof: MerkleProof,
    },
}

impl Instruction {
    /// Decode a JSON submission
    ///
    /// A `metadata` payload that does not decode (unknown or missing fields,
    /// wrong types) is reported as [`LedgerError::InvalidMetadata`]; any other
    /// decode failure as [`LedgerError::MalformedInstruction`].
    pub fn from_json(json: &str) -> LedgerResult<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| LedgerError::MalformedInstruction(e.to_string()))?;
        if let Some(metadata) = value.get("metadata") {
            MetadataArgs::deserialize(metadata)
                .map_err(|e| LedgerError::InvalidMetadata(e.to_string()))?;
        }
        serde_json::from_value(value).map_err(|e| LedgerError::MalformedInstruction(e.to_string()))
    }

    /// Tree the instruction targets
    pub fn tree_id(&self) -> &Pubkey {
        match self {
            Instruction::CreateTree { tree_id, .. }
            | Instruction::SetTreeDelegate { tree_id, .. }
            | Instruction::Mint { tree_id, .. }
            | Instruction::Transfer { tree_id, .. }
            | Instruction::Delegate { tree_id, .. }
            | Instruction::Redeem { tree_id, .. }
            | Instruction::Decompress { tree_id, .. }
            | Instruction::VerifyLeaf { tree_id, .. } => tree_id,
        }
    }

    /// Short operation name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Instruction::CreateTree { .. } => "create_tree",
            Instruction::SetTreeDelegate { .. } => "set_tree_delegate",
            Instruction::Mint { .. } => "mint",
            Instruction::Transfer { .. } => "transfer",
            Instruction::Delegate { .. } => "delegate",
            Instruction::Redeem { .. } => "redeem",
            Instruction::Decompress { .. } => "decompress",
            Instruction::VerifyLeaf { .. } => "verify_leaf",
        }
    }
}

/// Result of a committed leaf write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafCommit {
    pub tree_id: Pubkey,
    pub asset_id: AssetId,
    pub nonce: u64,
    pub index: u32,
    /// Tree sequence number of the write
    pub seq: u64,
    /// Root after the write
    pub root: Node,
    /// New leaf content, `None` when emptied
    pub leaf: Option<LeafRecord>,
}

/// Outcome of [`crate::AssetLedger::execute`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum Receipt {
    TreeCreated { tree_id: Pubkey, root: Node },
    TreeDelegateSet { tree_id: Pubkey, delegate: Pubkey },
    Leaf(LeafCommit),
    Redeemed { commit: LeafCommit, voucher: Voucher },
    Decompressed(UncompressedAsset),
    Verified { tree_id: Pubkey, index: u32 },
}

impl Receipt {
    /// The leaf commit, for receipts that wrote a leaf
    pub fn commit(&self) -> Option<&LeafCommit> {
        match self {
            Receipt::Leaf(commit) | Receipt::Redeemed { commit, .. } => Some(commit),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_json_tagged() {
        let ix = Instruction::VerifyLeaf {
            tree_id: Pubkey::from_seed("tree"),
            leaf: Node::sha256(b"leaf"),
            proof: MerkleProof::new(Node::zero(), 0, vec![Node::zero(); 3]),
        };
        let value = serde_json::to_value(&ix).unwrap();
        assert_eq!(value["op"], "verifyLeaf");
        let back: Instruction = serde_json::from_value(value).unwrap();
        assert_eq!(back, ix);
        assert_eq!(back.name(), "verify_leaf");
    }

    fn mint_json() -> Value {
        let ix = Instruction::Mint {
            tree_id: Pubkey::from_seed("tree"),
            caller: Pubkey::from_seed("alice"),
            owner: Pubkey::from_seed("alice"),
            delegate: None,
            metadata: MetadataArgs::new("A", "AST", "uri"),
        };
        serde_json::to_value(&ix).unwrap()
    }

    #[test]
    fn test_from_json_accepts_well_formed_mint() {
        let ix = Instruction::from_json(&mint_json().to_string()).unwrap();
        assert_eq!(ix.name(), "mint");
    }

    #[test]
    fn test_from_json_unknown_metadata_field() {
        let mut value = mint_json();
        value["metadata"]["royaltyOverride"] = Value::from(10_000);
        let err = Instruction::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidMetadata(_)), "{err}");
    }

    #[test]
    fn test_from_json_malformed_envelope() {
        let mut value = mint_json();
        value["op"] = Value::from("burn");
        assert!(matches!(
            Instruction::from_json(&value.to_string()),
            Err(LedgerError::MalformedInstruction(_))
        ));
        assert!(matches!(
            Instruction::from_json("{not json"),
            Err(LedgerError::MalformedInstruction(_))
        ));
    }
}
