//! Wire types for the Digital Asset Standard (DAS) JSON-RPC API
//!
//! Digests and identities travel as base58 strings.

use std::str::FromStr;

use cnft_ledger::LeafRecord;
use cnft_primitives::{AssetId, Node, Pubkey};
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};
use crate::indexer::{AssetProof, IndexedLeaf};

/// JSON-RPC 2.0 request envelope
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest<'a, P> {
    pub jsonrpc: &'static str,
    pub id: String,
    pub method: &'a str,
    pub params: P,
}

impl<'a, P: Serialize> RpcRequest<'a, P> {
    pub fn new(method: &'a str, params: P) -> Self {
        Self {
            jsonrpc: "2.0",
            id: uuid::Uuid::new_v4().to_string(),
            method,
            params,
        }
    }
}

/// JSON-RPC 2.0 response envelope
#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse<T> {
    #[serde(default)]
    pub id: Option<String>,
    pub result: Option<T>,
    pub error: Option<RpcErrorObject>,
}

/// JSON-RPC error object
#[derive(Debug, Clone, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

/// `getAsset` result (fields this client uses)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DasAsset {
    pub id: String,
    #[serde(default)]
    pub interface: Option<String>,
    pub ownership: DasOwnership,
    pub compression: DasCompression,
    #[serde(default)]
    pub burnt: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DasOwnership {
    pub owner: String,
    #[serde(default)]
    pub delegate: Option<String>,
    #[serde(default)]
    pub delegated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DasCompression {
    pub compressed: bool,
    pub tree: String,
    pub leaf_id: u64,
    pub seq: u64,
    pub data_hash: String,
    pub creator_hash: String,
    #[serde(default)]
    pub asset_hash: Option<String>,
}

/// `getAssetProof` result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DasAssetProof {
    pub root: String,
    pub proof: Vec<String>,
    /// Heap-style node index: `2^depth + leaf_index`
    pub node_index: u64,
    pub leaf: String,
    pub tree_id: String,
}

/// `getAssetsByOwner` result page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DasAssetList {
    pub total: u64,
    pub limit: u64,
    #[serde(default)]
    pub page: Option<u64>,
    pub items: Vec<DasAsset>,
}

/// Sort order for listing calls
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortBy {
    pub sort_by: String,
    pub sort_direction: String,
}

impl Default for SortBy {
    fn default() -> Self {
        Self {
            sort_by: "created".to_string(),
            sort_direction: "asc".to_string(),
        }
    }
}

fn pubkey(field: &str, value: &str) -> Result<Pubkey> {
    Pubkey::from_str(value)
        .map_err(|e| ClientError::InvalidResponse(format!("{}: {}", field, e)))
}

fn node(field: &str, value: &str) -> Result<Node> {
    Node::from_base58(value).map_err(|e| ClientError::InvalidResponse(format!("{}: {}", field, e)))
}

impl DasAsset {
    /// Convert to the indexer-neutral form
    pub fn to_indexed_leaf(&self) -> Result<IndexedLeaf> {
        let asset_id = AssetId(pubkey("id", &self.id)?);
        let tree_id = pubkey("compression.tree", &self.compression.tree)?;
        let delegate = match (&self.ownership.delegate, self.ownership.delegated) {
            (Some(delegate), true) => Some(pubkey("ownership.delegate", delegate)?),
            _ => None,
        };
        let leaf_index = u32::try_from(self.compression.leaf_id).map_err(|_| {
            ClientError::InvalidResponse(format!("leaf_id {} too large", self.compression.leaf_id))
        })?;

        Ok(IndexedLeaf {
            tree_id,
            leaf_index,
            leaf: LeafRecord {
                asset_id,
                owner: pubkey("ownership.owner", &self.ownership.owner)?,
                delegate,
                nonce: self.compression.leaf_id,
                data_hash: node("compression.data_hash", &self.compression.data_hash)?,
                creator_hash: node("compression.creator_hash", &self.compression.creator_hash)?,
            },
            seq: self.compression.seq,
            compressed: self.compression.compressed && !self.burnt,
        })
    }
}

impl DasAssetProof {
    /// Convert to the indexer-neutral form
    pub fn to_asset_proof(&self) -> Result<AssetProof> {
        let depth = self.proof.len() as u32;
        let width = 1u64
            .checked_shl(depth)
            .filter(|width| *width <= self.node_index && depth <= 32)
            .ok_or_else(|| {
                ClientError::InvalidResponse(format!(
                    "node_index {} inconsistent with proof of {} nodes",
                    self.node_index, depth
                ))
            })?;
        let leaf_index = u32::try_from(self.node_index - width).map_err(|_| {
            ClientError::InvalidResponse(format!("node_index {} out of range", self.node_index))
        })?;

        Ok(AssetProof {
            tree_id: pubkey("tree_id", &self.tree_id)?,
            root: node("root", &self.root)?,
            leaf_index,
            leaf: node("leaf", &self.leaf)?,
            proof: self
                .proof
                .iter()
                .map(|sibling| node("proof", sibling))
                .collect::<Result<Vec<_>>>()?,
        })
    }
}
