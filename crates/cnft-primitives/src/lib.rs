//! Compressed-asset primitives
//!
//! This crate provides the building blocks shared by the tree, the ledger
//! and the indexer clients:
//! - `Node`: 32-byte SHA-256 tree digests and the empty-subtree table
//! - `Pubkey`: 32-byte identities with base58 encoding
//! - `AssetId`: deterministic asset address derived from `(tree, nonce)`

pub mod error;
pub mod hash;
pub mod pubkey;

pub use error::EncodingError;
pub use hash::{empty_node, empty_nodes, hash_pair, hash_to_parent, Node, EMPTY_LEAF, MAX_DEPTH};
pub use pubkey::{AssetId, Pubkey, DOMAIN_ASSET_ID};
