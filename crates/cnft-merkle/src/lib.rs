//! Concurrent Merkle tree for compressed assets
//!
//! This crate provides the on-ledger half of asset compression: a
//! fixed-depth SHA-256 Merkle tree that stores only its root, a bounded
//! changelog and the append frontier, and accepts proofs that are a few
//! transitions stale.
//!
//! # Architecture
//!
//! - **Tree**: `ConcurrentMerkleTree` with append, mutate and prove
//! - **Changelog**: recent root transitions used to fast-forward proofs
//! - **Full tree**: `FullMerkleTree`, the indexer-side mirror that serves proofs
//! - **Snapshot**: JSON and compact binary persistence
//!
//! # Usage
//!
//! ```ignore
//! use cnft_merkle::{ConcurrentMerkleTree, FullMerkleTree, TreeParams};
//!
//! let mut tree = ConcurrentMerkleTree::new(TreeParams::new(14, 64))?;
//! let mut mirror = FullMerkleTree::new(14)?;
//!
//! tree.append(leaf)?;
//! mirror.set_leaf(0, leaf)?;
//!
//! let proof = mirror.get_proof(0)?;
//! tree.apply_mutation(&proof, &leaf, new_leaf)?;
//! ```

pub mod changelog;
pub mod error;
pub mod full;
pub mod params;
pub mod proof;
pub mod snapshot;
pub mod tree;

// Re-exports for convenience
pub use changelog::{critical_level, ChangeLogEntry};
pub use error::{TreeError, TreeResult};
pub use full::FullMerkleTree;
pub use params::{TreeParams, CANONICAL_DEPTH_BUFFER_PAIRS, MAX_BUFFER_SIZE};
pub use proof::{path_nodes, recompute_root, verify_proof, MerkleProof};
pub use snapshot::TreeSnapshot;
pub use tree::{Canopy, ConcurrentMerkleTree, RightmostPath};
