//! Compressed Assets - Merkle-Committed Asset Ledger
//!
//! Assets live as 32-byte leaves of a concurrent Merkle tree. Only the root,
//! a short changelog and the rightmost path are kept on the ledger; full
//! leaf state lives in indexers fed by ledger events.
//!
//! # Crates
//!
//! - `cnft-primitives`: Node digests, identities, asset id derivation
//! - `cnft-merkle`: Concurrent Merkle tree, proofs, snapshots
//! - `cnft-ledger`: Asset state machine, vouchers, events, persistence
//! - `cnft-client`: Indexer clients and the retrying submission driver
//!
//! # Example
//!
//! ```no_run
//! use cnft::ledger::{AssetLedger, MetadataArgs};
//! use cnft::merkle::{FullMerkleTree, TreeParams};
//! use cnft::primitives::Pubkey;
//!
//! let ledger = AssetLedger::default();
//! let tree_id = Pubkey::new_unique();
//! let alice = Pubkey::new_unique();
//! ledger.create_tree(tree_id, alice, TreeParams::new(14, 64), false).unwrap();
//!
//! let minted = ledger
//!     .mint(&tree_id, &alice, alice, None, &MetadataArgs::new("Asset", "AST", "uri"))
//!     .unwrap();
//! let leaf = minted.leaf.unwrap();
//!
//! let mut mirror = FullMerkleTree::new(14).unwrap();
//! mirror.set_leaf(minted.index, leaf.hash()).unwrap();
//! let proof = mirror.get_proof(minted.index).unwrap();
//! ledger.transfer(&tree_id, &alice, &leaf, &proof, Pubkey::new_unique()).unwrap();
//! ```

// Re-export sub-crates
pub use cnft_client as client;
pub use cnft_ledger as ledger;
pub use cnft_merkle as merkle;
pub use cnft_primitives as primitives;
