//! Compressed-asset ledger
//!
//! Assets live as leaf hashes in concurrent Merkle trees; this crate is the
//! state machine on top:
//! - **Mint** appends a leaf built from validated metadata
//! - **Transfer** / **Delegate** rewrite a leaf given a (possibly stale) proof
//! - **Redeem** empties the leaf and issues a voucher
//! - **Decompress** consumes the voucher into an uncompressed record
//! - **VerifyLeaf** checks a proof without writing
//!
//! Every write emits events through [`EventSink`] so indexers can mirror
//! the full leaf set and serve proofs back to callers.
//!
//! # Usage
//!
//! ```ignore
//! use cnft_ledger::{AssetLedger, LedgerConfig, MetadataArgs};
//! use cnft_merkle::TreeParams;
//!
//! let ledger = AssetLedger::new(LedgerConfig::strict());
//! ledger.create_tree(tree_id, creator, TreeParams::new(14, 64), false)?;
//! let commit = ledger.mint(&tree_id, &creator, owner, None, &metadata)?;
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod instruction;
pub mod leaf;
pub mod ledger;
pub mod metadata;
pub mod snapshot;
pub mod uncompressed;
pub mod voucher;

pub use config::{LedgerConfig, TreeConfig};
pub use error::{LedgerError, LedgerResult};
pub use event::{EventSink, LedgerEvent, RecordingSink};
pub use instruction::{Instruction, LeafCommit, Receipt};
pub use leaf::{LeafRecord, DOMAIN_LEAF, LEAF_VERSION};
pub use ledger::{AssetLedger, AssetState};
pub use metadata::{
    creator_hash, Collection, Creator, MetadataArgs, TokenProgramVersion, TokenStandard, UseMethod,
    Uses,
};
pub use snapshot::{LedgerSnapshot, TreeAccountSnapshot};
pub use uncompressed::{InMemoryAssetStore, UncompressedAsset, UncompressedAssetStore};
pub use voucher::{Voucher, VoucherStore};
