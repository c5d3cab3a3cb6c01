//! Compressed asset client
//!
//! Reads leaves and proofs from an indexer (a DAS JSON-RPC endpoint or the
//! in-process [`InMemoryIndexer`]) and drives ledger operations with them,
//! refetching when the ledger rejects a proof as too stale.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use cnft_client::{AssetClient, ClientConfig, InMemoryIndexer};
//! use cnft_ledger::{AssetLedger, MetadataArgs};
//! use cnft_merkle::TreeParams;
//! use cnft_primitives::Pubkey;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ledger = Arc::new(AssetLedger::default());
//!     let indexer = Arc::new(InMemoryIndexer::new());
//!     ledger.subscribe(indexer.clone());
//!
//!     let tree_id = Pubkey::new_unique();
//!     let alice = Pubkey::new_unique();
//!     ledger.create_tree(tree_id, alice, TreeParams::new(14, 64), false)?;
//!     let minted = ledger.mint(&tree_id, &alice, alice, None, &MetadataArgs::new("A", "A", "uri"))?;
//!
//!     let client = AssetClient::new(ledger.clone(), indexer, ClientConfig::local());
//!     client.transfer(&minted.asset_id, &alice, Pubkey::new_unique()).await?;
//!     Ok(())
//! }
//! ```

mod config;
mod das;
mod driver;
mod error;
mod indexer;
mod memory;
mod retry;
mod types;

pub use config::ClientConfig;
pub use das::DasClient;
pub use driver::AssetClient;
pub use error::{ClientError, Result};
pub use indexer::{AssetProof, IndexedLeaf, IndexerClient};
pub use memory::InMemoryIndexer;
pub use retry::{with_timeout, RetryPolicy};
pub use types::*;
