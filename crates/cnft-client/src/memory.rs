//! In-process indexer fed directly by ledger events

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use cnft_ledger::{EventSink, LedgerEvent};
use cnft_merkle::{FullMerkleTree, TreeResult};
use cnft_primitives::{AssetId, Node, Pubkey};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{ClientError, Result};
use crate::indexer::{AssetProof, IndexedLeaf, IndexerClient};

#[derive(Default)]
struct IndexerState {
    trees: HashMap<Pubkey, FullMerkleTree>,
    assets: HashMap<AssetId, IndexedLeaf>,
    paused: bool,
    backlog: VecDeque<LedgerEvent>,
}

impl IndexerState {
    fn apply(&mut self, event: &LedgerEvent) {
        match event {
            LedgerEvent::TreeCreated {
                tree_id, max_depth, ..
            } => match FullMerkleTree::new(*max_depth) {
                Ok(tree) => {
                    self.trees.entry(*tree_id).or_insert(tree);
                }
                Err(err) => warn!(tree = %tree_id, "cannot mirror tree: {}", err),
            },
            LedgerEvent::ChangeLog {
                tree_id,
                seq,
                index,
                path,
                root,
            } => {
                let Some(tree) = self.trees.get_mut(tree_id) else {
                    debug!(tree = %tree_id, "change for untracked tree");
                    return;
                };
                let Some(leaf) = path.first() else {
                    warn!(tree = %tree_id, seq, "change log without path");
                    return;
                };
                if let Err(err) = tree.set_leaf(*index, *leaf) {
                    warn!(tree = %tree_id, seq, "cannot apply change: {}", err);
                } else if tree.root() != *root {
                    warn!(tree = %tree_id, seq, "mirror root diverged from ledger");
                }
            }
            LedgerEvent::LeafUpdated {
                tree_id,
                asset_id,
                index,
                seq,
                leaf,
                ..
            } => match leaf {
                Some(record) => {
                    self.assets.insert(
                        *asset_id,
                        IndexedLeaf {
                            tree_id: *tree_id,
                            leaf_index: *index,
                            leaf: record.clone(),
                            seq: *seq,
                            compressed: true,
                        },
                    );
                }
                None => {
                    if let Some(indexed) = self.assets.get_mut(asset_id) {
                        indexed.compressed = false;
                        indexed.seq = *seq;
                    }
                }
            },
            LedgerEvent::Decompressed { asset, .. } => {
                debug!(mint = %asset.mint, "asset decompressed");
            }
        }
    }
}

/// Indexer that mirrors every leaf in memory
///
/// Subscribe it to an [`cnft_ledger::AssetLedger`]. While paused, events
/// queue up and reads serve the state as of the pause, which models an
/// indexer lagging behind the ledger.
#[derive(Default)]
pub struct InMemoryIndexer {
    state: Mutex<IndexerState>,
}

impl InMemoryIndexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start mirroring a tree created before this indexer subscribed
    pub fn track_tree(&self, tree_id: Pubkey, max_depth: u32) -> TreeResult<()> {
        let tree = FullMerkleTree::new(max_depth)?;
        self.state.lock().trees.entry(tree_id).or_insert(tree);
        Ok(())
    }

    /// Stop applying events
    pub fn pause(&self) {
        self.state.lock().paused = true;
    }

    /// Apply queued events and continue live
    pub fn resume(&self) {
        let mut state = self.state.lock();
        state.paused = false;
        while let Some(event) = state.backlog.pop_front() {
            state.apply(&event);
        }
    }

    /// Number of queued events
    pub fn backlog_len(&self) -> usize {
        self.state.lock().backlog.len()
    }

    /// Mirrored root of a tree
    pub fn root(&self, tree_id: &Pubkey) -> Option<Node> {
        self.state.lock().trees.get(tree_id).map(FullMerkleTree::root)
    }

    /// Compressed assets held by `owner`, ordered by tree then index
    pub fn assets_by_owner(&self, owner: &Pubkey) -> Vec<IndexedLeaf> {
        let state = self.state.lock();
        let mut assets: Vec<IndexedLeaf> = state
            .assets
            .values()
            .filter(|indexed| indexed.compressed && indexed.leaf.owner == *owner)
            .cloned()
            .collect();
        assets.sort_by_key(|indexed| (indexed.tree_id, indexed.leaf_index));
        assets
    }
}

impl EventSink for InMemoryIndexer {
    fn on_event(&self, event: &LedgerEvent) {
        let mut state = self.state.lock();
        if state.paused {
            state.backlog.push_back(event.clone());
        } else {
            state.apply(event);
        }
    }
}

#[async_trait]
impl IndexerClient for InMemoryIndexer {
    async fn get_leaf(&self, asset_id: &AssetId) -> Result<IndexedLeaf> {
        self.state
            .lock()
            .assets
            .get(asset_id)
            .cloned()
            .ok_or(ClientError::AssetNotFound(*asset_id))
    }

    async fn get_proof(&self, asset_id: &AssetId) -> Result<AssetProof> {
        let state = self.state.lock();
        let indexed = state
            .assets
            .get(asset_id)
            .ok_or(ClientError::AssetNotFound(*asset_id))?;
        let tree = state.trees.get(&indexed.tree_id).ok_or_else(|| {
            ClientError::InvalidResponse(format!("tree {} not mirrored", indexed.tree_id))
        })?;
        let proof = tree
            .get_proof(indexed.leaf_index)
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;

        Ok(AssetProof {
            tree_id: indexed.tree_id,
            root: proof.root,
            leaf_index: indexed.leaf_index,
            leaf: tree.leaf(indexed.leaf_index),
            proof: proof.siblings,
        })
    }
}
