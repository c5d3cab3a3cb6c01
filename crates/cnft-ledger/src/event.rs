//! Events emitted on every committed mutation
//!
//! Indexers rebuild full leaf state from these; the ledger itself keeps
//! none. Per tree, events reach every sink in commit order.

use cnft_merkle::ChangeLogEntry;
use cnft_primitives::{AssetId, Node, Pubkey};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::leaf::LeafRecord;
use crate::uncompressed::UncompressedAsset;

/// Ledger event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LedgerEvent {
    /// A tree was created
    TreeCreated {
        tree_id: Pubkey,
        max_depth: u32,
        max_buffer_size: u32,
        canopy_depth: u32,
    },

    /// New root after a leaf write
    ChangeLog {
        tree_id: Pubkey,
        seq: u64,
        index: u32,
        /// New nodes on the written path, leaf first
        path: Vec<Node>,
        root: Node,
    },

    /// Leaf content after a write; `None` when the slot was emptied
    LeafUpdated {
        tree_id: Pubkey,
        asset_id: AssetId,
        nonce: u64,
        index: u32,
        seq: u64,
        leaf: Option<LeafRecord>,
    },

    /// A voucher was consumed and the asset materialized
    Decompressed {
        tree_id: Pubkey,
        nonce: u64,
        asset: UncompressedAsset,
    },
}

impl LedgerEvent {
    pub(crate) fn change_log(tree_id: Pubkey, entry: &ChangeLogEntry) -> Self {
        LedgerEvent::ChangeLog {
            tree_id,
            seq: entry.seq,
            index: entry.index,
            path: entry.path.clone(),
            root: entry.root,
        }
    }

    /// Tree this event belongs to
    pub fn tree_id(&self) -> &Pubkey {
        match self {
            LedgerEvent::TreeCreated { tree_id, .. }
            | LedgerEvent::ChangeLog { tree_id, .. }
            | LedgerEvent::LeafUpdated { tree_id, .. }
            | LedgerEvent::Decompressed { tree_id, .. } => tree_id,
        }
    }
}

/// Receiver of ledger events
///
/// Called synchronously while the tree lock is held; implementations must
/// not call back into the ledger.
pub trait EventSink: Send + Sync {
    fn on_event(&self, event: &LedgerEvent);
}

/// Sink that keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<LedgerEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all recorded events
    pub fn events(&self) -> Vec<LedgerEvent> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for RecordingSink {
    fn on_event(&self, event: &LedgerEvent) {
        self.events.lock().push(event.clone());
    }
}
