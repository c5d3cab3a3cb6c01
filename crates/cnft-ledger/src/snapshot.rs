//! Ledger persistence
//!
//! A snapshot captures every tree (authority record plus tree snapshot) and
//! the voucher store. Trees are locked in id order and held until the
//! voucher store has been read, so the result is a consistent cut.

use std::sync::Arc;

use cnft_merkle::TreeSnapshot;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{LedgerConfig, TreeConfig};
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{AssetLedger, TreeAccount};
use crate::uncompressed::UncompressedAssetStore;
use crate::voucher::VoucherStore;

/// Persisted tree account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeAccountSnapshot {
    pub config: TreeConfig,
    pub tree: TreeSnapshot,
}

/// Persisted ledger state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub config: LedgerConfig,
    pub trees: Vec<TreeAccountSnapshot>,
    pub vouchers: VoucherStore,
}

impl LedgerSnapshot {
    /// Serialize to JSON
    pub fn to_json(&self) -> LedgerResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| LedgerError::Snapshot(format!("JSON error: {}", e)))
    }

    /// Deserialize from JSON
    pub fn from_json(json: &str) -> LedgerResult<Self> {
        serde_json::from_str(json).map_err(|e| LedgerError::Snapshot(format!("JSON error: {}", e)))
    }

    /// Drop every tree's changelog
    ///
    /// Restored trees then only accept proofs against their current root.
    pub fn without_changelogs(mut self) -> Self {
        for account in &mut self.trees {
            account.tree.change_logs.clear();
        }
        self
    }
}

impl AssetLedger {
    /// Capture a consistent snapshot of every tree and the voucher store
    pub fn snapshot(&self) -> LedgerResult<LedgerSnapshot> {
        let ids = self.tree_ids();
        let accounts = ids
            .iter()
            .map(|id| self.account(id))
            .collect::<LedgerResult<Vec<_>>>()?;
        let guards: Vec<_> = accounts.iter().map(|account| account.lock()).collect();

        let trees = guards
            .iter()
            .map(|account| TreeAccountSnapshot {
                config: account.config.clone(),
                tree: TreeSnapshot::capture(&account.tree),
            })
            .collect();
        let vouchers = self.voucher_store().lock().clone();

        Ok(LedgerSnapshot {
            config: *self.config(),
            trees,
            vouchers,
        })
    }

    /// Rebuild a ledger from a snapshot
    ///
    /// Event sinks are not part of the snapshot and must be subscribed again.
    pub fn restore(
        snapshot: LedgerSnapshot,
        store: Arc<dyn UncompressedAssetStore>,
    ) -> LedgerResult<Self> {
        let mut accounts = Vec::with_capacity(snapshot.trees.len());
        for account in snapshot.trees {
            let tree_id = account.config.tree_id;
            let tree = account.tree.restore()?;
            if u64::from(tree.num_leaves()) != account.config.num_minted {
                return Err(LedgerError::Snapshot(format!(
                    "tree {} has {} leaves but {} mints",
                    tree_id,
                    tree.num_leaves(),
                    account.config.num_minted
                )));
            }
            if accounts
                .iter()
                .any(|existing: &TreeAccount| existing.config.tree_id == tree_id)
            {
                return Err(LedgerError::Snapshot(format!("duplicate tree {}", tree_id)));
            }
            accounts.push(TreeAccount {
                config: account.config,
                tree,
            });
        }

        info!(
            trees = accounts.len(),
            vouchers = snapshot.vouchers.len(),
            "ledger restored"
        );
        Ok(AssetLedger::from_parts(
            snapshot.config,
            accounts,
            snapshot.vouchers,
            store,
        ))
    }
}
