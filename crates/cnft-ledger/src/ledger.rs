//! Compressed-asset state machine
//!
//! Each asset moves `Uncreated -> Compressed -> Redeemed -> Decompressed`.
//! Authorization and state rules are checked first; the tree then
//! reconciles the caller's proof and commits. Every tree sits behind its
//! own mutex, so writers to different trees never contend and writers to
//! the same tree commit one at a time.
//!
//! Lock order: tree map, tree, voucher store, sinks.

use std::collections::HashMap;
use std::sync::Arc;

use cnft_merkle::{ConcurrentMerkleTree, MerkleProof, TreeParams};
use cnft_primitives::{AssetId, Node, Pubkey, EMPTY_LEAF};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{LedgerConfig, TreeConfig};
use crate::error::{LedgerError, LedgerResult};
use crate::event::{EventSink, LedgerEvent};
use crate::instruction::{Instruction, LeafCommit, Receipt};
use crate::leaf::LeafRecord;
use crate::metadata::MetadataArgs;
use crate::uncompressed::{InMemoryAssetStore, UncompressedAsset, UncompressedAssetStore};
use crate::voucher::{Voucher, VoucherStore};

/// Lifecycle state of an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetState {
    Uncreated,
    Compressed,
    Redeemed,
    Decompressed,
}

/// A tree and its authority record
#[derive(Debug)]
pub(crate) struct TreeAccount {
    pub(crate) config: TreeConfig,
    pub(crate) tree: ConcurrentMerkleTree,
}

/// The ledger: trees, vouchers and event fan-out
pub struct AssetLedger {
    config: LedgerConfig,
    trees: RwLock<HashMap<Pubkey, Arc<Mutex<TreeAccount>>>>,
    vouchers: Mutex<VoucherStore>,
    store: Arc<dyn UncompressedAssetStore>,
    sinks: RwLock<Vec<Arc<dyn EventSink>>>,
}

impl Default for AssetLedger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

impl AssetLedger {
    /// Create a ledger with an in-memory uncompressed store
    pub fn new(config: LedgerConfig) -> Self {
        Self::with_store(config, Arc::new(InMemoryAssetStore::new()))
    }

    /// Create a ledger that decompresses into `store`
    pub fn with_store(config: LedgerConfig, store: Arc<dyn UncompressedAssetStore>) -> Self {
        Self {
            config,
            trees: RwLock::new(HashMap::new()),
            vouchers: Mutex::new(VoucherStore::new()),
            store,
            sinks: RwLock::new(Vec::new()),
        }
    }

    pub(crate) fn from_parts(
        config: LedgerConfig,
        accounts: Vec<TreeAccount>,
        vouchers: VoucherStore,
        store: Arc<dyn UncompressedAssetStore>,
    ) -> Self {
        let trees = accounts
            .into_iter()
            .map(|account| (account.config.tree_id, Arc::new(Mutex::new(account))))
            .collect();
        Self {
            config,
            trees: RwLock::new(trees),
            vouchers: Mutex::new(vouchers),
            store,
            sinks: RwLock::new(Vec::new()),
        }
    }

    /// Ledger-wide settings
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Register an event sink; it receives every later event
    pub fn subscribe(&self, sink: Arc<dyn EventSink>) {
        self.sinks.write().push(sink);
    }

    /// Decode and run one JSON-encoded instruction
    pub fn execute_json(&self, json: &str) -> LedgerResult<Receipt> {
        self.execute(Instruction::from_json(json)?)
    }

    /// Run one instruction
    pub fn execute(&self, instruction: Instruction) -> LedgerResult<Receipt> {
        debug!(op = instruction.name(), tree = %instruction.tree_id(), "executing instruction");
        match instruction {
            Instruction::CreateTree {
                tree_id,
                creator,
                params,
                is_public,
            } => {
                let root = self.create_tree(tree_id, creator, params, is_public)?;
                Ok(Receipt::TreeCreated { tree_id, root })
            }
            Instruction::SetTreeDelegate {
                tree_id,
                caller,
                new_delegate,
            } => {
                self.set_tree_delegate(&tree_id, &caller, new_delegate)?;
                Ok(Receipt::TreeDelegateSet {
                    tree_id,
                    delegate: new_delegate,
                })
            }
            Instruction::Mint {
                tree_id,
                caller,
                owner,
                delegate,
                metadata,
            } => self
                .mint(&tree_id, &caller, owner, delegate, &metadata)
                .map(Receipt::Leaf),
            Instruction::Transfer {
                tree_id,
                caller,
                leaf,
                proof,
                new_owner,
            } => self
                .transfer(&tree_id, &caller, &leaf, &proof, new_owner)
                .map(Receipt::Leaf),
            Instruction::Delegate {
                tree_id,
                caller,
                leaf,
                proof,
                new_delegate,
            } => self
                .delegate(&tree_id, &caller, &leaf, &proof, new_delegate)
                .map(Receipt::Leaf),
            Instruction::Redeem {
                tree_id,
                caller,
                leaf,
                proof,
            } => {
                let (commit, voucher) = self.redeem(&tree_id, &caller, &leaf, &proof)?;
                Ok(Receipt::Redeemed { commit, voucher })
            }
            Instruction::Decompress {
                tree_id,
                caller,
                nonce,
                metadata,
            } => self
                .decompress(&tree_id, &caller, nonce, &metadata)
                .map(Receipt::Decompressed),
            Instruction::VerifyLeaf {
                tree_id,
                leaf,
                proof,
            } => {
                self.verify_leaf(&tree_id, &leaf, &proof)?;
                Ok(Receipt::Verified {
                    tree_id,
                    index: proof.leaf_index,
                })
            }
        }
    }

    /// Register an empty tree and return its root
    pub fn create_tree(
        &self,
        tree_id: Pubkey,
        creator: Pubkey,
        params: TreeParams,
        is_public: bool,
    ) -> LedgerResult<Node> {
        self.config.validate_params(&params)?;
        let tree = ConcurrentMerkleTree::new(params)?;
        let root = tree.root();

        let mut trees = self.trees.write();
        if trees.contains_key(&tree_id) {
            return Err(LedgerError::TreeAlreadyExists(tree_id));
        }
        trees.insert(
            tree_id,
            Arc::new(Mutex::new(TreeAccount {
                config: TreeConfig::new(tree_id, creator, is_public),
                tree,
            })),
        );
        self.emit(&LedgerEvent::TreeCreated {
            tree_id,
            max_depth: params.max_depth,
            max_buffer_size: params.max_buffer_size,
            canopy_depth: params.canopy_depth,
        });

        info!(
            tree = %tree_id,
            max_depth = params.max_depth,
            max_buffer_size = params.max_buffer_size,
            canopy_depth = params.canopy_depth,
            "tree created"
        );
        Ok(root)
    }

    /// Replace the tree delegate; only the creator may
    pub fn set_tree_delegate(
        &self,
        tree_id: &Pubkey,
        caller: &Pubkey,
        new_delegate: Pubkey,
    ) -> LedgerResult<()> {
        let account = self.account(tree_id)?;
        let mut account = account.lock();
        if account.config.tree_creator != *caller {
            return Err(LedgerError::Unauthorized(format!(
                "{} is not the creator of tree {}",
                caller, tree_id
            )));
        }
        account.config.tree_delegate = new_delegate;
        info!(tree = %tree_id, delegate = %new_delegate, "tree delegate set");
        Ok(())
    }

    /// Append a new asset at the next free index
    pub fn mint(
        &self,
        tree_id: &Pubkey,
        caller: &Pubkey,
        owner: Pubkey,
        delegate: Option<Pubkey>,
        metadata: &MetadataArgs,
    ) -> LedgerResult<LeafCommit> {
        let account = self.account(tree_id)?;
        let mut account = account.lock();
        if !account.config.can_mint(caller) {
            return Err(LedgerError::Unauthorized(format!(
                "{} may not mint into private tree {}",
                caller, tree_id
            )));
        }
        metadata.validate(caller)?;
        if account.tree.is_full() {
            return Err(LedgerError::TreeFull {
                capacity: account.tree.capacity(),
            });
        }

        let nonce = account.config.num_minted;
        let leaf = LeafRecord::new(
            tree_id,
            nonce,
            owner,
            delegate,
            metadata.data_hash()?,
            metadata.creator_hash(),
        );
        let entry = account.tree.append(leaf.hash())?;
        account.config.num_minted += 1;

        let commit = LeafCommit {
            tree_id: *tree_id,
            asset_id: leaf.asset_id,
            nonce,
            index: entry.index,
            seq: entry.seq,
            root: entry.root,
            leaf: Some(leaf),
        };
        self.emit(&LedgerEvent::change_log(*tree_id, &entry));
        self.emit_leaf(&commit);

        info!(
            tree = %tree_id,
            asset = %commit.asset_id,
            index = entry.index,
            seq = entry.seq,
            "minted"
        );
        Ok(commit)
    }

    /// Give the asset to `new_owner`; owner or delegate may call
    pub fn transfer(
        &self,
        tree_id: &Pubkey,
        caller: &Pubkey,
        leaf: &LeafRecord,
        proof: &MerkleProof,
        new_owner: Pubkey,
    ) -> LedgerResult<LeafCommit> {
        if !leaf.can_transfer(caller) {
            return Err(LedgerError::NotOwner {
                asset_id: leaf.asset_id,
                caller: *caller,
            });
        }
        check_asset_id(tree_id, leaf)?;

        let account = self.account(tree_id)?;
        let mut account = account.lock();
        let commit = self.replace_leaf(
            &mut account,
            proof,
            leaf,
            Some(leaf.transferred_to(new_owner)),
        )?;
        info!(
            tree = %tree_id,
            asset = %leaf.asset_id,
            to = %new_owner,
            seq = commit.seq,
            "transferred"
        );
        Ok(commit)
    }

    /// Set or clear the delegate; owner only
    pub fn delegate(
        &self,
        tree_id: &Pubkey,
        caller: &Pubkey,
        leaf: &LeafRecord,
        proof: &MerkleProof,
        new_delegate: Option<Pubkey>,
    ) -> LedgerResult<LeafCommit> {
        check_owner(leaf, caller)?;
        check_asset_id(tree_id, leaf)?;

        let account = self.account(tree_id)?;
        let mut account = account.lock();
        let commit = self.replace_leaf(
            &mut account,
            proof,
            leaf,
            Some(leaf.delegated_to(new_delegate)),
        )?;
        info!(tree = %tree_id, asset = %leaf.asset_id, seq = commit.seq, "delegate updated");
        Ok(commit)
    }

    /// Empty the leaf and issue a voucher; owner only
    pub fn redeem(
        &self,
        tree_id: &Pubkey,
        caller: &Pubkey,
        leaf: &LeafRecord,
        proof: &MerkleProof,
    ) -> LedgerResult<(LeafCommit, Voucher)> {
        check_owner(leaf, caller)?;
        check_asset_id(tree_id, leaf)?;

        let account = self.account(tree_id)?;
        let mut account = account.lock();
        let mut vouchers = self.vouchers.lock();
        if vouchers.is_redeemed(tree_id, leaf.nonce) {
            return Err(LedgerError::AlreadyRedeemed {
                tree_id: *tree_id,
                nonce: leaf.nonce,
            });
        }

        let commit = self.replace_leaf(&mut account, proof, leaf, None)?;
        let voucher = Voucher {
            tree_id: *tree_id,
            leaf_nonce: leaf.nonce,
            index: commit.index,
            leaf: leaf.clone(),
        };
        vouchers.insert(voucher.clone())?;

        info!(tree = %tree_id, asset = %leaf.asset_id, seq = commit.seq, "redeemed");
        Ok((commit, voucher))
    }

    /// Consume a voucher and materialize the asset in the uncompressed store
    pub fn decompress(
        &self,
        tree_id: &Pubkey,
        caller: &Pubkey,
        nonce: u64,
        metadata: &MetadataArgs,
    ) -> LedgerResult<UncompressedAsset> {
        // The tree lock orders the event with the tree's other writes
        let account = self.account(tree_id)?;
        let _account = account.lock();
        let mut vouchers = self.vouchers.lock();

        let voucher = vouchers
            .get(tree_id, nonce)
            .ok_or(LedgerError::VoucherNotFound {
                tree_id: *tree_id,
                nonce,
            })?;
        if voucher.leaf.owner != *caller {
            return Err(LedgerError::OwnerMismatch {
                expected: voucher.leaf.owner,
                actual: *caller,
            });
        }
        if metadata.data_hash()? != voucher.leaf.data_hash
            || metadata.creator_hash() != voucher.leaf.creator_hash
        {
            return Err(LedgerError::DataHashMismatch(voucher.leaf.asset_id));
        }

        let asset = UncompressedAsset {
            mint: voucher.leaf.asset_id,
            tree_id: *tree_id,
            nonce,
            owner: voucher.leaf.owner,
            supply: 1,
            metadata: metadata.clone(),
        };
        self.store.materialize(asset.clone())?;
        vouchers.remove(tree_id, nonce)?;

        self.emit(&LedgerEvent::Decompressed {
            tree_id: *tree_id,
            nonce,
            asset: asset.clone(),
        });
        info!(tree = %tree_id, mint = %asset.mint, owner = %asset.owner, "decompressed");
        Ok(asset)
    }

    /// Check that `leaf` is at `proof.leaf_index`; no state change
    pub fn verify_leaf(
        &self,
        tree_id: &Pubkey,
        leaf: &Node,
        proof: &MerkleProof,
    ) -> LedgerResult<()> {
        let account = self.account(tree_id)?;
        let account = account.lock();
        account.tree.prove_leaf(proof, leaf)?;
        Ok(())
    }

    /// Lifecycle state of `(tree_id, nonce)`
    pub fn asset_state(&self, tree_id: &Pubkey, nonce: u64) -> LedgerResult<AssetState> {
        let account = self.account(tree_id)?;
        let account = account.lock();
        if nonce >= account.config.num_minted {
            return Ok(AssetState::Uncreated);
        }
        let vouchers = self.vouchers.lock();
        Ok(if vouchers.get(tree_id, nonce).is_some() {
            AssetState::Redeemed
        } else if vouchers.is_redeemed(tree_id, nonce) {
            AssetState::Decompressed
        } else {
            AssetState::Compressed
        })
    }

    /// Current root of a tree
    pub fn root(&self, tree_id: &Pubkey) -> LedgerResult<Node> {
        Ok(self.account(tree_id)?.lock().tree.root())
    }

    /// Sequence number of a tree's latest change
    pub fn sequence_number(&self, tree_id: &Pubkey) -> LedgerResult<u64> {
        Ok(self.account(tree_id)?.lock().tree.sequence_number())
    }

    /// Authority record of a tree
    pub fn tree_config(&self, tree_id: &Pubkey) -> LedgerResult<TreeConfig> {
        Ok(self.account(tree_id)?.lock().config.clone())
    }

    /// Sizing of a tree
    pub fn tree_params(&self, tree_id: &Pubkey) -> LedgerResult<TreeParams> {
        Ok(*self.account(tree_id)?.lock().tree.params())
    }

    /// Live voucher for `(tree_id, nonce)`
    pub fn voucher(&self, tree_id: &Pubkey, nonce: u64) -> Option<Voucher> {
        self.vouchers.lock().get(tree_id, nonce).cloned()
    }

    /// Ids of every registered tree
    pub fn tree_ids(&self) -> Vec<Pubkey> {
        let mut ids: Vec<Pubkey> = self.trees.read().keys().copied().collect();
        ids.sort();
        ids
    }

    pub(crate) fn account(&self, tree_id: &Pubkey) -> LedgerResult<Arc<Mutex<TreeAccount>>> {
        self.trees
            .read()
            .get(tree_id)
            .cloned()
            .ok_or(LedgerError::TreeNotFound(*tree_id))
    }

    pub(crate) fn voucher_store(&self) -> &Mutex<VoucherStore> {
        &self.vouchers
    }

    fn replace_leaf(
        &self,
        account: &mut TreeAccount,
        proof: &MerkleProof,
        old: &LeafRecord,
        new: Option<LeafRecord>,
    ) -> LedgerResult<LeafCommit> {
        let tree_id = account.config.tree_id;
        let new_hash = new.as_ref().map(LeafRecord::hash).unwrap_or(EMPTY_LEAF);
        let entry = account
            .tree
            .apply_mutation(proof, &old.hash(), new_hash)
            .map_err(|err| {
                if err.is_retryable() {
                    warn!(
                        tree = %tree_id,
                        index = proof.leaf_index,
                        "stale proof rejected: {}",
                        err
                    );
                }
                LedgerError::from(err)
            })?;

        let commit = LeafCommit {
            tree_id,
            asset_id: old.asset_id,
            nonce: old.nonce,
            index: entry.index,
            seq: entry.seq,
            root: entry.root,
            leaf: new,
        };
        self.emit(&LedgerEvent::change_log(tree_id, &entry));
        self.emit_leaf(&commit);
        Ok(commit)
    }

    fn emit_leaf(&self, commit: &LeafCommit) {
        self.emit(&LedgerEvent::LeafUpdated {
            tree_id: commit.tree_id,
            asset_id: commit.asset_id,
            nonce: commit.nonce,
            index: commit.index,
            seq: commit.seq,
            leaf: commit.leaf.clone(),
        });
    }

    fn emit(&self, event: &LedgerEvent) {
        for sink in self.sinks.read().iter() {
            sink.on_event(event);
        }
    }
}

fn check_owner(leaf: &LeafRecord, caller: &Pubkey) -> LedgerResult<()> {
    if leaf.owner != *caller {
        return Err(LedgerError::NotOwner {
            asset_id: leaf.asset_id,
            caller: *caller,
        });
    }
    Ok(())
}

fn check_asset_id(tree_id: &Pubkey, leaf: &LeafRecord) -> LedgerResult<()> {
    if leaf.asset_id != AssetId::derive(tree_id, leaf.nonce) {
        return Err(LedgerError::ProofInvalid(format!(
            "asset {} is not nonce {} of tree {}",
            leaf.asset_id, leaf.nonce, tree_id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::RecordingSink;
    use cnft_merkle::FullMerkleTree;

    struct Fixture {
        ledger: AssetLedger,
        tree_id: Pubkey,
        creator: Pubkey,
        mirror: FullMerkleTree,
    }

    impl Fixture {
        fn new(depth: u32, buffer: u32) -> Self {
            let ledger = AssetLedger::default();
            let tree_id = Pubkey::from_seed("tree");
            let creator = Pubkey::from_seed("creator");
            ledger
                .create_tree(tree_id, creator, TreeParams::new(depth, buffer), false)
                .unwrap();
            Self {
                ledger,
                tree_id,
                creator,
                mirror: FullMerkleTree::new(depth).unwrap(),
            }
        }

        fn mint(&mut self, owner: &str, name: &str) -> LeafRecord {
            let commit = self
                .ledger
                .mint(
                    &self.tree_id,
                    &self.creator,
                    Pubkey::from_seed(owner),
                    None,
                    &MetadataArgs::new(name, "AST", "uri"),
                )
                .unwrap();
            self.track(&commit);
            commit.leaf.unwrap()
        }

        fn track(&mut self, commit: &LeafCommit) {
            let hash = commit.leaf.as_ref().map(LeafRecord::hash).unwrap_or(EMPTY_LEAF);
            self.mirror.set_leaf(commit.index, hash).unwrap();
        }

        fn proof(&self, index: u32) -> MerkleProof {
            self.mirror.get_proof(index).unwrap()
        }
    }

    #[test]
    fn test_mint_assigns_sequential_nonces() {
        let mut fx = Fixture::new(3, 8);
        let a = fx.mint("alice", "A");
        let b = fx.mint("alice", "B");
        assert_eq!((a.nonce, b.nonce), (0, 1));
        assert_eq!(a.asset_id, AssetId::derive(&fx.tree_id, 0));
        assert_eq!(fx.ledger.root(&fx.tree_id).unwrap(), fx.mirror.root());
        assert_eq!(fx.ledger.tree_config(&fx.tree_id).unwrap().num_minted, 2);
    }

    #[test]
    fn test_private_tree_rejects_stranger() {
        let fx = Fixture::new(3, 8);
        let stranger = Pubkey::from_seed("stranger");
        let err = fx
            .ledger
            .mint(&fx.tree_id, &stranger, stranger, None, &MetadataArgs::new("A", "A", "u"))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized(_)));

        fx.ledger
            .set_tree_delegate(&fx.tree_id, &fx.creator, stranger)
            .unwrap();
        assert!(fx
            .ledger
            .mint(&fx.tree_id, &stranger, stranger, None, &MetadataArgs::new("A", "A", "u"))
            .is_ok());
    }

    #[test]
    fn test_set_tree_delegate_requires_creator() {
        let fx = Fixture::new(3, 8);
        let stranger = Pubkey::from_seed("stranger");
        assert!(matches!(
            fx.ledger.set_tree_delegate(&fx.tree_id, &stranger, stranger),
            Err(LedgerError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_invalid_metadata_leaves_tree_untouched() {
        let fx = Fixture::new(3, 8);
        let before = fx.ledger.root(&fx.tree_id).unwrap();
        let err = fx
            .ledger
            .mint(
                &fx.tree_id,
                &fx.creator,
                fx.creator,
                None,
                &MetadataArgs::new("x".repeat(40), "A", "u"),
            )
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidMetadata(_)));
        assert_eq!(fx.ledger.root(&fx.tree_id).unwrap(), before);
        assert_eq!(fx.ledger.tree_config(&fx.tree_id).unwrap().num_minted, 0);
    }

    #[test]
    fn test_json_mint_with_unknown_metadata_field() {
        let fx = Fixture::new(3, 8);
        let before = fx.ledger.root(&fx.tree_id).unwrap();
        let mut value = serde_json::to_value(Instruction::Mint {
            tree_id: fx.tree_id,
            caller: fx.creator,
            owner: fx.creator,
            delegate: None,
            metadata: MetadataArgs::new("A", "AST", "uri"),
        })
        .unwrap();
        value["metadata"]["backdoor"] = serde_json::Value::Bool(true);

        let err = fx.ledger.execute_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidMetadata(_)));
        assert_eq!(fx.ledger.root(&fx.tree_id).unwrap(), before);
        assert_eq!(fx.ledger.tree_config(&fx.tree_id).unwrap().num_minted, 0);
    }

    #[test]
    fn test_tree_full() {
        let mut fx = Fixture::new(1, 8);
        fx.mint("alice", "A");
        fx.mint("alice", "B");
        let err = fx
            .ledger
            .mint(&fx.tree_id, &fx.creator, fx.creator, None, &MetadataArgs::new("C", "C", "u"))
            .unwrap_err();
        assert_eq!(err, LedgerError::TreeFull { capacity: 2 });
    }

    #[test]
    fn test_transfer_by_owner_and_delegate() {
        let mut fx = Fixture::new(3, 8);
        let alice = Pubkey::from_seed("alice");
        let bob = Pubkey::from_seed("bob");
        let dave = Pubkey::from_seed("dave");
        let leaf = fx.mint("alice", "A");

        let commit = fx
            .ledger
            .delegate(&fx.tree_id, &alice, &leaf, &fx.proof(0), Some(dave))
            .unwrap();
        fx.track(&commit);
        let leaf = commit.leaf.unwrap();

        let commit = fx
            .ledger
            .transfer(&fx.tree_id, &dave, &leaf, &fx.proof(0), bob)
            .unwrap();
        fx.track(&commit);
        let leaf = commit.leaf.unwrap();
        assert_eq!(leaf.owner, bob);
        assert_eq!(leaf.delegate, None);
        assert_eq!(fx.ledger.root(&fx.tree_id).unwrap(), fx.mirror.root());

        // Delegate lost its rights with the transfer
        let err = fx
            .ledger
            .transfer(&fx.tree_id, &dave, &leaf, &fx.proof(0), dave)
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotOwner { .. }));
    }

    #[test]
    fn test_delegate_cannot_delegate_or_redeem() {
        let mut fx = Fixture::new(3, 8);
        let alice = Pubkey::from_seed("alice");
        let dave = Pubkey::from_seed("dave");
        let leaf = fx.mint("alice", "A");
        let commit = fx
            .ledger
            .delegate(&fx.tree_id, &alice, &leaf, &fx.proof(0), Some(dave))
            .unwrap();
        fx.track(&commit);
        let leaf = commit.leaf.unwrap();

        assert!(matches!(
            fx.ledger.delegate(&fx.tree_id, &dave, &leaf, &fx.proof(0), None),
            Err(LedgerError::NotOwner { .. })
        ));
        assert!(matches!(
            fx.ledger.redeem(&fx.tree_id, &dave, &leaf, &fx.proof(0)),
            Err(LedgerError::NotOwner { .. })
        ));
    }

    #[test]
    fn test_forged_leaf_is_proof_invalid() {
        let mut fx = Fixture::new(3, 8);
        let leaf = fx.mint("alice", "A");
        let mallory = Pubkey::from_seed("mallory");
        let forged = LeafRecord {
            owner: mallory,
            ..leaf
        };
        let err = fx
            .ledger
            .transfer(&fx.tree_id, &mallory, &forged, &fx.proof(0), mallory)
            .unwrap_err();
        assert!(matches!(err, LedgerError::ProofInvalid(_)));
    }

    #[test]
    fn test_foreign_asset_id_rejected() {
        let mut fx = Fixture::new(3, 8);
        let leaf = fx.mint("alice", "A");
        let alice = Pubkey::from_seed("alice");
        let moved = LeafRecord {
            asset_id: AssetId::derive(&Pubkey::from_seed("other-tree"), 0),
            ..leaf
        };
        assert!(matches!(
            fx.ledger.transfer(&fx.tree_id, &alice, &moved, &fx.proof(0), alice),
            Err(LedgerError::ProofInvalid(_))
        ));
    }

    #[test]
    fn test_redeem_then_decompress() {
        let mut fx = Fixture::new(3, 8);
        let alice = Pubkey::from_seed("alice");
        let metadata = MetadataArgs::new("A", "AST", "uri");
        let leaf = fx.mint("alice", "A");

        let (commit, voucher) = fx
            .ledger
            .redeem(&fx.tree_id, &alice, &leaf, &fx.proof(0))
            .unwrap();
        fx.track(&commit);
        assert_eq!(commit.leaf, None);
        assert_eq!(voucher.leaf, leaf);
        assert_eq!(fx.mirror.leaf(0), EMPTY_LEAF);
        assert_eq!(fx.ledger.root(&fx.tree_id).unwrap(), fx.mirror.root());
        assert_eq!(fx.ledger.asset_state(&fx.tree_id, 0).unwrap(), AssetState::Redeemed);

        let asset = fx
            .ledger
            .decompress(&fx.tree_id, &alice, 0, &metadata)
            .unwrap();
        assert_eq!(asset.owner, alice);
        assert_eq!(asset.mint, leaf.asset_id);
        assert_eq!(fx.ledger.asset_state(&fx.tree_id, 0).unwrap(), AssetState::Decompressed);
        assert!(fx.ledger.voucher(&fx.tree_id, 0).is_none());
    }

    #[test]
    fn test_decompress_checks() {
        let mut fx = Fixture::new(3, 8);
        let alice = Pubkey::from_seed("alice");
        let leaf = fx.mint("alice", "A");

        assert!(matches!(
            fx.ledger.decompress(&fx.tree_id, &alice, 0, &MetadataArgs::new("A", "AST", "uri")),
            Err(LedgerError::VoucherNotFound { nonce: 0, .. })
        ));

        let (commit, _) = fx
            .ledger
            .redeem(&fx.tree_id, &alice, &leaf, &fx.proof(0))
            .unwrap();
        fx.track(&commit);

        let bob = Pubkey::from_seed("bob");
        assert!(matches!(
            fx.ledger.decompress(&fx.tree_id, &bob, 0, &MetadataArgs::new("A", "AST", "uri")),
            Err(LedgerError::OwnerMismatch { .. })
        ));
        assert!(matches!(
            fx.ledger.decompress(&fx.tree_id, &alice, 0, &MetadataArgs::new("B", "AST", "uri")),
            Err(LedgerError::DataHashMismatch(_))
        ));
        // Failed attempts keep the voucher
        assert!(fx.ledger.voucher(&fx.tree_id, 0).is_some());
    }

    #[test]
    fn test_second_redeem_rejected() {
        let mut fx = Fixture::new(3, 8);
        let alice = Pubkey::from_seed("alice");
        let leaf = fx.mint("alice", "A");
        let proof = fx.proof(0);
        let (commit, _) = fx.ledger.redeem(&fx.tree_id, &alice, &leaf, &proof).unwrap();
        fx.track(&commit);

        assert!(matches!(
            fx.ledger.redeem(&fx.tree_id, &alice, &leaf, &proof),
            Err(LedgerError::AlreadyRedeemed { nonce: 0, .. })
        ));
    }

    #[test]
    fn test_events_in_commit_order() {
        let mut fx = Fixture::new(3, 8);
        let sink = Arc::new(RecordingSink::new());
        fx.ledger.subscribe(sink.clone());
        let alice = Pubkey::from_seed("alice");

        let leaf = fx.mint("alice", "A");
        let commit = fx
            .ledger
            .transfer(&fx.tree_id, &alice, &leaf, &fx.proof(0), Pubkey::from_seed("bob"))
            .unwrap();

        let seqs: Vec<u64> = sink
            .events()
            .iter()
            .filter_map(|event| match event {
                LedgerEvent::ChangeLog { seq, .. } => Some(*seq),
                _ => None,
            })
            .collect();
        assert_eq!(seqs, vec![1, 2]);
        assert!(matches!(
            sink.events().last(),
            Some(LedgerEvent::LeafUpdated { seq, .. }) if *seq == commit.seq
        ));
    }

    #[test]
    fn test_execute_dispatches() {
        let ledger = AssetLedger::default();
        let tree_id = Pubkey::from_seed("tree");
        let creator = Pubkey::from_seed("creator");
        let receipt = ledger
            .execute(Instruction::CreateTree {
                tree_id,
                creator,
                params: TreeParams::new(3, 8),
                is_public: true,
            })
            .unwrap();
        assert!(matches!(receipt, Receipt::TreeCreated { .. }));

        assert!(matches!(
            ledger.execute(Instruction::CreateTree {
                tree_id,
                creator,
                params: TreeParams::new(3, 8),
                is_public: true,
            }),
            Err(LedgerError::TreeAlreadyExists(_))
        ));

        let receipt = ledger
            .execute(Instruction::Mint {
                tree_id,
                caller: Pubkey::from_seed("anyone"),
                owner: creator,
                delegate: None,
                metadata: MetadataArgs::new("A", "AST", "uri"),
            })
            .unwrap();
        let commit = receipt.commit().unwrap().clone();

        let mirror =
            FullMerkleTree::from_leaves(3, vec![commit.leaf.as_ref().unwrap().hash()]).unwrap();
        let receipt = ledger
            .execute(Instruction::VerifyLeaf {
                tree_id,
                leaf: commit.leaf.unwrap().hash(),
                proof: mirror.get_proof(0).unwrap(),
            })
            .unwrap();
        assert_eq!(receipt, Receipt::Verified { tree_id, index: 0 });
    }

    #[test]
    fn test_unknown_tree() {
        let ledger = AssetLedger::default();
        let tree_id = Pubkey::from_seed("missing");
        assert_eq!(ledger.root(&tree_id), Err(LedgerError::TreeNotFound(tree_id)));
    }

    #[test]
    fn test_asset_state_progression() {
        let mut fx = Fixture::new(3, 8);
        assert_eq!(fx.ledger.asset_state(&fx.tree_id, 0).unwrap(), AssetState::Uncreated);
        fx.mint("alice", "A");
        assert_eq!(fx.ledger.asset_state(&fx.tree_id, 0).unwrap(), AssetState::Compressed);
    }
}
