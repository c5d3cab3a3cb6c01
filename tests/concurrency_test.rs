//! Concurrency tests
//!
//! Many writers commit against one tree at once. Whatever order the commits
//! land in, replaying the event stream sequentially must rebuild the same
//! root, and sequence numbers must be gap-free.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cnft_client::{AssetClient, ClientConfig, InMemoryIndexer, RetryPolicy};
use cnft_ledger::{AssetLedger, LedgerEvent, MetadataArgs, RecordingSink};
use cnft_merkle::{ConcurrentMerkleTree, FullMerkleTree, TreeParams};
use cnft_primitives::{Node, Pubkey, EMPTY_LEAF};

const DEPTH: u32 = 6;

fn setup(buffer: u32) -> (Arc<AssetLedger>, Arc<RecordingSink>, Pubkey, Pubkey) {
    let ledger = Arc::new(AssetLedger::default());
    let sink = Arc::new(RecordingSink::new());
    ledger.subscribe(sink.clone());
    let tree_id = Pubkey::new_unique();
    let creator = Pubkey::new_unique();
    ledger
        .create_tree(tree_id, creator, TreeParams::new(DEPTH, buffer), true)
        .unwrap();
    (ledger, sink, tree_id, creator)
}

/// Replay leaf writes in the order they were emitted, one at a time
///
/// Returns the root of a fresh concurrent tree driven with current-root
/// proofs only, after checking it against a full mirror.
fn replay(events: &[LedgerEvent]) -> Node {
    let mut mirror = FullMerkleTree::new(DEPTH).unwrap();
    let mut tree = ConcurrentMerkleTree::new(TreeParams::new(DEPTH, 1)).unwrap();
    let mut expected_seq = 1;

    for event in events {
        let LedgerEvent::LeafUpdated { index, seq, leaf, .. } = event else {
            continue;
        };
        assert_eq!(*seq, expected_seq, "sequence numbers must be gap-free");
        expected_seq += 1;

        let new_leaf = leaf.as_ref().map(|l| l.hash()).unwrap_or(EMPTY_LEAF);
        if *index == tree.num_leaves() {
            tree.append(new_leaf).unwrap();
        } else {
            let proof = mirror.get_proof(*index).unwrap();
            tree.apply_mutation(&proof, &mirror.leaf(*index), new_leaf)
                .unwrap();
        }
        mirror.set_leaf(*index, new_leaf).unwrap();
        assert_eq!(tree.root(), mirror.root());
    }
    tree.root()
}

#[test]
fn test_concurrent_mints_keep_single_writer_root() {
    let (ledger, sink, tree_id, _) = setup(16);

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let ledger = ledger.clone();
            thread::spawn(move || {
                let minter = Pubkey::new_unique();
                for i in 0..6 {
                    let name = format!("T{}-{}", t, i);
                    ledger
                        .mint(&tree_id, &minter, minter, None, &MetadataArgs::new(name, "C", "u"))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(ledger.tree_config(&tree_id).unwrap().num_minted, 48);
    assert_eq!(replay(&sink.events()), ledger.root(&tree_id).unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_transfers_through_indexer() {
    let (ledger, sink, tree_id, creator) = setup(4);
    let indexer = Arc::new(InMemoryIndexer::new());
    indexer.track_tree(tree_id, DEPTH).unwrap();
    ledger.subscribe(indexer.clone());

    let owners: Vec<Pubkey> = (0..12).map(|_| Pubkey::new_unique()).collect();
    let mut assets = Vec::new();
    for (i, owner) in owners.iter().enumerate() {
        let commit = ledger
            .mint(
                &tree_id,
                &creator,
                *owner,
                None,
                &MetadataArgs::new(format!("N{}", i), "C", "u"),
            )
            .unwrap();
        assets.push(commit.asset_id);
    }

    let config = ClientConfig::local().with_retry(
        RetryPolicy::default()
            .with_max_attempts(20)
            .with_initial_backoff(Duration::from_millis(1)),
    );
    let client = Arc::new(AssetClient::new(ledger.clone(), indexer.clone(), config));

    let tasks: Vec<_> = assets
        .iter()
        .zip(owners.iter())
        .map(|(asset, owner)| {
            let client = client.clone();
            let (asset, owner) = (*asset, *owner);
            tokio::spawn(async move {
                let next = Pubkey::new_unique();
                client.transfer(&asset, &owner, next).await.map(|_| next)
            })
        })
        .collect();

    for (task, asset) in tasks.into_iter().zip(assets.iter()) {
        let new_owner = task.await.unwrap().unwrap();
        let indexed = client
            .wait_for(asset, |leaf| leaf.leaf.owner == new_owner)
            .await
            .unwrap();
        assert!(indexed.compressed);
    }

    let root = ledger.root(&tree_id).unwrap();
    assert_eq!(indexer.root(&tree_id), Some(root));
    assert_eq!(replay(&sink.events()), root);
    assert_eq!(ledger.sequence_number(&tree_id).unwrap(), 24);
}
