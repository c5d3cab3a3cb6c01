//! Fuzz target for stale proof reconciliation
//!
//! Drives a small tree with arbitrary writes, then submits a proof taken at
//! an arbitrary earlier point. Reconciliation must agree with a full mirror:
//! success only when the proven leaf is still current.

#![no_main]

use arbitrary::Arbitrary;
use cnft_merkle::{ConcurrentMerkleTree, FullMerkleTree, TreeParams};
use cnft_primitives::Node;
use libfuzzer_sys::fuzz_target;

const DEPTH: u32 = 4;

#[derive(Debug, Arbitrary)]
struct Input {
    buffer: u8,
    appends: u8,
    writes: Vec<(u8, [u8; 32])>,
    proof_at: u8,
    target: u8,
    forged: Option<[u8; 32]>,
}

fuzz_target!(|input: Input| {
    let buffer = u32::from(input.buffer % 16) + 1;
    let appends = u32::from(input.appends % 16) + 1;
    let Ok(mut tree) = ConcurrentMerkleTree::new(TreeParams::new(DEPTH, buffer)) else {
        return;
    };
    let mut mirror = FullMerkleTree::new(DEPTH).unwrap();
    for i in 0..appends {
        let leaf = Node::sha256(&i.to_le_bytes());
        tree.append(leaf).unwrap();
        mirror.set_leaf(i, leaf).unwrap();
    }

    let target = u32::from(input.target) % appends;
    let writes: Vec<_> = input.writes.into_iter().take(32).collect();
    let proof_at = usize::from(input.proof_at) % (writes.len() + 1);

    let mut proof = None;
    let mut proven = Node::zero();
    for (step, (index, leaf)) in writes.iter().enumerate() {
        if step == proof_at {
            proof = Some(mirror.get_proof(target).unwrap());
            proven = mirror.leaf(target);
        }
        let index = u32::from(*index) % appends;
        let current = mirror.get_proof(index).unwrap();
        tree.apply_mutation(&current, &mirror.leaf(index), Node(*leaf))
            .unwrap();
        mirror.set_leaf(index, Node(*leaf)).unwrap();
    }
    let proof = proof.unwrap_or_else(|| {
        proven = mirror.leaf(target);
        mirror.get_proof(target).unwrap()
    });

    let claimed = input.forged.map(Node).unwrap_or(proven);
    if tree.prove_leaf(&proof, &claimed).is_ok() {
        assert_eq!(claimed, mirror.leaf(target));
    }
    assert_eq!(tree.root(), mirror.root());
});
