//! Concurrent Merkle tree
//!
//! Only the root, a bounded changelog of recent root transitions, the
//! append frontier and an optional canopy are stored; leaves live with the
//! indexers. A proof generated against a root that is up to
//! `max_buffer_size` transitions old is carried forward through the
//! changelog before it is checked, so writers racing on different leaves
//! do not invalidate each other.

use std::collections::VecDeque;

use cnft_primitives::{empty_nodes, hash_pair, Node, EMPTY_LEAF};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::changelog::{critical_level, ChangeLogEntry};
use crate::error::{TreeError, TreeResult};
use crate::params::TreeParams;
use crate::proof::{path_nodes, recompute_root, verify_proof, MerkleProof};

/// Proof of the most recently appended leaf
///
/// `index` counts appended leaves, so the last appended leaf sits at
/// `index - 1` and the next append goes to `index`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RightmostPath {
    /// Siblings of leaf `index - 1`
    pub proof: Vec<Node>,

    /// Current value of leaf `index - 1`
    pub leaf: Node,

    /// Number of appended leaves
    pub index: u32,
}

/// Cached top levels of the tree
///
/// `levels[k]` holds every node of tree level `max_depth - canopy_depth + k`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Canopy {
    /// First tree level held by the canopy
    pub base_level: u32,

    /// Nodes per cached level, lowest level first
    pub levels: Vec<Vec<Node>>,
}

impl Canopy {
    fn empty(params: &TreeParams, empties: &[Node]) -> Self {
        let base_level = params.max_depth - params.canopy_depth;
        let levels = (0..params.canopy_depth)
            .map(|k| {
                let level = base_level + k;
                vec![empties[level as usize]; 1usize << (params.max_depth - level)]
            })
            .collect();
        Self { base_level, levels }
    }

    fn update(&mut self, index: u32, path: &[Node]) {
        for (k, nodes) in self.levels.iter_mut().enumerate() {
            let level = self.base_level as usize + k;
            let position = (index >> level) as usize;
            if let (Some(slot), Some(node)) = (nodes.get_mut(position), path.get(level)) {
                *slot = *node;
            }
        }
    }

    fn fill(&self, index: u32, siblings: &mut Vec<Node>, max_depth: u32) {
        for level in siblings.len() as u32..max_depth {
            let Some(nodes) = self.levels.get((level - self.base_level) as usize) else {
                break;
            };
            let position = ((index >> level) ^ 1) as usize;
            siblings.push(nodes[position]);
        }
    }

    fn is_consistent(&self, params: &TreeParams) -> bool {
        self.base_level == params.max_depth - params.canopy_depth
            && self.levels.len() == params.canopy_depth as usize
            && self
                .levels
                .iter()
                .enumerate()
                .all(|(k, nodes)| nodes.len() == 1usize << (params.canopy_depth as usize - k))
    }

    /// Whether each cached level hashes into the next and the top into `root`
    fn hashes_to(&self, root: &Node) -> bool {
        self.levels.iter().enumerate().all(|(k, nodes)| {
            let parents: Vec<Node> = nodes
                .chunks_exact(2)
                .map(|pair| hash_pair(&pair[0], &pair[1]))
                .collect();
            match self.levels.get(k + 1) {
                Some(above) => parents == *above,
                None => parents == [*root],
            }
        })
    }
}

/// Append-and-update Merkle tree with a changelog for stale proofs
#[derive(Debug, Clone)]
pub struct ConcurrentMerkleTree {
    params: TreeParams,
    sequence_number: u64,
    change_logs: VecDeque<ChangeLogEntry>,
    rightmost_proof: RightmostPath,
    canopy: Canopy,
    empty_nodes: Vec<Node>,
}

impl ConcurrentMerkleTree {
    /// Create an empty tree
    pub fn new(params: TreeParams) -> TreeResult<Self> {
        params.validate()?;
        let empties = empty_nodes(params.max_depth);
        let depth = params.max_depth as usize;

        let mut change_logs = VecDeque::with_capacity(params.changelog_capacity());
        change_logs.push_back(ChangeLogEntry {
            root: empties[depth],
            path: empties[..depth].to_vec(),
            index: 0,
            seq: 0,
        });

        Ok(Self {
            params,
            sequence_number: 0,
            change_logs,
            rightmost_proof: RightmostPath {
                proof: empties[..depth].to_vec(),
                leaf: EMPTY_LEAF,
                index: 0,
            },
            canopy: Canopy::empty(&params, &empties),
            empty_nodes: empties,
        })
    }

    /// Rebuild a tree from persisted parts
    ///
    /// An empty `change_logs` is accepted when `root` is given: the tree then
    /// only reconciles proofs against the current root.
    pub(crate) fn from_parts(
        params: TreeParams,
        sequence_number: u64,
        root: Node,
        change_logs: Vec<ChangeLogEntry>,
        rightmost_proof: RightmostPath,
        canopy: Canopy,
    ) -> TreeResult<Self> {
        params.validate()?;
        let depth = params.max_depth as usize;

        if change_logs.len() > params.changelog_capacity() {
            return Err(TreeError::Snapshot(format!(
                "changelog has {} entries, buffer holds {}",
                change_logs.len(),
                params.changelog_capacity()
            )));
        }
        if change_logs.iter().any(|entry| entry.path.len() != depth) {
            return Err(TreeError::Snapshot("changelog path length mismatch".to_string()));
        }
        if let Some(last) = change_logs.last() {
            if last.root != root {
                return Err(TreeError::Snapshot(
                    "latest changelog root differs from recorded root".to_string(),
                ));
            }
            if last.seq != sequence_number {
                return Err(TreeError::Snapshot(format!(
                    "latest changelog seq {} differs from sequence number {}",
                    last.seq, sequence_number
                )));
            }
        }
        if change_logs
            .windows(2)
            .any(|pair| pair[0].seq.checked_add(1) != Some(pair[1].seq))
        {
            return Err(TreeError::Snapshot("changelog seqs are not consecutive".to_string()));
        }
        if rightmost_proof.proof.len() != depth
            || u64::from(rightmost_proof.index) > params.capacity()
        {
            return Err(TreeError::Snapshot("rightmost path is malformed".to_string()));
        }
        let empties = empty_nodes(params.max_depth);
        let frontier_ok = match rightmost_proof.index {
            0 => root == empties[depth] && rightmost_proof.leaf == EMPTY_LEAF,
            count => verify_proof(&root, count - 1, &rightmost_proof.leaf, &rightmost_proof.proof),
        };
        if !frontier_ok {
            return Err(TreeError::Snapshot("rightmost path does not reach root".to_string()));
        }
        if !canopy.is_consistent(&params) {
            return Err(TreeError::Snapshot("canopy shape does not match params".to_string()));
        }
        if !canopy.hashes_to(&root) {
            return Err(TreeError::Snapshot("canopy does not hash to root".to_string()));
        }

        let mut change_logs: VecDeque<ChangeLogEntry> = change_logs.into();
        if change_logs.is_empty() {
            change_logs.push_back(ChangeLogEntry {
                root,
                path: vec![Node::zero(); depth],
                index: 0,
                seq: sequence_number,
            });
        }

        Ok(Self {
            params,
            sequence_number,
            change_logs,
            rightmost_proof,
            canopy,
            empty_nodes: empties,
        })
    }

    /// Sizing parameters
    pub fn params(&self) -> &TreeParams {
        &self.params
    }

    /// Current root
    pub fn root(&self) -> Node {
        self.change_logs
            .back()
            .map(|entry| entry.root)
            .unwrap_or(self.empty_nodes[self.params.max_depth as usize])
    }

    /// Number of committed changes since creation
    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    /// Number of appended leaves
    pub fn num_leaves(&self) -> u32 {
        self.rightmost_proof.index
    }

    /// Number of leaf slots
    pub fn capacity(&self) -> u64 {
        self.params.capacity()
    }

    /// Whether every slot has been appended
    pub fn is_full(&self) -> bool {
        u64::from(self.rightmost_proof.index) >= self.capacity()
    }

    /// Retained changelog, oldest first
    pub fn changelog(&self) -> impl Iterator<Item = &ChangeLogEntry> {
        self.change_logs.iter()
    }

    /// Append frontier
    pub fn rightmost_path(&self) -> &RightmostPath {
        &self.rightmost_proof
    }

    /// Cached top levels
    pub fn canopy(&self) -> &Canopy {
        &self.canopy
    }

    /// Append a leaf at the next free index
    pub fn append(&mut self, leaf: Node) -> TreeResult<ChangeLogEntry> {
        if self.is_full() {
            return Err(TreeError::TreeFull {
                capacity: self.capacity(),
            });
        }
        let index = self.rightmost_proof.index;
        let siblings = self.next_append_proof();
        debug_assert!(verify_proof(&self.root(), index, &EMPTY_LEAF, &siblings));

        let entry = self.commit(index, leaf, &siblings);
        self.rightmost_proof = RightmostPath {
            proof: siblings,
            leaf,
            index: index + 1,
        };
        Ok(entry)
    }

    /// Replace `old_leaf` with `new_leaf` at `proof.leaf_index`
    ///
    /// The proof may be stale; see [`ConcurrentMerkleTree::prove_leaf`].
    pub fn apply_mutation(
        &mut self,
        proof: &MerkleProof,
        old_leaf: &Node,
        new_leaf: Node,
    ) -> TreeResult<ChangeLogEntry> {
        let siblings = self.reconcile(proof, old_leaf)?;
        let entry = self.commit(proof.leaf_index, new_leaf, &siblings);
        self.update_rightmost(&entry);
        Ok(entry)
    }

    /// Check that `leaf` is stored at `proof.leaf_index` without mutating
    ///
    /// Succeeds when the proof is valid against the current root, or when
    /// it is valid against a root still in the changelog and no later
    /// change touched the same leaf.
    pub fn prove_leaf(&self, proof: &MerkleProof, leaf: &Node) -> TreeResult<()> {
        self.reconcile(proof, leaf).map(|_| ())
    }

    fn check_index(&self, index: u32) -> TreeResult<()> {
        if index >= self.rightmost_proof.index {
            return Err(TreeError::IndexOutOfRange {
                index,
                appended: self.rightmost_proof.index,
            });
        }
        Ok(())
    }

    fn fill_proof(&self, index: u32, siblings: &[Node]) -> TreeResult<Vec<Node>> {
        let min = self.params.min_proof_len();
        let max = self.params.max_depth as usize;
        if siblings.len() < min || siblings.len() > max {
            return Err(TreeError::InvalidProofLength {
                actual: siblings.len(),
                min,
                max,
            });
        }
        let mut filled = Vec::with_capacity(max);
        filled.extend_from_slice(siblings);
        self.canopy.fill(index, &mut filled, self.params.max_depth);
        Ok(filled)
    }

    /// Produce siblings valid against the current root, or explain why not
    ///
    /// Candidate changelog entries (those whose root equals `proof.root`)
    /// are tried oldest first; the first one whose fast-forwarded proof
    /// verifies wins.
    fn reconcile(&self, proof: &MerkleProof, leaf: &Node) -> TreeResult<Vec<Node>> {
        let index = proof.leaf_index;
        self.check_index(index)?;
        let siblings = self.fill_proof(index, &proof.siblings)?;
        let current = self.root();

        if proof.root == current {
            return if verify_proof(&current, index, leaf, &siblings) {
                Ok(siblings)
            } else {
                Err(TreeError::ProofInvalid { index })
            };
        }

        let mut candidates = 0usize;
        let mut conflicted = false;
        for (position, entry) in self.change_logs.iter().enumerate() {
            if entry.root != proof.root {
                continue;
            }
            candidates += 1;

            let mut forwarded = siblings.clone();
            let clean = self
                .change_logs
                .iter()
                .skip(position + 1)
                .all(|later| later.fast_forward(index, &mut forwarded));
            if !clean {
                conflicted = true;
                continue;
            }
            if verify_proof(&current, index, leaf, &forwarded) {
                debug!(
                    index,
                    from_seq = entry.seq,
                    to_seq = self.sequence_number,
                    "fast-forwarded stale proof"
                );
                return Ok(forwarded);
            }
        }

        if candidates == 0 || conflicted {
            Err(TreeError::ConcurrentModification { index })
        } else {
            Err(TreeError::ProofInvalid { index })
        }
    }

    fn commit(&mut self, index: u32, new_leaf: Node, siblings: &[Node]) -> ChangeLogEntry {
        self.sequence_number += 1;
        let entry = ChangeLogEntry {
            root: recompute_root(index, &new_leaf, siblings),
            path: path_nodes(index, &new_leaf, siblings),
            index,
            seq: self.sequence_number,
        };

        self.canopy.update(index, &entry.path);
        self.change_logs.push_back(entry.clone());
        while self.change_logs.len() > self.params.changelog_capacity() {
            self.change_logs.pop_front();
        }
        entry
    }

    /// Siblings of the next free slot, derived from the last appended leaf
    fn next_append_proof(&self) -> Vec<Node> {
        let depth = self.params.max_depth as usize;
        let index = self.rightmost_proof.index;
        if index == 0 {
            return self.empty_nodes[..depth].to_vec();
        }

        let last = index - 1;
        let last_path = path_nodes(last, &self.rightmost_proof.leaf, &self.rightmost_proof.proof);
        (0..depth)
            .map(|level| {
                if (index >> level) & 1 == 0 {
                    // Everything right of the frontier is empty
                    self.empty_nodes[level]
                } else if (last >> level) != (index >> level) {
                    last_path[level]
                } else {
                    self.rightmost_proof.proof[level]
                }
            })
            .collect()
    }

    fn update_rightmost(&mut self, entry: &ChangeLogEntry) {
        let rightmost = &mut self.rightmost_proof;
        if rightmost.index == 0 {
            return;
        }
        let last = rightmost.index - 1;
        if entry.index == last {
            rightmost.leaf = entry.leaf();
        } else {
            let level = critical_level(entry.index, last) as usize;
            rightmost.proof[level] = entry.path[level];
        }
    }
}
