//! Fully materialized Merkle tree for indexers
//!
//! Indexers mirror every leaf and serve proofs from it. Only the occupied
//! prefix of each level is stored; nodes past the end are empty subtrees.

use cnft_primitives::{empty_nodes, hash_pair, Node, MAX_DEPTH};

use crate::error::{TreeError, TreeResult};
use crate::proof::MerkleProof;

/// Merkle tree holding every leaf of a fixed-depth tree
#[derive(Debug, Clone)]
pub struct FullMerkleTree {
    /// Nodes per level (level 0 = leaves), occupied prefix only
    levels: Vec<Vec<Node>>,

    /// Empty subtree roots for every height
    empty_nodes: Vec<Node>,

    /// The root hash
    root: Node,
}

impl FullMerkleTree {
    /// Create an empty tree of the given depth
    pub fn new(depth: u32) -> TreeResult<Self> {
        if depth == 0 || depth > MAX_DEPTH {
            return Err(TreeError::InvalidConfig(format!(
                "depth {} outside 1..={}",
                depth, MAX_DEPTH
            )));
        }
        let empties = empty_nodes(depth);
        Ok(Self {
            levels: vec![Vec::new(); depth as usize],
            root: empties[depth as usize],
            empty_nodes: empties,
        })
    }

    /// Build a tree from pre-computed leaf hashes
    pub fn from_leaves(depth: u32, leaves: Vec<Node>) -> TreeResult<Self> {
        let mut tree = Self::new(depth)?;
        if leaves.len() as u64 > tree.capacity() {
            return Err(TreeError::TreeFull {
                capacity: tree.capacity(),
            });
        }

        // Build bottom-up, padding odd levels with the empty subtree
        let mut current_level = leaves;
        for level in 0..depth as usize {
            let mut next_level = Vec::with_capacity(current_level.len().div_ceil(2));
            for pair in current_level.chunks(2) {
                let right = pair.get(1).copied().unwrap_or(tree.empty_nodes[level]);
                next_level.push(hash_pair(&pair[0], &right));
            }
            tree.levels[level] = current_level;
            current_level = next_level;
        }

        if let Some(root) = current_level.first() {
            tree.root = *root;
        }
        Ok(tree)
    }

    /// Get the root hash
    pub fn root(&self) -> Node {
        self.root
    }

    /// Tree depth
    pub fn depth(&self) -> u32 {
        self.levels.len() as u32
    }

    /// Number of leaf slots
    pub fn capacity(&self) -> u64 {
        1u64 << self.levels.len()
    }

    /// Number of stored leaves (highest written index + 1)
    pub fn num_leaves(&self) -> usize {
        self.levels[0].len()
    }

    /// Get a leaf, empty when never written
    pub fn leaf(&self, index: u32) -> Node {
        self.levels[0]
            .get(index as usize)
            .copied()
            .unwrap_or(self.empty_nodes[0])
    }

    /// Write a leaf and rehash its path
    pub fn set_leaf(&mut self, index: u32, leaf: Node) -> TreeResult<()> {
        if u64::from(index) >= self.capacity() {
            return Err(TreeError::IndexOutOfRange {
                index,
                appended: self.num_leaves() as u32,
            });
        }

        let mut position = index as usize;
        let mut node = leaf;
        for (level, nodes) in self.levels.iter_mut().enumerate() {
            let empty = self.empty_nodes[level];
            if nodes.len() <= position {
                nodes.resize(position + 1, empty);
            }
            nodes[position] = node;

            let sibling = nodes.get(position ^ 1).copied().unwrap_or(empty);
            node = if position & 1 == 0 {
                hash_pair(&node, &sibling)
            } else {
                hash_pair(&sibling, &node)
            };
            position >>= 1;
        }
        self.root = node;
        Ok(())
    }

    /// Get a Merkle proof for a specific leaf index
    pub fn get_proof(&self, leaf_index: u32) -> TreeResult<MerkleProof> {
        if u64::from(leaf_index) >= self.capacity() {
            return Err(TreeError::IndexOutOfRange {
                index: leaf_index,
                appended: self.num_leaves() as u32,
            });
        }

        // Walk up the tree collecting siblings
        let siblings = self
            .levels
            .iter()
            .enumerate()
            .map(|(level, nodes)| {
                let sibling_index = ((leaf_index >> level) ^ 1) as usize;
                nodes
                    .get(sibling_index)
                    .copied()
                    .unwrap_or(self.empty_nodes[level])
            })
            .collect();

        Ok(MerkleProof::new(self.root, leaf_index, siblings))
    }
}
