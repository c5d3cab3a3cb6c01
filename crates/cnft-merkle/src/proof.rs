//! Merkle inclusion proofs and the stateless verifier

use cnft_primitives::{hash_to_parent, Node};
use serde::{Deserialize, Serialize};

/// A Merkle proof for inclusion of a leaf
///
/// `root` is the root the proof was generated against. It may be stale;
/// the concurrent tree fast-forwards such proofs through its changelog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// Root the siblings were taken from
    pub root: Node,

    /// Index of the leaf being proven
    pub leaf_index: u32,

    /// Sibling hashes from the leaf level upwards
    pub siblings: Vec<Node>,
}

impl MerkleProof {
    /// Create a new proof
    pub fn new(root: Node, leaf_index: u32, siblings: Vec<Node>) -> Self {
        Self {
            root,
            leaf_index,
            siblings,
        }
    }

    /// Number of sibling levels carried
    pub fn len(&self) -> usize {
        self.siblings.len()
    }

    /// Whether the proof carries no siblings
    pub fn is_empty(&self) -> bool {
        self.siblings.is_empty()
    }

    /// Drop the top `canopy_depth` siblings, which the tree can fill in itself
    pub fn truncated(&self, canopy_depth: u32) -> Self {
        let keep = self.siblings.len().saturating_sub(canopy_depth as usize);
        Self {
            root: self.root,
            leaf_index: self.leaf_index,
            siblings: self.siblings[..keep].to_vec(),
        }
    }

    /// Check this proof against its own recorded root
    pub fn verify(&self, leaf_hash: &Node) -> bool {
        verify_proof(&self.root, self.leaf_index, leaf_hash, &self.siblings)
    }
}

/// Recompute the root reached from `leaf_hash` at `leaf_index`
///
/// Bit `l` of the index selects whether the running node is the left (0)
/// or right (1) child at level `l`.
pub fn recompute_root(leaf_index: u32, leaf_hash: &Node, siblings: &[Node]) -> Node {
    siblings
        .iter()
        .enumerate()
        .fold(*leaf_hash, |node, (level, sibling)| {
            hash_to_parent(&node, sibling, leaf_index, level as u32)
        })
}

/// Verify a Merkle proof
///
/// Pure and stateless: never errors, returns `false` on any mismatch
/// including an index that does not fit in `siblings.len()` levels.
pub fn verify_proof(root: &Node, leaf_index: u32, leaf_hash: &Node, siblings: &[Node]) -> bool {
    if siblings.len() < 32 && (leaf_index as u64) >> siblings.len() != 0 {
        return false;
    }
    recompute_root(leaf_index, leaf_hash, siblings) == *root
}

/// The nodes on a leaf's path, from the leaf itself up to (excluding) the root
pub fn path_nodes(leaf_index: u32, leaf_hash: &Node, siblings: &[Node]) -> Vec<Node> {
    let mut path = Vec::with_capacity(siblings.len());
    let mut node = *leaf_hash;
    for (level, sibling) in siblings.iter().enumerate() {
        path.push(node);
        node = hash_to_parent(&node, sibling, leaf_index, level as u32);
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use cnft_primitives::{empty_nodes, hash_pair, EMPTY_LEAF};

    fn leaf(i: u8) -> Node {
        Node::sha256(&[i])
    }

    #[test]
    fn test_two_level_tree_by_hand() {
        let (a, b, c, d) = (leaf(0), leaf(1), leaf(2), leaf(3));
        let ab = hash_pair(&a, &b);
        let cd = hash_pair(&c, &d);
        let root = hash_pair(&ab, &cd);

        assert!(verify_proof(&root, 0, &a, &[b, cd]));
        assert!(verify_proof(&root, 1, &b, &[a, cd]));
        assert!(verify_proof(&root, 2, &c, &[d, ab]));
        assert!(verify_proof(&root, 3, &d, &[c, ab]));
    }

    #[test]
    fn test_wrong_leaf_rejected() {
        let (a, b) = (leaf(0), leaf(1));
        let root = hash_pair(&a, &b);
        assert!(!verify_proof(&root, 0, &leaf(9), &[b]));
    }

    #[test]
    fn test_wrong_index_rejected() {
        let (a, b) = (leaf(0), leaf(1));
        let root = hash_pair(&a, &b);
        assert!(!verify_proof(&root, 1, &a, &[b]));
        assert!(!verify_proof(&root, 2, &a, &[b]));
    }

    #[test]
    fn test_verify_is_idempotent() {
        let (a, b) = (leaf(0), leaf(1));
        let root = hash_pair(&a, &b);
        let first = verify_proof(&root, 0, &a, &[b]);
        let second = verify_proof(&root, 0, &a, &[b]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_tree_proof() {
        let empties = empty_nodes(3);
        let siblings = empties[..3].to_vec();
        assert!(verify_proof(&empties[3], 5, &EMPTY_LEAF, &siblings));
    }

    #[test]
    fn test_path_nodes_start_at_leaf() {
        let (a, b) = (leaf(0), leaf(1));
        let path = path_nodes(1, &b, &[a]);
        assert_eq!(path, vec![b]);
    }

    #[test]
    fn test_truncated_keeps_lower_levels() {
        let proof = MerkleProof::new(Node::zero(), 0, vec![leaf(1), leaf(2), leaf(3)]);
        let short = proof.truncated(2);
        assert_eq!(short.siblings, vec![leaf(1)]);
        assert_eq!(proof.truncated(5).len(), 0);
    }
}
