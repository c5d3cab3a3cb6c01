//! Tree snapshot serialization
//!
//! A snapshot holds everything that must survive between operations: the
//! root, the changelog, the append frontier and the canopy. Two encodings
//! are provided: JSON for inspection and a compact versioned binary layout
//! for storage. Losing the changelog only narrows the window in which stale
//! proofs reconcile; losing the root is unrecoverable.

use base64::Engine;
use cnft_primitives::Node;
use serde::{Deserialize, Serialize};

use crate::changelog::ChangeLogEntry;
use crate::error::{TreeError, TreeResult};
use crate::params::TreeParams;
use crate::tree::{Canopy, ConcurrentMerkleTree, RightmostPath};

/// Persisted form of a [`ConcurrentMerkleTree`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeSnapshot {
    /// Format version
    pub version: u8,

    /// Sizing parameters
    pub params: TreeParams,

    /// Sequence number of the latest change
    pub sequence_number: u64,

    /// Current root
    pub root: Node,

    /// Retained changelog, oldest first (may be empty)
    #[serde(default)]
    pub change_logs: Vec<ChangeLogEntry>,

    /// Append frontier
    pub rightmost_proof: RightmostPath,

    /// Cached top levels
    pub canopy: Canopy,
}

impl TreeSnapshot {
    /// Current format version
    pub const VERSION: u8 = 1;

    /// Capture a tree
    pub fn capture(tree: &ConcurrentMerkleTree) -> Self {
        Self {
            version: Self::VERSION,
            params: *tree.params(),
            sequence_number: tree.sequence_number(),
            root: tree.root(),
            change_logs: tree.changelog().cloned().collect(),
            rightmost_proof: tree.rightmost_path().clone(),
            canopy: tree.canopy().clone(),
        }
    }

    /// Same snapshot with the changelog dropped
    pub fn without_changelog(mut self) -> Self {
        self.change_logs.clear();
        self
    }

    /// Rebuild the tree
    pub fn restore(self) -> TreeResult<ConcurrentMerkleTree> {
        if self.version != Self::VERSION {
            return Err(TreeError::Snapshot(format!(
                "Unsupported version: {}",
                self.version
            )));
        }
        ConcurrentMerkleTree::from_parts(
            self.params,
            self.sequence_number,
            self.root,
            self.change_logs,
            self.rightmost_proof,
            self.canopy,
        )
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> TreeResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| TreeError::Snapshot(format!("JSON error: {}", e)))
    }

    /// Deserialize from JSON
    pub fn from_json(json: &str) -> TreeResult<Self> {
        serde_json::from_str(json).map_err(|e| TreeError::Snapshot(format!("JSON error: {}", e)))
    }

    /// Binary form, base64 encoded
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.to_bytes())
    }

    /// Parse the base64 binary form
    pub fn from_base64(encoded: &str) -> TreeResult<Self> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| TreeError::Snapshot(format!("base64 error: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    /// Serialize to compact binary format
    ///
    /// Layout (integers little-endian): version, max_depth, max_buffer_size,
    /// canopy_depth, sequence_number, root, rightmost index/leaf/proof,
    /// changelog count then `(index, seq, root, path)` per entry, then every
    /// canopy node level by level.
    pub fn to_bytes(&self) -> Vec<u8> {
        let depth = self.params.max_depth as usize;
        let mut bytes = Vec::with_capacity(
            64 + (depth + 1) * 32 + self.change_logs.len() * (12 + (depth + 1) * 32),
        );

        bytes.push(self.version);
        bytes.extend_from_slice(&self.params.max_depth.to_le_bytes());
        bytes.extend_from_slice(&self.params.max_buffer_size.to_le_bytes());
        bytes.extend_from_slice(&self.params.canopy_depth.to_le_bytes());
        bytes.extend_from_slice(&self.sequence_number.to_le_bytes());
        bytes.extend_from_slice(self.root.as_bytes());

        bytes.extend_from_slice(&self.rightmost_proof.index.to_le_bytes());
        bytes.extend_from_slice(self.rightmost_proof.leaf.as_bytes());
        for node in &self.rightmost_proof.proof {
            bytes.extend_from_slice(node.as_bytes());
        }

        bytes.extend_from_slice(&(self.change_logs.len() as u32).to_le_bytes());
        for entry in &self.change_logs {
            bytes.extend_from_slice(&entry.index.to_le_bytes());
            bytes.extend_from_slice(&entry.seq.to_le_bytes());
            bytes.extend_from_slice(entry.root.as_bytes());
            for node in &entry.path {
                bytes.extend_from_slice(node.as_bytes());
            }
        }

        for nodes in &self.canopy.levels {
            for node in nodes {
                bytes.extend_from_slice(node.as_bytes());
            }
        }
        bytes
    }

    /// Deserialize from compact binary format
    pub fn from_bytes(bytes: &[u8]) -> TreeResult<Self> {
        let mut reader = Reader { bytes, pos: 0 };

        let version = reader.u8()?;
        if version != Self::VERSION {
            return Err(TreeError::Snapshot(format!(
                "Unsupported version: {}",
                version
            )));
        }

        let params = TreeParams {
            max_depth: reader.u32()?,
            max_buffer_size: reader.u32()?,
            canopy_depth: reader.u32()?,
        };
        params.validate()?;
        let depth = params.max_depth as usize;

        let sequence_number = reader.u64()?;
        let root = reader.node()?;

        let rightmost_proof = RightmostPath {
            index: reader.u32()?,
            leaf: reader.node()?,
            proof: reader.nodes(depth)?,
        };

        let count = reader.u32()? as usize;
        if count > params.changelog_capacity() {
            return Err(TreeError::Snapshot(format!(
                "changelog count {} exceeds buffer {}",
                count,
                params.changelog_capacity()
            )));
        }
        let mut change_logs = Vec::with_capacity(count);
        for _ in 0..count {
            change_logs.push(ChangeLogEntry {
                index: reader.u32()?,
                seq: reader.u64()?,
                root: reader.node()?,
                path: reader.nodes(depth)?,
            });
        }

        let base_level = params.max_depth - params.canopy_depth;
        let mut levels = Vec::with_capacity(params.canopy_depth as usize);
        for k in 0..params.canopy_depth {
            levels.push(reader.nodes(1usize << (params.canopy_depth - k))?);
        }

        if reader.pos != bytes.len() {
            return Err(TreeError::Snapshot(format!(
                "{} trailing bytes",
                bytes.len() - reader.pos
            )));
        }

        Ok(Self {
            version,
            params,
            sequence_number,
            root,
            change_logs,
            rightmost_proof,
            canopy: Canopy { base_level, levels },
        })
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> TreeResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| TreeError::Snapshot("Input too short".to_string()))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> TreeResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> TreeResult<u32> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(buf))
    }

    fn u64(&mut self) -> TreeResult<u64> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(buf))
    }

    fn node(&mut self) -> TreeResult<Node> {
        let mut buf = [0u8; 32];
        buf.copy_from_slice(self.take(32)?);
        Ok(Node(buf))
    }

    fn nodes(&mut self, count: usize) -> TreeResult<Vec<Node>> {
        // Bound the allocation by what the input can actually hold
        if count > (self.bytes.len() - self.pos) / 32 {
            return Err(TreeError::Snapshot("Input too short".to_string()));
        }
        (0..count).map(|_| self.node()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::full::FullMerkleTree;

    fn leaf(i: u32) -> Node {
        Node::sha256(&i.to_le_bytes())
    }

    fn populated_tree() -> (ConcurrentMerkleTree, FullMerkleTree) {
        let mut tree = ConcurrentMerkleTree::new(TreeParams::new(5, 4).with_canopy(2)).unwrap();
        let mut reference = FullMerkleTree::new(5).unwrap();
        for i in 0..6 {
            tree.append(leaf(i)).unwrap();
            reference.set_leaf(i, leaf(i)).unwrap();
        }
        (tree, reference)
    }

    #[test]
    fn test_json_restore_preserves_behavior() {
        let (tree, mut reference) = populated_tree();
        let json = TreeSnapshot::capture(&tree).to_json().unwrap();
        let mut restored = TreeSnapshot::from_json(&json).unwrap().restore().unwrap();

        assert_eq!(restored.root(), tree.root());
        restored.append(leaf(6)).unwrap();
        reference.set_leaf(6, leaf(6)).unwrap();
        assert_eq!(restored.root(), reference.root());
    }

    #[test]
    fn test_binary_layout_restores_same_snapshot() {
        let (tree, _) = populated_tree();
        let snapshot = TreeSnapshot::capture(&tree);
        let decoded = TreeSnapshot::from_bytes(&snapshot.to_bytes()).unwrap();
        assert_eq!(decoded, snapshot);

        let from_b64 = TreeSnapshot::from_base64(&snapshot.to_base64()).unwrap();
        assert_eq!(from_b64, snapshot);
    }

    #[test]
    fn test_truncated_input_rejected() {
        let (tree, _) = populated_tree();
        let bytes = TreeSnapshot::capture(&tree).to_bytes();
        for cut in [0, 1, 10, bytes.len() - 1] {
            assert!(TreeSnapshot::from_bytes(&bytes[..cut]).is_err());
        }
    }

    #[test]
    fn test_unknown_version_rejected() {
        let (tree, _) = populated_tree();
        let mut bytes = TreeSnapshot::capture(&tree).to_bytes();
        bytes[0] = 99;
        assert!(TreeSnapshot::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_lost_changelog_narrows_window() {
        let (mut tree, mut reference) = populated_tree();
        let stale = reference.get_proof(0).unwrap();
        tree.append(leaf(6)).unwrap();
        reference.set_leaf(6, leaf(6)).unwrap();

        // With the changelog the stale proof still reconciles
        assert!(tree.prove_leaf(&stale, &leaf(0)).is_ok());

        let restored = TreeSnapshot::capture(&tree)
            .without_changelog()
            .restore()
            .unwrap();
        assert_eq!(restored.root(), tree.root());
        assert!(matches!(
            restored.prove_leaf(&stale, &leaf(0)),
            Err(TreeError::ConcurrentModification { index: 0 })
        ));

        // Fresh proofs still work
        let fresh = reference.get_proof(0).unwrap();
        assert!(restored.prove_leaf(&fresh, &leaf(0)).is_ok());
    }

    #[test]
    fn test_inconsistent_root_rejected() {
        let (tree, _) = populated_tree();
        let mut snapshot = TreeSnapshot::capture(&tree);
        snapshot.root = Node::sha256(b"wrong");
        assert!(snapshot.restore().is_err());
    }

    #[test]
    fn test_corrupted_frontier_rejected() {
        let (tree, _) = populated_tree();
        let mut snapshot = TreeSnapshot::capture(&tree);
        snapshot.rightmost_proof.proof[1] = Node::sha256(b"garbage");
        assert!(matches!(snapshot.restore(), Err(TreeError::Snapshot(_))));
    }

    #[test]
    fn test_corrupted_canopy_rejected() {
        let (tree, _) = populated_tree();
        let mut snapshot = TreeSnapshot::capture(&tree);
        snapshot.canopy.levels[0][3] = Node::sha256(b"garbage");
        assert!(matches!(snapshot.restore(), Err(TreeError::Snapshot(_))));
    }

    #[test]
    fn test_sequence_mismatch_rejected() {
        let (tree, _) = populated_tree();
        let mut snapshot = TreeSnapshot::capture(&tree);
        snapshot.sequence_number += 1;
        assert!(matches!(snapshot.restore(), Err(TreeError::Snapshot(_))));

        // Without a changelog there is nothing to cross-check
        let mut bare = TreeSnapshot::capture(&tree).without_changelog();
        bare.sequence_number += 1;
        assert!(bare.restore().is_ok());
    }
}
