//! Changelog of recent root transitions

use cnft_primitives::Node;
use serde::{Deserialize, Serialize};

/// One committed leaf replacement
///
/// `path[l]` is the node at level `l` on the mutated leaf's path after the
/// change (`path[0]` is the new leaf). A proof for a different leaf can be
/// carried across this change by swapping in the node at the level where
/// the two paths meet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    /// Root after the change
    pub root: Node,

    /// New path nodes, leaf level first
    pub path: Vec<Node>,

    /// Index of the mutated leaf
    pub index: u32,

    /// Tree sequence number of this change
    pub seq: u64,
}

impl ChangeLogEntry {
    /// The leaf written by this change
    pub fn leaf(&self) -> Node {
        self.path.first().copied().unwrap_or_default()
    }

    /// Carry `siblings` (a proof for `leaf_index`) across this change
    ///
    /// Returns `false` without touching the proof when this change wrote the
    /// same leaf, which means the proven leaf value is no longer current.
    pub fn fast_forward(&self, leaf_index: u32, siblings: &mut [Node]) -> bool {
        if leaf_index == self.index {
            return false;
        }
        let level = critical_level(leaf_index, self.index) as usize;
        if let (Some(slot), Some(node)) = (siblings.get_mut(level), self.path.get(level)) {
            *slot = *node;
        }
        true
    }
}

/// Level at which the paths of two distinct leaves become siblings
///
/// This is the position of the highest bit in which the indices differ.
pub fn critical_level(a: u32, b: u32) -> u32 {
    debug_assert_ne!(a, b);
    31 - (a ^ b).leading_zeros()
}
