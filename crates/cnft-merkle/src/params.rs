//! Tree sizing parameters

use cnft_primitives::MAX_DEPTH;
use serde::{Deserialize, Serialize};

use crate::error::{TreeError, TreeResult};

/// Largest changelog the protocol supports
pub const MAX_BUFFER_SIZE: u32 = 2048;

/// Depth/buffer pairs accepted by the reference account-compression program
pub const CANONICAL_DEPTH_BUFFER_PAIRS: &[(u32, u32)] = &[
    (3, 8),
    (5, 8),
    (6, 16),
    (7, 16),
    (8, 16),
    (9, 16),
    (10, 32),
    (11, 32),
    (12, 32),
    (13, 32),
    (14, 64),
    (14, 256),
    (14, 1024),
    (14, 2048),
    (15, 64),
    (16, 64),
    (17, 64),
    (18, 64),
    (19, 64),
    (20, 64),
    (20, 256),
    (20, 1024),
    (20, 2048),
    (24, 64),
    (24, 256),
    (24, 512),
    (24, 1024),
    (24, 2048),
    (26, 512),
    (26, 1024),
    (26, 2048),
    (30, 512),
    (30, 1024),
    (30, 2048),
];

/// Fixed sizing of a concurrent tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeParams {
    /// Number of levels below the root; capacity is `2^max_depth`
    pub max_depth: u32,

    /// Number of changelog entries retained
    pub max_buffer_size: u32,

    /// Number of top levels cached so proofs may omit them
    #[serde(default)]
    pub canopy_depth: u32,
}

impl TreeParams {
    /// Parameters without a canopy
    pub fn new(max_depth: u32, max_buffer_size: u32) -> Self {
        Self {
            max_depth,
            max_buffer_size,
            canopy_depth: 0,
        }
    }

    /// Set the canopy depth
    pub fn with_canopy(mut self, canopy_depth: u32) -> Self {
        self.canopy_depth = canopy_depth;
        self
    }

    /// Number of leaf slots
    pub fn capacity(&self) -> u64 {
        1u64 << self.max_depth
    }

    /// Changelog entries retained: the window's base root plus one per
    /// buffered transition
    pub fn changelog_capacity(&self) -> usize {
        self.max_buffer_size as usize + 1
    }

    /// Shortest proof the tree accepts
    pub fn min_proof_len(&self) -> usize {
        (self.max_depth - self.canopy_depth.min(self.max_depth)) as usize
    }

    /// Whether `(max_depth, max_buffer_size)` is one of the canonical pairs
    pub fn is_canonical(&self) -> bool {
        CANONICAL_DEPTH_BUFFER_PAIRS.contains(&(self.max_depth, self.max_buffer_size))
    }

    /// Check bounds
    pub fn validate(&self) -> TreeResult<()> {
        if self.max_depth == 0 || self.max_depth > MAX_DEPTH {
            return Err(TreeError::InvalidConfig(format!(
                "max_depth {} outside 1..={}",
                self.max_depth, MAX_DEPTH
            )));
        }
        if self.max_buffer_size == 0 || self.max_buffer_size > MAX_BUFFER_SIZE {
            return Err(TreeError::InvalidConfig(format!(
                "max_buffer_size {} outside 1..={}",
                self.max_buffer_size, MAX_BUFFER_SIZE
            )));
        }
        if self.canopy_depth >= self.max_depth {
            return Err(TreeError::InvalidConfig(format!(
                "canopy_depth {} must be less than max_depth {}",
                self.canopy_depth, self.max_depth
            )));
        }
        Ok(())
    }
}
