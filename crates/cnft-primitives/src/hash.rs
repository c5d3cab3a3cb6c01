//! Tree node digests
//!
//! Every node of the compression tree (leaves included) is a 32-byte
//! SHA-256 digest. Interior nodes are `H(left || right)`; unoccupied slots
//! hold the all-zero [`EMPTY_LEAF`] and the empty subtree of height `l` is
//! built by hashing two empty subtrees of height `l - 1`.

use sha2::{Digest, Sha256};

use crate::error::EncodingError;

/// Digest of an unoccupied leaf slot
pub const EMPTY_LEAF: Node = Node([0u8; 32]);

/// Deepest tree the protocol supports (2^30 leaves)
pub const MAX_DEPTH: u32 = 30;

/// A 256-bit tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Node(pub [u8; 32]);

impl Node {
    /// Create a zero node
    pub const fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Create from bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Create from slice, `None` unless exactly 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(arr))
    }

    /// Create from hex string
    pub fn from_hex(hex: &str) -> Result<Self, hex::FromHexError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let bytes: Vec<u8> = hex::decode(hex)?;
        Self::from_slice(&bytes).ok_or(hex::FromHexError::InvalidStringLength)
    }

    /// Convert to hex string (lowercase, no 0x prefix)
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse the base58 form used by DAS indexers
    pub fn from_base58(s: &str) -> Result<Self, EncodingError> {
        let bytes = bs58::decode(s.trim()).into_vec()?;
        Self::from_slice(&bytes).ok_or(EncodingError::InvalidLength {
            expected: 32,
            actual: bytes.len(),
        })
    }

    /// Convert to base58
    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }

    /// Get the underlying bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Whether this is the empty-leaf digest
    pub fn is_empty_leaf(&self) -> bool {
        *self == EMPTY_LEAF
    }

    /// Compute SHA-256 hash of data
    pub fn sha256(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        finalize(hasher)
    }

    /// Compute SHA-256 with domain separation
    pub fn sha256_with_domain(domain: &[u8], data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        hasher.update(data);
        finalize(hasher)
    }

    /// Hash a sequence of byte chunks under a domain
    pub fn hashv(domain: &[u8], chunks: &[&[u8]]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        for chunk in chunks {
            hasher.update(chunk);
        }
        finalize(hasher)
    }
}

impl AsRef<[u8]> for Node {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Node {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}...", &self.to_hex()[..16])
    }
}

impl serde::Serialize for Node {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Node {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Compute the parent of two child nodes
pub fn hash_pair(left: &Node, right: &Node) -> Node {
    let mut hasher = Sha256::new();
    hasher.update(left.0);
    hasher.update(right.0);
    finalize(hasher)
}

fn finalize(hasher: Sha256) -> Node {
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hasher.finalize());
    Node(bytes)
}

/// Hash `node` with its `sibling` at `level`, placing it left or right
/// according to bit `level` of `index`.
pub fn hash_to_parent(node: &Node, sibling: &Node, index: u32, level: u32) -> Node {
    if (index >> level) & 1 == 0 {
        hash_pair(node, sibling)
    } else {
        hash_pair(sibling, node)
    }
}

/// Root of an empty subtree of the given height
pub fn empty_node(level: u32) -> Node {
    let mut node = EMPTY_LEAF;
    for _ in 0..level {
        node = hash_pair(&node, &node);
    }
    node
}

/// Roots of empty subtrees for heights `0..=depth`
pub fn empty_nodes(depth: u32) -> Vec<Node> {
    let mut nodes = Vec::with_capacity(depth as usize + 1);
    let mut node = EMPTY_LEAF;
    nodes.push(node);
    for _ in 0..depth {
        node = hash_pair(&node, &node);
        nodes.push(node);
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_from_hex() {
        let hex = "abcdef1234567890abcdef1234567890abcdef1234567890abcdef1234567890";
        let node = Node::from_hex(hex).unwrap();
        assert_eq!(node.to_hex(), hex);
    }

    #[test]
    fn test_node_from_hex_with_prefix() {
        let hex = "0xabcdef1234567890abcdef1234567890abcdef1234567890abcdef1234567890";
        let node = Node::from_hex(hex).unwrap();
        assert_eq!(node.to_hex(), &hex[2..]);
    }

    #[test]
    fn test_node_from_hex_wrong_length() {
        assert!(Node::from_hex("abcd").is_err());
    }

    #[test]
    fn test_base58_roundtrip() {
        let node = Node::sha256(b"leaf");
        assert_eq!(Node::from_base58(&node.to_base58()).unwrap(), node);
    }

    #[test]
    fn test_sha256_domain() {
        let hash1 = Node::sha256(b"test");
        let hash2 = Node::sha256_with_domain(b"domain", b"test");
        assert_ne!(hash1, hash2);
        assert_eq!(hash2, Node::hashv(b"domain", &[b"te", b"st"]));
    }

    #[test]
    fn test_hash_pair_order_matters() {
        let left = Node::sha256(b"left");
        let right = Node::sha256(b"right");
        assert_ne!(hash_pair(&left, &right), hash_pair(&right, &left));
    }

    #[test]
    fn test_hash_to_parent_uses_index_bit() {
        let node = Node::sha256(b"a");
        let sibling = Node::sha256(b"b");
        assert_eq!(hash_to_parent(&node, &sibling, 0b10, 0), hash_pair(&node, &sibling));
        assert_eq!(hash_to_parent(&node, &sibling, 0b10, 1), hash_pair(&sibling, &node));
    }

    #[test]
    fn test_empty_nodes_table() {
        let table = empty_nodes(4);
        assert_eq!(table.len(), 5);
        assert_eq!(table[0], EMPTY_LEAF);
        for (level, node) in table.iter().enumerate() {
            assert_eq!(*node, empty_node(level as u32));
        }
    }

    #[test]
    fn test_node_serialization() {
        let node = Node::sha256(b"test");
        let json = serde_json::to_string(&node).unwrap();
        let recovered: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(node, recovered);
    }
}
