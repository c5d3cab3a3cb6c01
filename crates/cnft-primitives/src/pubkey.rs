//! Identities and derived asset addresses

use std::str::FromStr;

use crate::error::EncodingError;
use crate::hash::Node;

/// Domain separator for asset id derivation
pub const DOMAIN_ASSET_ID: &[u8] = b"asset";

/// Domain separator for seeded test identities
const DOMAIN_SEEDED_KEY: &[u8] = b"CNFT_SEEDED_PUBKEY_V1";

/// A 32-byte identity: owners, delegates, creators, tree ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Pubkey(pub [u8; 32]);

impl Pubkey {
    /// Create from bytes
    pub const fn new_from_array(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Fresh random identity
    pub fn new_unique() -> Self {
        let id = uuid::Uuid::new_v4();
        Self(Node::sha256_with_domain(DOMAIN_SEEDED_KEY, id.as_bytes()).0)
    }

    /// Deterministic identity from a seed string
    pub fn from_seed(seed: &str) -> Self {
        Self(Node::sha256_with_domain(DOMAIN_SEEDED_KEY, seed.as_bytes()).0)
    }

    /// Get the underlying bytes
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }

    /// Get the underlying bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Base58 string form
    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }
}

impl FromStr for Pubkey {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s.trim()).into_vec()?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| EncodingError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            })?;
        Ok(Self(arr))
    }
}

impl AsRef<[u8]> for Pubkey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Display for Pubkey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl serde::Serialize for Pubkey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> serde::Deserialize<'de> for Pubkey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Address of a compressed asset, derived from its tree and nonce
///
/// Indexers key leaves by this id so a leaf can be looked up without
/// walking the tree. It is never stored; [`AssetId::derive`] recomputes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(pub Pubkey);

impl AssetId {
    /// `H("asset" || tree_id || nonce_le8)`
    pub fn derive(tree_id: &Pubkey, nonce: u64) -> Self {
        let digest = Node::hashv(DOMAIN_ASSET_ID, &[tree_id.as_ref(), &nonce.to_le_bytes()]);
        Self(Pubkey(digest.0))
    }

    /// The id as an identity (used as the mint address after decompression)
    pub fn as_pubkey(&self) -> &Pubkey {
        &self.0
    }
}

impl FromStr for AssetId {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pubkey::from_str(s).map(Self)
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl serde::Serialize for AssetId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for AssetId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Pubkey::deserialize(deserializer).map(Self)
    }
}
