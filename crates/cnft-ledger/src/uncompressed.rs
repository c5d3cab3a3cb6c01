//! Destination for decompressed assets

use std::collections::HashMap;

use cnft_primitives::{AssetId, Pubkey};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::metadata::MetadataArgs;

/// A standalone asset record created by decompress
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncompressedAsset {
    /// Mint address, equal to the compressed asset id
    pub mint: AssetId,
    pub tree_id: Pubkey,
    pub nonce: u64,
    /// Voucher owner at decompress time
    pub owner: Pubkey,
    pub supply: u64,
    pub metadata: MetadataArgs,
}

/// Storage for uncompressed asset records
pub trait UncompressedAssetStore: Send + Sync {
    /// Persist a record; fails if the mint already exists
    fn materialize(&self, asset: UncompressedAsset) -> LedgerResult<()>;

    /// Look up a record by mint
    fn get(&self, mint: &AssetId) -> Option<UncompressedAsset>;
}

/// In-memory [`UncompressedAssetStore`]
#[derive(Debug, Default)]
pub struct InMemoryAssetStore {
    assets: RwLock<HashMap<AssetId, UncompressedAsset>>,
}

impl InMemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.assets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.read().is_empty()
    }

    /// Every record owned by `owner`
    pub fn by_owner(&self, owner: &Pubkey) -> Vec<UncompressedAsset> {
        self.assets
            .read()
            .values()
            .filter(|asset| asset.owner == *owner)
            .cloned()
            .collect()
    }
}

impl UncompressedAssetStore for InMemoryAssetStore {
    fn materialize(&self, asset: UncompressedAsset) -> LedgerResult<()> {
        let mut assets = self.assets.write();
        if assets.contains_key(&asset.mint) {
            return Err(LedgerError::Store(format!("mint {} already exists", asset.mint)));
        }
        assets.insert(asset.mint, asset);
        Ok(())
    }

    fn get(&self, mint: &AssetId) -> Option<UncompressedAsset> {
        self.assets.read().get(mint).cloned()
    }
}
