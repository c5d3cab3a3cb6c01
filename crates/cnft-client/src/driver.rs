//! Fetch-proof-then-submit driver
//!
//! Each leaf operation reads the leaf and its proof from the indexer,
//! submits to the ledger and, when the ledger reports the proof as too
//! stale, refetches and tries again under the configured [`RetryPolicy`].

use std::sync::Arc;

use cnft_ledger::{
    AssetLedger, LeafCommit, LedgerResult, MetadataArgs, UncompressedAsset, Voucher,
};
use cnft_merkle::MerkleProof;
use cnft_primitives::{AssetId, Pubkey};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::indexer::{IndexedLeaf, IndexerClient};
use crate::retry::{with_timeout, RetryPolicy};

/// Client that drives ledger operations from indexer state
pub struct AssetClient {
    ledger: Arc<AssetLedger>,
    indexer: Arc<dyn IndexerClient>,
    config: ClientConfig,
}

impl AssetClient {
    pub fn new(
        ledger: Arc<AssetLedger>,
        indexer: Arc<dyn IndexerClient>,
        config: ClientConfig,
    ) -> Self {
        Self {
            ledger,
            indexer,
            config,
        }
    }

    /// Get the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn retry(&self) -> &RetryPolicy {
        &self.config.retry
    }

    /// Leaf and proof from one consistent indexer view
    pub async fn fetch(&self, asset_id: &AssetId) -> Result<(IndexedLeaf, MerkleProof)> {
        let timeout = self.config.fetch_timeout;
        let (indexed, proof) = tokio::try_join!(
            with_timeout(timeout, self.indexer.get_leaf(asset_id)),
            with_timeout(timeout, self.indexer.get_proof(asset_id)),
        )?;

        if indexed.leaf.hash() != proof.leaf || indexed.leaf_index != proof.leaf_index {
            debug!(asset = %asset_id, "leaf and proof from different indexer views");
            return Err(ClientError::InconsistentView(*asset_id));
        }
        Ok((indexed, proof.to_merkle_proof()))
    }

    async fn submit<T, F>(&self, name: &str, asset_id: &AssetId, op: F) -> Result<T>
    where
        F: Fn(&IndexedLeaf, &MerkleProof) -> LedgerResult<T>,
    {
        self.retry()
            .execute(name, || async {
                let (indexed, proof) = self.fetch(asset_id).await?;
                Ok(op(&indexed, &proof)?)
            })
            .await
    }

    /// Transfer to `new_owner`
    pub async fn transfer(
        &self,
        asset_id: &AssetId,
        caller: &Pubkey,
        new_owner: Pubkey,
    ) -> Result<LeafCommit> {
        let commit = self
            .submit("transfer", asset_id, |indexed, proof| {
                self.ledger
                    .transfer(&indexed.tree_id, caller, &indexed.leaf, proof, new_owner)
            })
            .await?;
        info!(asset = %asset_id, to = %new_owner, "transfer confirmed");
        Ok(commit)
    }

    /// Set or clear the delegate
    pub async fn delegate(
        &self,
        asset_id: &AssetId,
        caller: &Pubkey,
        new_delegate: Option<Pubkey>,
    ) -> Result<LeafCommit> {
        self.submit("delegate", asset_id, |indexed, proof| {
            self.ledger
                .delegate(&indexed.tree_id, caller, &indexed.leaf, proof, new_delegate)
        })
        .await
    }

    /// Redeem into a voucher
    pub async fn redeem(
        &self,
        asset_id: &AssetId,
        caller: &Pubkey,
    ) -> Result<(LeafCommit, Voucher)> {
        self.submit("redeem", asset_id, |indexed, proof| {
            self.ledger
                .redeem(&indexed.tree_id, caller, &indexed.leaf, proof)
        })
        .await
    }

    /// Check the indexer's view of the asset against the ledger
    pub async fn verify(&self, asset_id: &AssetId) -> Result<()> {
        self.submit("verify_leaf", asset_id, |indexed, proof| {
            self.ledger
                .verify_leaf(&indexed.tree_id, &indexed.leaf.hash(), proof)
        })
        .await
    }

    /// Poll the indexer until `ready` holds for the asset
    ///
    /// Missing assets and slow fetches count as "not yet". Fails with
    /// [`ClientError::Timeout`] once `poll_timeout` has elapsed.
    pub async fn wait_for<P>(&self, asset_id: &AssetId, ready: P) -> Result<IndexedLeaf>
    where
        P: Fn(&IndexedLeaf) -> bool,
    {
        let deadline = Instant::now() + self.config.poll_timeout;
        loop {
            match with_timeout(self.config.fetch_timeout, self.indexer.get_leaf(asset_id)).await {
                Ok(indexed) if ready(&indexed) => return Ok(indexed),
                Ok(_) => {}
                Err(err) if err.is_retryable() => {
                    debug!(asset = %asset_id, "indexer not ready: {}", err);
                }
                Err(err) => return Err(err),
            }
            if Instant::now() + self.config.poll_interval > deadline {
                return Err(ClientError::Timeout(self.config.poll_timeout));
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// Wait until the indexer has seen the asset's redemption
    pub async fn wait_for_redemption(&self, asset_id: &AssetId) -> Result<IndexedLeaf> {
        self.wait_for(asset_id, |indexed| !indexed.compressed).await
    }

    /// Redeem, wait for the indexer, then decompress
    pub async fn redeem_and_decompress(
        &self,
        asset_id: &AssetId,
        caller: &Pubkey,
        metadata: &MetadataArgs,
    ) -> Result<UncompressedAsset> {
        let (_, voucher) = self.redeem(asset_id, caller).await?;
        self.wait_for_redemption(asset_id).await?;
        let asset = self
            .ledger
            .decompress(&voucher.tree_id, caller, voucher.leaf_nonce, metadata)?;
        info!(asset = %asset_id, owner = %asset.owner, "decompress confirmed");
        Ok(asset)
    }
}
