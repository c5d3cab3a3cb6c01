//! JSON-RPC client for DAS-compatible indexers

use async_trait::async_trait;
use cnft_primitives::{AssetId, Pubkey};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::indexer::{AssetProof, IndexedLeaf, IndexerClient};
use crate::types::{DasAsset, DasAssetList, DasAssetProof, RpcRequest, RpcResponse, SortBy};

/// HTTP client for the `getAsset`, `getAssetProof` and `getAssetsByOwner` methods
pub struct DasClient {
    client: reqwest::Client,
    rpc_url: String,
}

impl DasClient {
    /// Create a client for `config.rpc_url`
    ///
    /// Every request is bounded by `config.fetch_timeout`.
    pub fn try_new(config: &ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.fetch_timeout)
            .build()?;

        Ok(Self {
            client,
            rpc_url: config.rpc_url.clone(),
        })
    }

    /// Endpoint this client talks to
    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Fetch an asset
    pub async fn get_asset(&self, asset_id: &AssetId) -> Result<DasAsset> {
        self.call("getAsset", vec![asset_id.to_string()])
            .await
            .map_err(|err| not_found(err, asset_id))
    }

    /// Fetch an asset's inclusion proof
    pub async fn get_asset_proof(&self, asset_id: &AssetId) -> Result<DasAssetProof> {
        self.call("getAssetProof", vec![asset_id.to_string()])
            .await
            .map_err(|err| not_found(err, asset_id))
    }

    /// One page of assets held by `owner`; `page` starts at 1
    pub async fn get_assets_by_owner(
        &self,
        owner: &Pubkey,
        sort_by: SortBy,
        limit: u32,
        page: u32,
    ) -> Result<DasAssetList> {
        let params = (owner.to_string(), sort_by, limit, page, "", "");
        self.call("getAssetsByOwner", params).await
    }

    async fn call<P: Serialize, T: DeserializeOwned>(&self, method: &str, params: P) -> Result<T> {
        let request = RpcRequest::new(method, params);
        debug!(method, id = %request.id, "rpc request");

        let response = self.client.post(&self.rpc_url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let body: RpcResponse<T> = response.json().await?;
        if let Some(error) = body.error {
            return Err(ClientError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        body.result
            .ok_or_else(|| ClientError::InvalidResponse(format!("{} returned no result", method)))
    }
}

/// DAS reports a missing asset as an RPC error or an empty result
fn not_found(err: ClientError, asset_id: &AssetId) -> ClientError {
    match err {
        ClientError::Rpc { ref message, .. } if message.to_lowercase().contains("not found") => {
            ClientError::AssetNotFound(*asset_id)
        }
        ClientError::InvalidResponse(ref message) if message.ends_with("returned no result") => {
            ClientError::AssetNotFound(*asset_id)
        }
        other => other,
    }
}

#[async_trait]
impl IndexerClient for DasClient {
    async fn get_leaf(&self, asset_id: &AssetId) -> Result<IndexedLeaf> {
        self.get_asset(asset_id).await?.to_indexed_leaf()
    }

    async fn get_proof(&self, asset_id: &AssetId) -> Result<AssetProof> {
        self.get_asset_proof(asset_id).await?.to_asset_proof()
    }
}
