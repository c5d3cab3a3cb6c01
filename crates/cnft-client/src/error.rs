//! Error types for indexer access and submission

use std::time::Duration;

use cnft_ledger::LedgerError;
use cnft_primitives::{AssetId, EncodingError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    /// JSON-RPC error object returned by the indexer
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Asset not found: {0}")]
    AssetNotFound(AssetId),

    /// Indexer returned data that does not decode or is inconsistent
    #[error("Invalid indexer response: {0}")]
    InvalidResponse(String),

    /// Leaf and proof came from different indexer views
    #[error("Indexer returned inconsistent leaf and proof for {0}")]
    InconsistentView(AssetId),

    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),

    #[error("Ledger rejected operation: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<ClientError>,
    },
}

impl ClientError {
    /// Whether the same call may succeed if repeated
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Request(err) => err.is_timeout() || err.is_connect(),
            ClientError::ApiError { status, .. } => *status == 429 || *status >= 500,
            // Indexer may not have caught up yet
            ClientError::AssetNotFound(_)
            | ClientError::InconsistentView(_)
            | ClientError::Timeout(_) => true,
            ClientError::Ledger(err) => err.is_retryable(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;
    use cnft_primitives::Pubkey;

    #[test]
    fn test_retryable_classification() {
        assert!(ClientError::Timeout(Duration::from_millis(5)).is_retryable());
        assert!(
            ClientError::Ledger(LedgerError::ConcurrentModification { index: 0 }).is_retryable()
        );
        assert!(!ClientError::Ledger(LedgerError::ProofInvalid("bad".into())).is_retryable());
        assert!(!ClientError::Ledger(LedgerError::NotOwner {
            asset_id: AssetId::derive(&Pubkey::from_seed("t"), 0),
            caller: Pubkey::from_seed("c"),
        })
        .is_retryable());
        assert!(ClientError::ApiError {
            status: 503,
            message: String::new()
        }
        .is_retryable());
        assert!(!ClientError::Rpc {
            code: -32602,
            message: "invalid params".into()
        }
        .is_retryable());
    }
}
