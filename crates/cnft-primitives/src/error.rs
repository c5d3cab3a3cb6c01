//! Encoding errors for keys and digests

use thiserror::Error;

/// Errors raised when parsing 32-byte values from text
#[derive(Debug, Error)]
pub enum EncodingError {
    /// Not valid base58
    #[error("Invalid base58: {0}")]
    Base58(#[from] bs58::decode::Error),

    /// Not valid hex
    #[error("Invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    /// Decoded to the wrong number of bytes
    #[error("Expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}
