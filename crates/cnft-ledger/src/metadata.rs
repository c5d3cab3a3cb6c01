//! Mint payload and its content hashes
//!
//! `MetadataArgs` is a closed type: unknown fields fail deserialization and
//! every bound is checked by [`MetadataArgs::validate`] before the tree is
//! touched. The leaf only stores `data_hash` and `creator_hash`; decompress
//! must present metadata that reproduces both.

use std::collections::HashSet;

use cnft_primitives::{Node, Pubkey};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// Domain separator for the metadata data hash
pub const DOMAIN_DATA_HASH: &[u8] = b"CNFT_METADATA_DATA_HASH_V1";

/// Domain separator for the creator hash
pub const DOMAIN_CREATOR_HASH: &[u8] = b"CNFT_METADATA_CREATOR_HASH_V1";

pub const MAX_NAME_LENGTH: usize = 32;
pub const MAX_SYMBOL_LENGTH: usize = 10;
pub const MAX_URI_LENGTH: usize = 200;
pub const MAX_CREATOR_LIMIT: usize = 5;
pub const MAX_SELLER_FEE_BASIS_POINTS: u16 = 10_000;

/// Token standard of the asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStandard {
    NonFungible,
    FungibleAsset,
    Fungible,
    NonFungibleEdition,
}

/// Token program the asset materializes under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenProgramVersion {
    Original,
    Token2022,
}

/// A creator entry with its royalty share
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Creator {
    pub address: Pubkey,
    pub verified: bool,
    /// Percentage share, all shares sum to 100
    pub share: u8,
}

/// Collection membership
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Collection {
    pub verified: bool,
    pub key: Pubkey,
}

/// How uses are consumed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UseMethod {
    Burn,
    Multiple,
    Single,
}

/// Limited-use configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Uses {
    pub use_method: UseMethod,
    pub remaining: u64,
    pub total: u64,
}

/// Metadata supplied at mint and again at decompress
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MetadataArgs {
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub seller_fee_basis_points: u16,
    pub primary_sale_happened: bool,
    pub is_mutable: bool,
    pub edition_nonce: Option<u8>,
    pub token_standard: Option<TokenStandard>,
    pub collection: Option<Collection>,
    pub uses: Option<Uses>,
    pub token_program_version: TokenProgramVersion,
    pub creators: Vec<Creator>,
}

impl MetadataArgs {
    /// Minimal non-fungible metadata with no creators
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            uri: uri.into(),
            seller_fee_basis_points: 0,
            primary_sale_happened: false,
            is_mutable: false,
            edition_nonce: None,
            token_standard: Some(TokenStandard::NonFungible),
            collection: None,
            uses: None,
            token_program_version: TokenProgramVersion::Original,
            creators: Vec::new(),
        }
    }

    /// Replace the creator list
    pub fn with_creators(mut self, creators: Vec<Creator>) -> Self {
        self.creators = creators;
        self
    }

    /// Check every mint-time rule; `minter` is the caller of the mint
    pub fn validate(&self, minter: &Pubkey) -> LedgerResult<()> {
        if self.name.len() > MAX_NAME_LENGTH {
            return Err(invalid(format!(
                "name is {} bytes, max {}",
                self.name.len(),
                MAX_NAME_LENGTH
            )));
        }
        if self.symbol.len() > MAX_SYMBOL_LENGTH {
            return Err(invalid(format!(
                "symbol is {} bytes, max {}",
                self.symbol.len(),
                MAX_SYMBOL_LENGTH
            )));
        }
        if self.uri.len() > MAX_URI_LENGTH {
            return Err(invalid(format!(
                "uri is {} bytes, max {}",
                self.uri.len(),
                MAX_URI_LENGTH
            )));
        }
        if self.seller_fee_basis_points > MAX_SELLER_FEE_BASIS_POINTS {
            return Err(invalid(format!(
                "seller fee {} exceeds {}",
                self.seller_fee_basis_points, MAX_SELLER_FEE_BASIS_POINTS
            )));
        }
        if self.token_standard != Some(TokenStandard::NonFungible) {
            return Err(invalid("only NonFungible assets can be compressed"));
        }
        if let Some(collection) = &self.collection {
            if collection.verified {
                return Err(invalid("collection cannot be verified at mint"));
            }
        }
        if let Some(uses) = &self.uses {
            if uses.remaining > uses.total {
                return Err(invalid("uses remaining exceeds total"));
            }
            if uses.use_method == UseMethod::Single && uses.total != 1 {
                return Err(invalid("single use requires total of 1"));
            }
        }
        self.validate_creators(minter)
    }

    fn validate_creators(&self, minter: &Pubkey) -> LedgerResult<()> {
        if self.creators.is_empty() {
            return Ok(());
        }
        if self.creators.len() > MAX_CREATOR_LIMIT {
            return Err(invalid(format!(
                "{} creators, max {}",
                self.creators.len(),
                MAX_CREATOR_LIMIT
            )));
        }

        let mut seen = HashSet::with_capacity(self.creators.len());
        let mut total: u32 = 0;
        for creator in &self.creators {
            if !seen.insert(creator.address) {
                return Err(invalid(format!("duplicate creator {}", creator.address)));
            }
            if creator.verified && creator.address != *minter {
                return Err(invalid(format!(
                    "creator {} marked verified but did not sign",
                    creator.address
                )));
            }
            total += u32::from(creator.share);
        }
        if total != 100 {
            return Err(invalid(format!("creator shares sum to {}, expected 100", total)));
        }
        Ok(())
    }

    /// `SHA256(domain || JCS(metadata))`
    pub fn data_hash(&self) -> LedgerResult<Node> {
        let canonical = serde_jcs::to_string(self)
            .map_err(|e| invalid(format!("canonicalization failed: {}", e)))?;
        Ok(Node::sha256_with_domain(DOMAIN_DATA_HASH, canonical.as_bytes()))
    }

    /// Hash of this metadata's creator list
    pub fn creator_hash(&self) -> Node {
        creator_hash(&self.creators)
    }
}

/// `SHA256(domain || (address || verified || share)*)`
pub fn creator_hash(creators: &[Creator]) -> Node {
    let mut bytes = Vec::with_capacity(creators.len() * 34);
    for creator in creators {
        bytes.extend_from_slice(creator.address.as_bytes());
        bytes.push(u8::from(creator.verified));
        bytes.push(creator.share);
    }
    Node::sha256_with_domain(DOMAIN_CREATOR_HASH, &bytes)
}

fn invalid(msg: impl Into<String>) -> LedgerError {
    LedgerError::InvalidMetadata(msg.into())
}
