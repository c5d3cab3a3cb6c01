//! Redemption vouchers

use std::collections::{BTreeMap, BTreeSet};

use cnft_primitives::Pubkey;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::leaf::LeafRecord;

/// Claim on a redeemed leaf, consumed by decompress
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voucher {
    pub tree_id: Pubkey,
    pub leaf_nonce: u64,
    /// Leaf index the record was removed from
    pub index: u32,
    /// Leaf state at redemption
    pub leaf: LeafRecord,
}

/// Live vouchers keyed by `(tree_id, nonce)` plus every nonce ever redeemed
///
/// Inserted only by redeem, removed only by decompress. The redeemed set is
/// never pruned so a nonce cannot be redeemed twice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherStore {
    #[serde(with = "voucher_list")]
    vouchers: BTreeMap<(Pubkey, u64), Voucher>,
    redeemed: BTreeSet<(Pubkey, u64)>,
}

impl VoucherStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `(tree_id, nonce)` was ever redeemed
    pub fn is_redeemed(&self, tree_id: &Pubkey, nonce: u64) -> bool {
        self.redeemed.contains(&(*tree_id, nonce))
    }

    /// Live voucher, if any
    pub fn get(&self, tree_id: &Pubkey, nonce: u64) -> Option<&Voucher> {
        self.vouchers.get(&(*tree_id, nonce))
    }

    /// Number of live vouchers
    pub fn len(&self) -> usize {
        self.vouchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vouchers.is_empty()
    }

    /// Iterate live vouchers
    pub fn iter(&self) -> impl Iterator<Item = &Voucher> {
        self.vouchers.values()
    }

    pub(crate) fn insert(&mut self, voucher: Voucher) -> LedgerResult<()> {
        let key = (voucher.tree_id, voucher.leaf_nonce);
        if !self.redeemed.insert(key) {
            return Err(LedgerError::AlreadyRedeemed {
                tree_id: key.0,
                nonce: key.1,
            });
        }
        self.vouchers.insert(key, voucher);
        Ok(())
    }

    pub(crate) fn remove(&mut self, tree_id: &Pubkey, nonce: u64) -> LedgerResult<Voucher> {
        self.vouchers
            .remove(&(*tree_id, nonce))
            .ok_or(LedgerError::VoucherNotFound {
                tree_id: *tree_id,
                nonce,
            })
    }
}

// Tuple keys are not valid JSON object keys
mod voucher_list {
    use std::collections::BTreeMap;

    use cnft_primitives::Pubkey;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::Voucher;

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<(Pubkey, u64), Voucher>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let list: Vec<&Voucher> = map.values().collect();
        list.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<(Pubkey, u64), Voucher>, D::Error> {
        let list = Vec::<Voucher>::deserialize(deserializer)?;
        Ok(list
            .into_iter()
            .map(|v| ((v.tree_id, v.leaf_nonce), v))
            .collect())
    }
}
