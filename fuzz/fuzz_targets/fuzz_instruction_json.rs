//! Fuzz target for instruction submission
//!
//! Arbitrary JSON fed to the submission channel must either fail to parse
//! or be rejected with an error; neither may panic.

#![no_main]

use cnft_ledger::{AssetLedger, Instruction, MetadataArgs};
use cnft_merkle::TreeParams;
use cnft_primitives::Pubkey;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Limit input size to keep iterations fast
    if data.len() > 64 * 1024 {
        return;
    }
    let Ok(json) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(instruction) = Instruction::from_json(json) else {
        return;
    };

    let ledger = AssetLedger::default();
    let tree_id = Pubkey::from_seed("fuzz");
    let owner = Pubkey::from_seed("owner");
    if ledger
        .create_tree(tree_id, owner, TreeParams::new(5, 8), true)
        .is_err()
    {
        return;
    }
    let _ = ledger.mint(&tree_id, &owner, owner, None, &MetadataArgs::new("F", "F", "u"));

    let root = ledger.root(&tree_id).ok();
    if ledger.execute(instruction).is_err() {
        // Rejected submissions never move the root
        assert_eq!(ledger.root(&tree_id).ok(), root);
    }
});
