//! Fuzz target for tree snapshot decoding
//!
//! Decoding arbitrary bytes must never panic, and anything that decodes and
//! restores must re-encode to the same bytes.

#![no_main]

use cnft_merkle::TreeSnapshot;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(snapshot) = TreeSnapshot::from_bytes(data) else {
        return;
    };
    assert_eq!(snapshot.to_bytes(), data);

    if let Ok(tree) = snapshot.restore() {
        let _ = tree.root();
    }
});
