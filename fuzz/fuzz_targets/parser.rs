#![no_main]

use libfuzzer_sys::fuzz_target;
use md_playground::{EquivalenceMode, Parser, detect};

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);
    let doc = Parser::parse(&input);
    assert_eq!(doc.serialize(EquivalenceMode::Exact), input);
    for block in doc.blocks() {
        let _ = detect(block);
    }
    let _ = doc.serialize(EquivalenceMode::Structural);
});
